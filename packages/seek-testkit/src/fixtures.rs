//! Canned configuration and document builders shared by the acceptance tests.

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use seek_config::Config;
use seek_domain::{ContentStatus, Document, Reach};

const CONFIG_TEMPLATE: &str = r#"
[store]
url           = "http://localhost:9200"
index_prefix  = "seek-test"
timeout_ms    = 5000
force_refresh = true

[indexer]
batch_size          = 10
download_timeout_ms = 5000

[chunking]
chunk_size    = 1000
chunk_overlap = 100

[language]
confidence_threshold = 0.2

[search]
hybrid_pipeline              = "test-hybrid"
hybrid_weights               = [0.5, 0.5]
trigram_boost                = 0.3
trigram_minimum_should_match = "75%"

[providers.embedding]
enabled    = true
api_base   = "http://localhost:8080"
api_key    = "test-key"
path       = "/v1/embeddings"
model      = "test-embeddings"
dimensions = 3
timeout_ms = 5000

[providers.reranker]
enabled    = false
api_base   = ""
api_key    = ""
path       = "/v1/rerank"
model      = ""
timeout_ms = 5000

[providers.converter]
api_base   = "http://localhost:8082"
api_key    = "test-key"
path       = "/v1/parse"
timeout_ms = 5000
"#;

/// Configuration with hybrid search fully enabled.
pub fn hybrid_config() -> Config {
	parse(CONFIG_TEMPLATE)
}

/// Configuration with the embedding provider disabled, forcing lexical-only
/// behavior everywhere.
pub fn lexical_config() -> Config {
	let raw = CONFIG_TEMPLATE.replace("enabled    = true", "enabled    = false");

	parse(&raw)
}

fn parse(raw: &str) -> Config {
	toml::from_str(raw).expect("Failed to parse the test configuration.")
}

/// A valid, active, text-like document owned by `alice`.
pub fn document(title: &str, content: &str) -> Document {
	let now = OffsetDateTime::now_utc() - Duration::minutes(5);

	Document {
		id: Uuid::new_v4(),
		title: title.to_string(),
		content: content.to_string(),
		depth: Some(1),
		path: Some("0001".to_string()),
		numchild: Some(0),
		created_at: now,
		updated_at: now,
		size: Some(content.len() as u64),
		users: vec!["alice".to_string()],
		groups: Vec::new(),
		reach: Reach::Public,
		tags: Vec::new(),
		is_active: true,
		mimetype: Some("text/plain".to_string()),
		content_uri: None,
		content_status: ContentStatus::Ready,
		chunks: Vec::new(),
		embedding_model: None,
	}
}

/// A document whose content must be downloaded from `uri`.
pub fn remote_document(title: &str, uri: &str) -> Document {
	let mut doc = document(title, "");

	doc.content_uri = Some(uri.to_string());

	doc
}
