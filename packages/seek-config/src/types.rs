use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub store: Store,
	pub indexer: Indexer,
	pub chunking: Chunking,
	pub language: Language,
	pub search: Search,
	pub providers: Providers,
}
impl Config {
	/// Hybrid search needs a fully configured embedding provider. Anything missing
	/// silently degrades the engine to lexical-only, so callers can log
	/// [`Config::missing_hybrid_settings`] when this returns `false`.
	pub fn hybrid_search_enabled(&self) -> bool {
		self.missing_hybrid_settings().is_empty()
	}

	pub fn missing_hybrid_settings(&self) -> Vec<&'static str> {
		let embedding = &self.providers.embedding;
		let mut missing = Vec::new();

		if !embedding.enabled {
			missing.push("providers.embedding.enabled");
		}
		if embedding.api_base.trim().is_empty() {
			missing.push("providers.embedding.api_base");
		}
		if embedding.api_key.trim().is_empty() {
			missing.push("providers.embedding.api_key");
		}
		if embedding.model.trim().is_empty() {
			missing.push("providers.embedding.model");
		}
		if embedding.dimensions == 0 {
			missing.push("providers.embedding.dimensions");
		}

		missing
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct Store {
	pub url: String,
	pub username: Option<String>,
	pub password: Option<String>,
	/// Tenant indices are named `{index_prefix}-{tenant}`.
	pub index_prefix: String,
	pub timeout_ms: u64,
	/// Make bulk writes visible to search before returning. Demo and test
	/// environments only.
	#[serde(default)]
	pub force_refresh: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Indexer {
	pub batch_size: u32,
	pub download_timeout_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Chunking {
	pub chunk_size: u32,
	pub chunk_overlap: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Language {
	/// Detections below this confidence fall back to the undetermined bucket.
	pub confidence_threshold: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Search {
	/// Id of the store-side normalization pipeline hybrid queries run through.
	pub hybrid_pipeline: String,
	/// Arithmetic-mean weights for the [lexical, semantic] hybrid sub-queries.
	pub hybrid_weights: Vec<f32>,
	pub trigram_boost: f32,
	pub trigram_minimum_should_match: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub reranker: RerankProviderConfig,
	pub converter: ConverterProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub enabled: bool,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RerankProviderConfig {
	pub enabled: bool,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ConverterProviderConfig {
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}
