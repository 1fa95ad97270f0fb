//! Test harness: an in-memory store backend with the same observable
//! semantics as the HTTP client, deterministic provider doubles and fixture
//! builders, wired into a ready-to-use engine.

pub mod fixtures;
pub mod providers;
pub mod store;

pub use providers::{
	FailingConverter, MockDownloader, MockEmbedder, MockReranker, StaticConverter,
};
pub use store::MemoryStore;

use std::sync::Arc;

use seek_config::Config;
use seek_service::{ConverterRegistry, Providers, SeekService};

/// An engine over the in-memory store, with handles to every double so tests
/// can route vectors, serve downloads and inject failures.
pub struct TestEngine {
	pub service: SeekService,
	pub store: Arc<MemoryStore>,
	pub embedder: Arc<MockEmbedder>,
	pub reranker: Arc<MockReranker>,
	pub downloader: Arc<MockDownloader>,
}

pub fn engine(cfg: Config) -> TestEngine {
	let store = Arc::new(MemoryStore::new());
	let embedder = Arc::new(MockEmbedder::new(cfg.providers.embedding.dimensions as usize));
	let reranker = Arc::new(MockReranker::new());
	let downloader = Arc::new(MockDownloader::new());
	let service = SeekService {
		cfg,
		store: store.clone(),
		providers: Providers {
			embedding: embedder.clone(),
			rerank: reranker.clone(),
			download: downloader.clone(),
		},
		converters: ConverterRegistry::new(),
	};

	TestEngine { service, store, embedder, reranker, downloader }
}
