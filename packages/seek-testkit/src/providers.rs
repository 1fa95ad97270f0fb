//! Deterministic provider doubles. Routing is substring-based so a test can
//! pin exact vectors or scores to the documents it cares about and let
//! everything else fall through to a stable default.

use std::sync::{
	Mutex,
	atomic::{AtomicBool, AtomicU64, Ordering},
};

use seek_config::{EmbeddingProviderConfig, RerankProviderConfig};
use seek_providers::Error as ProviderError;
use seek_service::{Converter, DownloadProvider, EmbeddingProvider, RerankProvider};
use seek_store::backend::BoxFuture;

pub struct MockEmbedder {
	routes: Mutex<Vec<(String, Vec<f32>)>>,
	dimensions: usize,
	fail: AtomicBool,
	calls: AtomicU64,
}
impl MockEmbedder {
	pub fn new(dimensions: usize) -> Self {
		Self {
			routes: Mutex::new(Vec::new()),
			dimensions,
			fail: AtomicBool::new(false),
			calls: AtomicU64::new(0),
		}
	}

	/// Texts containing `needle` embed to `vector`.
	pub fn route(&self, needle: impl Into<String>, vector: Vec<f32>) {
		let mut routes = self.routes.lock().unwrap_or_else(|err| err.into_inner());

		routes.push((needle.into(), vector));
	}

	pub fn set_fail(&self, fail: bool) {
		self.fail.store(fail, Ordering::SeqCst);
	}

	/// Provider calls made so far, for batching assertions.
	pub fn calls(&self) -> u64 {
		self.calls.load(Ordering::SeqCst)
	}

	fn vector_for(&self, text: &str) -> Vec<f32> {
		let routes = self.routes.lock().unwrap_or_else(|err| err.into_inner());

		if let Some((_, vector)) = routes.iter().find(|(needle, _)| text.contains(needle)) {
			return vector.clone();
		}

		// Stable text-derived fallback so unrelated texts stay apart.
		let mut vector = vec![0.0_f32; self.dimensions];

		for (position, byte) in text.bytes().enumerate() {
			vector[position % self.dimensions] += f32::from(byte) / 255.0;
		}

		vector
	}
}
impl EmbeddingProvider for MockEmbedder {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, seek_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			if self.fail.load(Ordering::SeqCst) {
				return Err(ProviderError::MalformedResponse(
					"Mock embedder failure.".to_string(),
				));
			}

			Ok(texts.iter().map(|text| self.vector_for(text)).collect())
		})
	}
}

pub struct MockReranker {
	routes: Mutex<Vec<(String, f32)>>,
	fail: AtomicBool,
}
impl MockReranker {
	pub fn new() -> Self {
		Self { routes: Mutex::new(Vec::new()), fail: AtomicBool::new(false) }
	}

	/// Documents containing `needle` score `score`; everything else scores 0.
	pub fn route(&self, needle: impl Into<String>, score: f32) {
		let mut routes = self.routes.lock().unwrap_or_else(|err| err.into_inner());

		routes.push((needle.into(), score));
	}

	pub fn set_fail(&self, fail: bool) {
		self.fail.store(fail, Ordering::SeqCst);
	}
}
impl Default for MockReranker {
	fn default() -> Self {
		Self::new()
	}
}
impl RerankProvider for MockReranker {
	fn rerank<'a>(
		&'a self,
		_cfg: &'a RerankProviderConfig,
		_query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, seek_providers::Result<Vec<f32>>> {
		Box::pin(async move {
			if self.fail.load(Ordering::SeqCst) {
				return Err(ProviderError::MalformedResponse(
					"Mock reranker failure.".to_string(),
				));
			}

			let routes = self.routes.lock().unwrap_or_else(|err| err.into_inner());

			Ok(docs
				.iter()
				.map(|doc| {
					routes
						.iter()
						.find(|(needle, _)| doc.contains(needle))
						.map(|(_, score)| *score)
						.unwrap_or_default()
				})
				.collect())
		})
	}
}

#[derive(Default)]
pub struct MockDownloader {
	routes: Mutex<Vec<(String, Vec<u8>)>>,
}
impl MockDownloader {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn serve(&self, uri: impl Into<String>, bytes: Vec<u8>) {
		let mut routes = self.routes.lock().unwrap_or_else(|err| err.into_inner());

		routes.push((uri.into(), bytes));
	}
}
impl DownloadProvider for MockDownloader {
	fn download<'a>(
		&'a self,
		uri: &'a str,
		_timeout_ms: u64,
	) -> BoxFuture<'a, seek_providers::Result<Vec<u8>>> {
		Box::pin(async move {
			let routes = self.routes.lock().unwrap_or_else(|err| err.into_inner());

			routes
				.iter()
				.find(|(served, _)| served == uri)
				.map(|(_, bytes)| bytes.clone())
				.ok_or_else(|| {
					ProviderError::MalformedResponse(format!("No mock content for {uri}."))
				})
		})
	}
}

/// Converter that ignores its input and returns a fixed text.
pub struct StaticConverter {
	pub output: String,
}
impl Converter for StaticConverter {
	fn convert<'a>(
		&'a self,
		_mimetype: &'a str,
		_content: Vec<u8>,
	) -> BoxFuture<'a, seek_providers::Result<String>> {
		Box::pin(async move { Ok(self.output.clone()) })
	}
}

/// Converter that always fails.
pub struct FailingConverter;
impl Converter for FailingConverter {
	fn convert<'a>(
		&'a self,
		_mimetype: &'a str,
		_content: Vec<u8>,
	) -> BoxFuture<'a, seek_providers::Result<String>> {
		Box::pin(async move {
			Err(ProviderError::MalformedResponse("Mock converter failure.".to_string()))
		})
	}
}
