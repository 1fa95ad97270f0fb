pub mod access;
pub mod convert;
pub mod delete;
pub mod ingest;
pub mod pipeline;
pub mod search;

use std::sync::Arc;

use uuid::Uuid;

pub use access::AccessContext;
pub use convert::{Converter, ConverterRegistry, RemoteConverter};
pub use delete::{DeleteRequest, DeleteResponse};
pub use ingest::IngestReport;
pub use pipeline::{PipelineReport, Scan};
pub use search::{OrderBy, SearchItem, SearchRequest, SearchResponse};
use seek_config::{Config, EmbeddingProviderConfig, RerankProviderConfig};
use seek_store::{backend::BoxFuture, backend::StoreBackend, bulk::BulkError, http::HttpStore};

pub type ServiceResult<T> = Result<T, ServiceError>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, seek_providers::Result<Vec<Vec<f32>>>>;
}

pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a RerankProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, seek_providers::Result<Vec<f32>>>;
}

pub trait DownloadProvider
where
	Self: Send + Sync,
{
	fn download<'a>(
		&'a self,
		uri: &'a str,
		timeout_ms: u64,
	) -> BoxFuture<'a, seek_providers::Result<Vec<u8>>>;
}

/// Call-level faults. Per-document failures travel as [`DocumentError`]
/// instead and never abort a batch.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
	#[error(transparent)]
	Store(#[from] seek_store::Error),
	#[error(transparent)]
	Provider(#[from] seek_providers::Error),
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
}

/// Per-document, batch-scoped failure. Collected and returned alongside the
/// surviving documents' results.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
	#[error("Document {id}: {message}")]
	Content { id: Uuid, message: String },
	#[error("Document {id}: download failed: {message}")]
	Download { id: Uuid, message: String },
	#[error("Document {id}: embedding failed: {message}")]
	Embedding { id: Uuid, message: String },
	#[error("Document {id}: write rejected ({status}): {message}")]
	Write { id: Uuid, status: u16, message: String },
}
impl DocumentError {
	pub fn document_id(&self) -> Uuid {
		match self {
			Self::Content { id, .. }
			| Self::Download { id, .. }
			| Self::Embedding { id, .. }
			| Self::Write { id, .. } => *id,
		}
	}
}
impl From<BulkError> for DocumentError {
	fn from(err: BulkError) -> Self {
		Self::Write { id: err.document_id, status: err.status, message: err.message }
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub rerank: Arc<dyn RerankProvider>,
	pub download: Arc<dyn DownloadProvider>,
}

/// The engine. Owns the config, the store backend, the external providers
/// and the converter registry; every operation is tenant-scoped.
pub struct SeekService {
	pub cfg: Config,
	pub store: Arc<dyn StoreBackend>,
	pub providers: Providers,
	pub converters: ConverterRegistry,
}
impl SeekService {
	pub fn new(cfg: Config) -> ServiceResult<Self> {
		let store = Arc::new(
			HttpStore::new(&cfg.store, cfg.providers.embedding.dimensions)
				.map_err(ServiceError::Store)?,
		);
		let converters = ConverterRegistry::with_defaults(cfg.providers.converter.clone());

		Ok(Self {
			cfg,
			store,
			providers: Providers {
				embedding: Arc::new(DefaultProviders),
				rerank: Arc::new(DefaultProviders),
				download: Arc::new(DefaultProviders),
			},
			converters,
		})
	}

	pub fn index_for(&self, tenant: &str) -> String {
		seek_store::index_name(&self.cfg.store.index_prefix, tenant)
	}

	pub fn search_indices(&self, tenants: &[String]) -> Vec<String> {
		tenants.iter().map(|tenant| self.index_for(tenant)).collect()
	}

	/// Creates the hybrid normalization pipeline when missing. Run once at
	/// deploy time; harmless to repeat.
	pub async fn ensure_search_pipeline(&self) -> ServiceResult<()> {
		self.store
			.ensure_search_pipeline(&self.cfg.search.hybrid_pipeline, &self.cfg.search.hybrid_weights)
			.await?;

		Ok(())
	}

	/// Removes a tenant's index entirely.
	pub async fn delete_index(&self, tenant: &str) -> ServiceResult<()> {
		self.store.delete_index(&self.index_for(tenant)).await?;

		Ok(())
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, seek_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(seek_providers::embedding::embed(cfg, texts))
	}
}
impl RerankProvider for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a RerankProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, seek_providers::Result<Vec<f32>>> {
		Box::pin(seek_providers::rerank::rerank(cfg, query, docs))
	}
}
impl DownloadProvider for DefaultProviders {
	fn download<'a>(
		&'a self,
		uri: &'a str,
		timeout_ms: u64,
	) -> BoxFuture<'a, seek_providers::Result<Vec<u8>>> {
		Box::pin(seek_providers::download::download(uri, timeout_ms))
	}
}
