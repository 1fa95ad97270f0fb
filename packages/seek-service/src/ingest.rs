//! Write path. A batch is normalized, validated, converted and embedded
//! document by document, then written to the tenant index in a single bulk
//! transaction. One bad document never fails the batch.

use time::OffsetDateTime;

use seek_chunking::{ChunkingConfig, split_text};
use seek_domain::{
	Chunk, ContentStatus, Document, IngestDisposition, detect_language, format_embedding_input,
};
use seek_store::bulk::with_transaction;

use crate::{DocumentError, SeekService, ServiceResult};

/// Outcome of one ingestion batch.
#[derive(Debug, Default)]
pub struct IngestReport {
	/// Documents accepted by the store.
	pub indexed: u64,
	pub errors: Vec<DocumentError>,
}

impl SeekService {
	/// Indexes a batch of documents into one tenant index. Every document is
	/// replaced wholesale, which is also what drops a previous language's
	/// fields on re-ingestion.
	pub async fn ingest(&self, tenant: &str, documents: Vec<Document>) -> ServiceResult<IngestReport> {
		let now = OffsetDateTime::now_utc();
		let mut errors = Vec::new();
		let mut sources = Vec::new();

		for mut document in documents {
			document.normalize();

			if let Err(err) = document.validate(now) {
				errors.push(DocumentError::Content { id: document.id, message: err.to_string() });

				continue;
			}

			self.prepare(&mut document, &mut errors).await;

			let language =
				detect_language(&self.cfg.language, &document.title, &document.content);

			match seek_domain::to_source(&document, language) {
				Ok(source) => sources.push((document.id, source)),
				Err(err) => {
					errors.push(DocumentError::Content {
						id: document.id,
						message: err.to_string(),
					});
				},
			}
		}

		let queued = sources.len() as u64;
		let ((), bulk_errors) = with_transaction(
			self.store.as_ref(),
			&self.index_for(tenant),
			self.cfg.store.force_refresh,
			|transaction| {
				for (id, source) in sources {
					transaction.index(id, source);
				}
			},
		)
		.await?;
		let indexed = queued - bulk_errors.len() as u64;

		errors.extend(bulk_errors.into_iter().map(DocumentError::from));

		tracing::info!(tenant, indexed, errors = errors.len(), "Ingestion batch finished.");

		Ok(IngestReport { indexed, errors })
	}

	pub async fn ingest_one(&self, tenant: &str, document: Document) -> ServiceResult<IngestReport> {
		self.ingest(tenant, vec![document]).await
	}

	/// Drives a validated document to its initial lifecycle state, converting
	/// inline content and embedding it when hybrid search is configured.
	/// Failures downgrade the document instead of dropping it.
	async fn prepare(&self, document: &mut Document, errors: &mut Vec<DocumentError>) {
		let directly_indexable =
			self.converters.is_directly_indexable(document.mimetype.as_deref());

		match document.ingest_disposition(directly_indexable) {
			IngestDisposition::Download => {
				document.content_status = ContentStatus::Wait;
				document.chunks = Vec::new();
				document.embedding_model = None;

				return;
			},
			IngestDisposition::Index => document.content_status = ContentStatus::Ready,
			IngestDisposition::Convert => {
				let bytes = document.content.clone().into_bytes();

				match self.convert_bytes(document.mimetype.as_deref(), bytes).await {
					Ok(text) => {
						document.content = text;
						document.content_status = ContentStatus::Ready;
					},
					Err(message) => {
						// Indexed anyway; the convert phase retries it later.
						document.content_status = ContentStatus::Loaded;

						errors.push(DocumentError::Content { id: document.id, message });
					},
				}
			},
		}

		document.chunks = Vec::new();
		document.embedding_model = None;

		if document.content_status == ContentStatus::Ready && self.cfg.hybrid_search_enabled() {
			self.embed_document(document, errors).await;
		}
	}

	async fn embed_document(&self, document: &mut Document, errors: &mut Vec<DocumentError>) {
		let chunking = ChunkingConfig {
			chunk_size: self.cfg.chunking.chunk_size,
			chunk_overlap: self.cfg.chunking.chunk_overlap,
		};
		let pieces = split_text(&document.content, &chunking);

		if pieces.is_empty() {
			return;
		}

		let inputs: Vec<String> = pieces
			.iter()
			.map(|piece| format_embedding_input(&document.title, &piece.text))
			.collect();

		match self.providers.embedding.embed(&self.cfg.providers.embedding, &inputs).await {
			Ok(vectors) if vectors.len() == pieces.len() => {
				document.chunks = pieces
					.into_iter()
					.zip(vectors)
					.map(|(piece, embedding)| Chunk {
						index: piece.chunk_index,
						content: piece.text,
						embedding,
					})
					.collect();
				document.embedding_model = Some(self.cfg.providers.embedding.model.clone());
			},
			Ok(_) => {
				errors.push(DocumentError::Embedding {
					id: document.id,
					message: "Provider returned a mismatched vector count.".to_string(),
				});
			},
			Err(err) => {
				// Indexed without chunks; the embedding phase retries it later.
				tracing::warn!(document = %document.id, error = %err, "Ingestion embedding failed.");
				errors.push(DocumentError::Embedding {
					id: document.id,
					message: err.to_string(),
				});
			},
		}
	}
}
