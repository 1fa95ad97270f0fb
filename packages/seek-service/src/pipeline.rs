//! Index maintenance phases. Each phase scans one tenant index for documents
//! in a given lifecycle state, advances them, and reports per-document
//! failures without aborting the scan.

use serde_json::json;

use seek_chunking::{ChunkingConfig, split_text};
use seek_domain::{ContentStatus, LanguageCode, format_embedding_input, language_values};
use seek_store::{
	backend::StoreBackend,
	bulk::BulkTransaction,
	query::{BoolQuery, Hit, Query, SearchRequest, SortOrder, SortSpec},
};

use crate::{DocumentError, SeekService, ServiceResult};

/// Outcome of one phase run over one tenant index.
#[derive(Debug, Default)]
pub struct PipelineReport {
	/// Documents successfully advanced.
	pub processed: u64,
	pub errors: Vec<DocumentError>,
}

/// Deep pagination over one index, ordered by `_id` so documents that leave
/// the selection mid-scan never shift the cursor.
pub struct Scan<'a> {
	backend: &'a dyn StoreBackend,
	indices: Vec<String>,
	request: SearchRequest,
	done: bool,
}
impl<'a> Scan<'a> {
	pub fn new(backend: &'a dyn StoreBackend, index: &str, query: Query, page_size: u32) -> Self {
		let mut request = SearchRequest::new(query, page_size);

		request.sort = vec![SortSpec::new("_id", SortOrder::Asc)];
		request.seq_no_primary_term = true;
		request.source_excludes = vec!["chunks".to_string()];

		Self { backend, indices: vec![index.to_string()], request, done: false }
	}

	/// Next page of hits, empty once exhausted. Every hit carries a
	/// concurrency token for conflict-checked updates.
	pub async fn next_page(&mut self) -> seek_store::Result<Vec<Hit>> {
		if self.done {
			return Ok(Vec::new());
		}

		let hits = self.backend.search(&self.indices, &self.request).await?;

		match hits.last() {
			Some(last) => self.request.search_after = Some(last.sort.clone()),
			None => self.done = true,
		}

		Ok(hits)
	}
}

impl SeekService {
	/// Phase one: fetch remote content for `wait` documents and convert it to
	/// indexable text. A failing document stays in `wait` and is retried on
	/// the next run.
	pub async fn load_and_convert(&self, tenant: &str) -> ServiceResult<PipelineReport> {
		let query = status_query(ContentStatus::Wait, vec![Query::Exists {
			field: "content_uri".to_string(),
		}]);
		let mut scan =
			Scan::new(self.store.as_ref(), &self.index_for(tenant), query, self.cfg.indexer.batch_size);
		let mut report = PipelineReport::default();

		loop {
			let hits = scan.next_page().await?;

			if hits.is_empty() {
				break;
			}

			let mut transaction =
				BulkTransaction::new(self.store.as_ref(), self.index_for(tenant), self.cfg.store.force_refresh);

			for hit in &hits {
				let Some(uri) = hit.source.get("content_uri").and_then(serde_json::Value::as_str)
				else {
					report.errors.push(DocumentError::Content {
						id: hit.id,
						message: "Document is waiting without a content_uri.".to_string(),
					});

					continue;
				};
				let bytes = match self
					.providers
					.download
					.download(uri, self.cfg.indexer.download_timeout_ms)
					.await
				{
					Ok(bytes) => bytes,
					Err(err) => {
						tracing::warn!(document = %hit.id, error = %err, "Content download failed.");
						report.errors.push(DocumentError::Download {
							id: hit.id,
							message: err.to_string(),
						});

						continue;
					},
				};
				let mimetype = hit.source.get("mimetype").and_then(serde_json::Value::as_str);

				match self.convert_bytes(mimetype, bytes).await {
					Ok(text) => queue_content_update(&mut transaction, hit, text),
					Err(message) => {
						tracing::warn!(document = %hit.id, %message, "Content conversion failed.");
						report.errors.push(DocumentError::Content { id: hit.id, message });
					},
				}
			}

			commit_page(&mut transaction, &mut report).await?;
		}

		tracing::info!(
			tenant,
			processed = report.processed,
			errors = report.errors.len(),
			"Load phase finished.",
		);

		Ok(report)
	}

	/// Phase two: retry conversion of `loaded` documents whose raw content is
	/// already inline. A failing document stays in `loaded`.
	pub async fn convert_loaded(&self, tenant: &str) -> ServiceResult<PipelineReport> {
		let query = status_query(ContentStatus::Loaded, Vec::new());
		let mut scan =
			Scan::new(self.store.as_ref(), &self.index_for(tenant), query, self.cfg.indexer.batch_size);
		let mut report = PipelineReport::default();

		loop {
			let hits = scan.next_page().await?;

			if hits.is_empty() {
				break;
			}

			let mut transaction =
				BulkTransaction::new(self.store.as_ref(), self.index_for(tenant), self.cfg.store.force_refresh);

			for hit in &hits {
				let Some((_, _, raw)) = language_values(&hit.source) else {
					report.errors.push(DocumentError::Content {
						id: hit.id,
						message: "Document has no language field pair.".to_string(),
					});

					continue;
				};
				let mimetype = hit.source.get("mimetype").and_then(serde_json::Value::as_str);

				match self.convert_bytes(mimetype, raw.into_bytes()).await {
					Ok(text) => queue_content_update(&mut transaction, hit, text),
					Err(message) => {
						tracing::warn!(document = %hit.id, %message, "Content conversion failed.");
						report.errors.push(DocumentError::Content { id: hit.id, message });
					},
				}
			}

			commit_page(&mut transaction, &mut report).await?;
		}

		tracing::info!(
			tenant,
			processed = report.processed,
			errors = report.errors.len(),
			"Convert phase finished.",
		);

		Ok(report)
	}

	/// Phase three: chunk and embed `ready` documents that have no chunks yet
	/// or were embedded with a different model. No-op while hybrid search is
	/// not fully configured.
	pub async fn embed_missing(&self, tenant: &str) -> ServiceResult<PipelineReport> {
		if !self.cfg.hybrid_search_enabled() {
			tracing::info!(
				missing = ?self.cfg.missing_hybrid_settings(),
				"Embedding phase skipped, hybrid search is not configured.",
			);

			return Ok(PipelineReport::default());
		}

		let model = self.cfg.providers.embedding.model.clone();
		let query = status_query(ContentStatus::Ready, vec![Query::Bool(BoolQuery {
			should: vec![
				// `chunks` is mapped nested and invisible to a parent-level
				// exists; the flat `embedding_model` keyword is written in the
				// same update and marks an embedded document.
				Query::Bool(BoolQuery {
					must_not: vec![Query::Exists { field: "embedding_model".to_string() }],
					..Default::default()
				}),
				Query::Bool(BoolQuery {
					must_not: vec![Query::term("embedding_model", model.as_str())],
					..Default::default()
				}),
			],
			minimum_should_match: Some(1),
			..Default::default()
		})]);
		let mut scan =
			Scan::new(self.store.as_ref(), &self.index_for(tenant), query, self.cfg.indexer.batch_size);
		let mut report = PipelineReport::default();
		let chunking = ChunkingConfig {
			chunk_size: self.cfg.chunking.chunk_size,
			chunk_overlap: self.cfg.chunking.chunk_overlap,
		};

		loop {
			let hits = scan.next_page().await?;

			if hits.is_empty() {
				break;
			}

			let mut transaction =
				BulkTransaction::new(self.store.as_ref(), self.index_for(tenant), self.cfg.store.force_refresh);

			for hit in &hits {
				let Some((_, title, content)) = language_values(&hit.source) else {
					report.errors.push(DocumentError::Content {
						id: hit.id,
						message: "Document has no language field pair.".to_string(),
					});

					continue;
				};
				let pieces = split_text(&content, &chunking);
				let inputs: Vec<String> = pieces
					.iter()
					.map(|piece| format_embedding_input(&title, &piece.text))
					.collect();

				if inputs.is_empty() {
					continue;
				}

				// All-or-nothing per document: one provider call covers every
				// chunk, and a failure leaves the document without chunks.
				let vectors = match self
					.providers
					.embedding
					.embed(&self.cfg.providers.embedding, &inputs)
					.await
				{
					Ok(vectors) if vectors.len() == pieces.len() => vectors,
					Ok(_) => {
						report.errors.push(DocumentError::Embedding {
							id: hit.id,
							message: "Provider returned a mismatched vector count.".to_string(),
						});

						continue;
					},
					Err(err) => {
						tracing::warn!(document = %hit.id, error = %err, "Chunk embedding failed.");
						report.errors.push(DocumentError::Embedding {
							id: hit.id,
							message: err.to_string(),
						});

						continue;
					},
				};
				let chunks: Vec<serde_json::Value> = pieces
					.iter()
					.zip(vectors)
					.map(|(piece, embedding)| {
						json!({
							"index": piece.chunk_index,
							"content": piece.text,
							"embedding": embedding,
						})
					})
					.collect();

				transaction.update(
					hit.id,
					json!({ "chunks": chunks, "embedding_model": model }),
					hit.token,
				);
			}

			commit_page(&mut transaction, &mut report).await?;
		}

		tracing::info!(
			tenant,
			processed = report.processed,
			errors = report.errors.len(),
			"Embedding phase finished.",
		);

		Ok(report)
	}

	/// Text for raw bytes: pass-through for directly indexable mimetypes,
	/// registered converter otherwise. `Err` carries the reason as a content
	/// error message.
	pub(crate) async fn convert_bytes(
		&self,
		mimetype: Option<&str>,
		bytes: Vec<u8>,
	) -> Result<String, String> {
		match self.converters.converter_for(mimetype)? {
			None => String::from_utf8(bytes)
				.map_err(|_| "Content is not valid UTF-8 text.".to_string()),
			Some(converter) => converter
				.convert(mimetype.unwrap_or_default(), bytes)
				.await
				.map_err(|err| err.to_string()),
		}
	}
}

fn status_query(status: ContentStatus, extra: Vec<Query>) -> Query {
	let mut filter = vec![
		Query::term("content_status", status.as_str()),
		Query::term("is_active", true),
	];

	filter.extend(extra);

	Query::Bool(BoolQuery { filter, ..Default::default() })
}

/// Buffers the `ready` transition. The converted text replaces the document's
/// existing language field; pipeline updates never re-detect the language.
fn queue_content_update(transaction: &mut BulkTransaction<'_>, hit: &Hit, text: String) {
	let language =
		language_values(&hit.source).map(|(language, _, _)| language).unwrap_or(LanguageCode::Und);

	transaction.update(
		hit.id,
		json!({
			"content": { language.as_str(): text },
			"content_status": ContentStatus::Ready.as_str(),
		}),
		hit.token,
	);
}

async fn commit_page(
	transaction: &mut BulkTransaction<'_>,
	report: &mut PipelineReport,
) -> ServiceResult<()> {
	let queued = transaction.len() as u64;
	let errors = transaction.commit().await?;

	report.processed += queued - errors.len() as u64;
	report.errors.extend(errors.into_iter().map(DocumentError::from));

	Ok(())
}
