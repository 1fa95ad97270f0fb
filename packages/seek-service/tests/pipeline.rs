//! Maintenance phases: download, conversion retry and embedding backfill.

use std::sync::Arc;

use serde_json::json;

use seek_domain::language_values;
use seek_testkit::{FailingConverter, StaticConverter, fixtures};

const TENANT: &str = "acme";

#[tokio::test]
async fn load_phase_moves_wait_documents_to_ready() {
	let engine = seek_testkit::engine(fixtures::lexical_config());
	let uri = "https://example.test/report";
	let doc = fixtures::remote_document("quarterly report", uri);
	let id = doc.id;

	engine.downloader.serve(uri, b"Downloaded body text.".to_vec());
	engine.service.ingest_one(TENANT, doc).await.expect("Ingest must succeed.");

	let report =
		engine.service.load_and_convert(TENANT).await.expect("Load phase must succeed.");

	assert_eq!(report.processed, 1);
	assert!(report.errors.is_empty());

	let index = engine.service.index_for(TENANT);
	let source = engine.store.document(&index, id).expect("Document must be stored.");

	assert_eq!(source["content_status"], json!("ready"));

	// The converted text lands under the document's existing language pair.
	let (_, _, content) = language_values(&source).expect("Expected a language pair.");

	assert_eq!(content, "Downloaded body text.");
}

#[tokio::test]
async fn failed_download_leaves_the_document_waiting() {
	let engine = seek_testkit::engine(fixtures::lexical_config());
	let doc = fixtures::remote_document("unreachable", "https://example.test/gone");
	let id = doc.id;

	engine.service.ingest_one(TENANT, doc).await.expect("Ingest must succeed.");

	let report =
		engine.service.load_and_convert(TENANT).await.expect("Load phase must succeed.");

	assert_eq!(report.processed, 0);
	assert_eq!(report.errors.len(), 1);
	assert_eq!(report.errors[0].document_id(), id);

	let index = engine.service.index_for(TENANT);
	let source = engine.store.document(&index, id).expect("Document must be stored.");

	assert_eq!(source["content_status"], json!("wait"));
}

#[tokio::test]
async fn load_phase_converts_non_text_downloads() {
	let mut engine = seek_testkit::engine(fixtures::lexical_config());

	engine.service.converters.register(
		"application/pdf",
		Arc::new(StaticConverter { output: "Parsed report text.".to_string() }),
	);

	let uri = "https://example.test/report.pdf";
	let mut doc = fixtures::remote_document("annual report", uri);

	doc.mimetype = Some("application/pdf".to_string());

	let id = doc.id;

	engine.downloader.serve(uri, vec![0x25, 0x50, 0x44, 0x46]);
	engine.service.ingest_one(TENANT, doc).await.expect("Ingest must succeed.");

	let report =
		engine.service.load_and_convert(TENANT).await.expect("Load phase must succeed.");

	assert_eq!(report.processed, 1);

	let index = engine.service.index_for(TENANT);
	let source = engine.store.document(&index, id).expect("Document must be stored.");
	let (_, _, content) = language_values(&source).expect("Expected a language pair.");

	assert_eq!(content, "Parsed report text.");
}

#[tokio::test]
async fn convert_phase_holds_loaded_documents_while_the_converter_fails() {
	let mut engine = seek_testkit::engine(fixtures::lexical_config());

	engine.service.converters.register("application/pdf", Arc::new(FailingConverter));

	let mut doc = fixtures::document("scanned memo", "raw pdf bytes");

	doc.mimetype = Some("application/pdf".to_string());

	let id = doc.id;

	engine.service.ingest_one(TENANT, doc).await.expect("Ingest must succeed.");

	let report =
		engine.service.convert_loaded(TENANT).await.expect("Convert phase must succeed.");

	assert_eq!(report.processed, 0);
	assert_eq!(report.errors.len(), 1);

	let index = engine.service.index_for(TENANT);
	let source = engine.store.document(&index, id).expect("Document must be stored.");

	assert_eq!(source["content_status"], json!("loaded"));

	// Once the converter recovers the document advances.
	engine.service.converters.register(
		"application/pdf",
		Arc::new(StaticConverter { output: "Recovered text.".to_string() }),
	);

	let report =
		engine.service.convert_loaded(TENANT).await.expect("Convert phase must succeed.");

	assert_eq!(report.processed, 1);

	let source = engine.store.document(&index, id).expect("Document must be stored.");

	assert_eq!(source["content_status"], json!("ready"));
}

#[tokio::test]
async fn embedding_phase_is_a_no_op_without_hybrid_configuration() {
	let engine = seek_testkit::engine(fixtures::lexical_config());
	let doc = fixtures::document("wolf", "The wolf runs through the forest.");
	let id = doc.id;

	engine.service.ingest_one(TENANT, doc).await.expect("Ingest must succeed.");

	let report =
		engine.service.embed_missing(TENANT).await.expect("Embedding phase must succeed.");

	assert_eq!(report.processed, 0);
	assert_eq!(engine.embedder.calls(), 0);

	let index = engine.service.index_for(TENANT);
	let source = engine.store.document(&index, id).expect("Document must be stored.");

	assert!(source["chunks"].is_null());
}

#[tokio::test]
async fn embedding_phase_backfills_missing_chunks() {
	let engine = seek_testkit::engine(fixtures::hybrid_config());

	// Ingestion-time embedding fails; the backfill phase recovers later.
	engine.embedder.set_fail(true);

	let doc = fixtures::document("wolf", "The wolf runs through the forest.");
	let id = doc.id;

	engine.service.ingest_one(TENANT, doc).await.expect("Ingest must succeed.");
	engine.embedder.set_fail(false);

	let report =
		engine.service.embed_missing(TENANT).await.expect("Embedding phase must succeed.");

	assert_eq!(report.processed, 1);
	assert!(report.errors.is_empty());

	let index = engine.service.index_for(TENANT);
	let source = engine.store.document(&index, id).expect("Document must be stored.");

	assert!(source["chunks"].as_array().is_some_and(|chunks| !chunks.is_empty()));
	assert_eq!(source["embedding_model"], json!("test-embeddings"));

	// Already-embedded documents are not selected again, even though their
	// nested chunks are invisible to a parent-level exists.
	let calls = engine.embedder.calls();
	let report =
		engine.service.embed_missing(TENANT).await.expect("Embedding phase must succeed.");

	assert_eq!(report.processed, 0);
	assert_eq!(engine.embedder.calls(), calls);
}
