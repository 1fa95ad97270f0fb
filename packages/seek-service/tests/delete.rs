//! Deletion contract: ownership-gated, with unowned ids reported back.

use seek_service::DeleteRequest;
use seek_testkit::fixtures;

const TENANT: &str = "acme";

#[tokio::test]
async fn deletes_owned_documents_and_reports_the_rest() {
	let engine = seek_testkit::engine(fixtures::lexical_config());
	let owned = fixtures::document("mine", "Owned by alice.");
	let mut foreign = fixtures::document("theirs", "Owned by bob.");

	foreign.users = vec!["bob".to_string()];

	let owned_id = owned.id;
	let foreign_id = foreign.id;

	engine.service.ingest(TENANT, vec![owned, foreign]).await.expect("Ingest must succeed.");

	let request = DeleteRequest {
		document_ids: vec![owned_id, foreign_id],
		tags: Vec::new(),
	};
	let response = engine
		.service
		.delete_documents(TENANT, "alice", &request)
		.await
		.expect("Deletion must succeed.");

	assert_eq!(response.deleted, 1);
	assert_eq!(response.undeleted_ids, vec![foreign_id]);

	let index = engine.service.index_for(TENANT);

	assert!(engine.store.document(&index, owned_id).is_none());
	assert!(engine.store.document(&index, foreign_id).is_some());
}

#[tokio::test]
async fn unknown_ids_come_back_as_undeleted() {
	let engine = seek_testkit::engine(fixtures::lexical_config());
	let doc = fixtures::document("mine", "Owned by alice.");
	let id = doc.id;
	let ghost = uuid::Uuid::new_v4();

	engine.service.ingest_one(TENANT, doc).await.expect("Ingest must succeed.");

	let request = DeleteRequest { document_ids: vec![id, ghost], tags: Vec::new() };
	let response = engine
		.service
		.delete_documents(TENANT, "alice", &request)
		.await
		.expect("Deletion must succeed.");

	assert_eq!(response.deleted, 1);
	assert_eq!(response.undeleted_ids, vec![ghost]);
}

#[tokio::test]
async fn tag_selection_deletes_owned_matches_only() {
	let engine = seek_testkit::engine(fixtures::lexical_config());
	let mut first = fixtures::document("memo one", "First memo.");
	let mut second = fixtures::document("memo two", "Second memo.");
	let mut foreign = fixtures::document("memo three", "Not mine.");
	let keep = fixtures::document("untagged", "No tags here.");

	first.tags = vec!["memo".to_string()];
	second.tags = vec!["memo".to_string()];
	foreign.tags = vec!["memo".to_string()];
	foreign.users = vec!["bob".to_string()];

	let keep_id = keep.id;
	let foreign_id = foreign.id;

	engine
		.service
		.ingest(TENANT, vec![first, second, foreign, keep])
		.await
		.expect("Ingest must succeed.");

	let request = DeleteRequest { document_ids: Vec::new(), tags: vec!["memo".to_string()] };
	let response = engine
		.service
		.delete_documents(TENANT, "alice", &request)
		.await
		.expect("Deletion must succeed.");

	assert_eq!(response.deleted, 2);
	assert!(response.undeleted_ids.is_empty());

	let index = engine.service.index_for(TENANT);

	assert!(engine.store.document(&index, keep_id).is_some());
	assert!(engine.store.document(&index, foreign_id).is_some());
}

#[tokio::test]
async fn empty_selection_is_rejected() {
	let engine = seek_testkit::engine(fixtures::lexical_config());
	let request = DeleteRequest::default();

	assert!(engine.service.delete_documents(TENANT, "alice", &request).await.is_err());
}
