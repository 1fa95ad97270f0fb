//! Deletion is ownership-gated: only documents listing the caller in `users`
//! are removed. Visited and group access never grant deletion.

use serde_json::Value;
use uuid::Uuid;

use seek_store::query::{BoolQuery, Query, SearchRequest, SortOrder, SortSpec};

use crate::{SeekService, ServiceError, ServiceResult, access};

/// Selection for one deletion call. At least one of the two selectors must be
/// non-empty; combined, they intersect.
#[derive(Clone, Debug, Default)]
pub struct DeleteRequest {
	pub document_ids: Vec<Uuid>,
	pub tags: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct DeleteResponse {
	pub deleted: u64,
	/// Explicitly requested ids the caller does not own, or that do not
	/// exist. Only populated for id-based selections.
	pub undeleted_ids: Vec<Uuid>,
}

impl SeekService {
	pub async fn delete_documents(
		&self,
		tenant: &str,
		user_sub: &str,
		request: &DeleteRequest,
	) -> ServiceResult<DeleteResponse> {
		if request.document_ids.is_empty() && request.tags.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "Deletion requires document ids or tags.".to_string(),
			});
		}

		let mut filter = vec![access::ownership_filter(user_sub)];

		if !request.document_ids.is_empty() {
			filter.push(Query::terms(
				"_id",
				request.document_ids.iter().map(|id| Value::String(id.to_string())).collect(),
			));
		}
		if !request.tags.is_empty() {
			filter.push(Query::terms(
				"tags",
				request.tags.iter().map(|tag| Value::String(tag.clone())).collect(),
			));
		}

		let query = Query::Bool(BoolQuery { filter, ..Default::default() });
		let index = self.index_for(tenant);
		let undeleted_ids = if request.document_ids.is_empty() {
			Vec::new()
		} else {
			self.undeletable_ids(&index, &query, &request.document_ids).await?
		};
		let deleted =
			self.store.delete_by_query(&index, &query, self.cfg.store.force_refresh).await?;

		tracing::info!(
			tenant,
			deleted,
			undeleted = undeleted_ids.len(),
			"Deletion request finished.",
		);

		Ok(DeleteResponse { deleted, undeleted_ids })
	}

	/// Requested ids minus those the deletion query actually matches, in
	/// request order.
	async fn undeletable_ids(
		&self,
		index: &str,
		query: &Query,
		requested: &[Uuid],
	) -> ServiceResult<Vec<Uuid>> {
		let mut store_request = SearchRequest::new(query.clone(), requested.len() as u32);

		store_request.sort = vec![SortSpec::new("_id", SortOrder::Asc)];
		store_request.source_excludes = vec!["chunks".to_string()];

		let hits = self.store.search(&[index.to_string()], &store_request).await?;
		let deletable: Vec<Uuid> = hits.iter().map(|hit| hit.id).collect();

		Ok(requested.iter().filter(|id| !deletable.contains(id)).copied().collect())
	}
}
