use std::{future::Future, pin::Pin};

use crate::{
	Result,
	bulk::{BulkError, BulkOp},
	query::{Hit, Query, SearchRequest},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The store the engine writes to and queries. Implemented over HTTP for the
/// real store and in-process by the test double.
pub trait StoreBackend
where
	Self: Send + Sync,
{
	fn index_exists<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<bool>>;

	/// Creates the index with the analysis schema when missing.
	fn ensure_index<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<()>>;

	/// Removes a tenant index; missing indices are a no-op.
	fn delete_index<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<()>>;

	/// Creates the hybrid normalization pipeline when missing.
	fn ensure_search_pipeline<'a>(
		&'a self,
		id: &'a str,
		weights: &'a [f32],
	) -> BoxFuture<'a, Result<()>>;

	/// Sends one batch of writes, creating the index first when needed.
	/// Returns per-operation failures in submission order.
	fn bulk<'a>(
		&'a self,
		index: &'a str,
		ops: Vec<BulkOp>,
		refresh: bool,
	) -> BoxFuture<'a, Result<Vec<BulkError>>>;

	fn search<'a>(
		&'a self,
		indices: &'a [String],
		request: &'a SearchRequest,
	) -> BoxFuture<'a, Result<Vec<Hit>>>;

	/// Deletes every document matching the query, returning the count.
	fn delete_by_query<'a>(
		&'a self,
		index: &'a str,
		query: &'a Query,
		refresh: bool,
	) -> BoxFuture<'a, Result<u64>>;
}
