use serde_json::Value;
use uuid::Uuid;

use crate::{Result, backend::StoreBackend, error::Error};

/// Optimistic-concurrency stamp read from a search hit. An `update` carrying
/// a stale token is rejected by the store instead of clobbering a newer
/// version.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConcurrencyToken {
	pub seq_no: u64,
	pub primary_term: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BulkAction {
	/// Fails per-item when the id already exists.
	Create,
	/// Full replace, creating the document when absent.
	Index,
	/// Partial merge into the existing source.
	Update,
}
impl BulkAction {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Create => "create",
			Self::Index => "index",
			Self::Update => "update",
		}
	}
}

/// One buffered operation. For `Update` the payload is the partial document;
/// otherwise it is the full source.
#[derive(Clone, Debug)]
pub struct BulkOp {
	pub action: BulkAction,
	pub id: Uuid,
	pub payload: Value,
	pub token: Option<ConcurrencyToken>,
}

/// Per-operation failure from a commit, in submission order.
#[derive(Clone, Debug)]
pub struct BulkError {
	pub document_id: Uuid,
	pub action: BulkAction,
	pub status: u16,
	/// The store's native reason string.
	pub message: String,
	pub raw: Value,
}

/// Buffered batch of write operations against one tenant index, sent as a
/// single request by [`commit`](Self::commit).
pub struct BulkTransaction<'a> {
	backend: &'a dyn StoreBackend,
	index: String,
	refresh: bool,
	ops: Vec<BulkOp>,
}
impl<'a> BulkTransaction<'a> {
	pub fn new(backend: &'a dyn StoreBackend, index: impl Into<String>, refresh: bool) -> Self {
		Self { backend, index: index.into(), refresh, ops: Vec::new() }
	}

	pub fn create(&mut self, id: Uuid, source: Value) -> &mut Self {
		self.ops.push(BulkOp { action: BulkAction::Create, id, payload: source, token: None });

		self
	}

	pub fn index(&mut self, id: Uuid, source: Value) -> &mut Self {
		self.ops.push(BulkOp { action: BulkAction::Index, id, payload: source, token: None });

		self
	}

	pub fn update(&mut self, id: Uuid, partial: Value, token: Option<ConcurrencyToken>) -> &mut Self {
		self.ops.push(BulkOp { action: BulkAction::Update, id, payload: partial, token });

		self
	}

	pub fn is_empty(&self) -> bool {
		self.ops.is_empty()
	}

	pub fn len(&self) -> usize {
		self.ops.len()
	}

	/// Sends the buffered operations and clears the buffer. An empty buffer is
	/// a guaranteed no-op: no network call, no index creation. Failures come
	/// back as [`BulkError`]s in submission order, never as an `Err`.
	pub async fn commit(&mut self) -> Result<Vec<BulkError>> {
		let ops = std::mem::take(&mut self.ops);

		if ops.is_empty() {
			return Ok(Vec::new());
		}

		tracing::debug!(index = %self.index, operations = ops.len(), "Committing bulk transaction.");

		self.backend.bulk(&self.index, ops, self.refresh).await
	}

	/// Commits and raises when any operation failed.
	pub async fn commit_strict(&mut self) -> Result<()> {
		let errors = self.commit().await?;

		if errors.is_empty() { Ok(()) } else { Err(Error::Bulk { errors }) }
	}
}

/// Scoped commit helper: builds a transaction, hands it to the closure, and
/// commits exactly once when the closure returns. Buffering is synchronous so
/// no operation can be dropped between buffering and commit.
pub async fn with_transaction<T, F>(
	backend: &dyn StoreBackend,
	index: &str,
	refresh: bool,
	build: F,
) -> Result<(T, Vec<BulkError>)>
where
	F: FnOnce(&mut BulkTransaction<'_>) -> T,
{
	let mut transaction = BulkTransaction::new(backend, index, refresh);
	let value = build(&mut transaction);
	let errors = transaction.commit().await?;

	Ok((value, errors))
}
