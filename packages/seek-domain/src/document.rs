use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Upper bound on `size`, enforced at the ingestion boundary.
pub const MAX_DOCUMENT_SIZE: u64 = 100 * 1024 * 1024 * 1024;

/// One retrievable unit. Text lives in `title`/`content` here and is stored
/// under a language-qualified field pair in the index (see `source`).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Document {
	pub id: Uuid,
	pub title: String,
	pub content: String,
	pub depth: Option<u32>,
	pub path: Option<String>,
	pub numchild: Option<u32>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
	pub size: Option<u64>,
	pub users: Vec<String>,
	pub groups: Vec<String>,
	pub reach: Reach,
	pub tags: Vec<String>,
	pub is_active: bool,
	pub mimetype: Option<String>,
	pub content_uri: Option<String>,
	pub content_status: ContentStatus,
	/// All-or-nothing: either every chunk carries an embedding or the list is
	/// empty and `embedding_model` is unset.
	pub chunks: Vec<Chunk>,
	pub embedding_model: Option<String>,
}
impl Document {
	/// Trims both text fields and lowercases the title, as stored and queried.
	pub fn normalize(&mut self) {
		self.title = self.title.trim().to_lowercase();
		self.content = self.content.trim().to_string();
	}

	/// Ingestion-boundary invariants. Callers normalize first.
	pub fn validate(&self, now: OffsetDateTime) -> Result<(), ValidationError> {
		if self.title.trim().is_empty() && self.content.trim().is_empty() {
			return Err(ValidationError::EmptyDocument { id: self.id });
		}
		if self.created_at > now {
			return Err(ValidationError::FutureTimestamp { id: self.id, field: "created_at" });
		}
		if self.updated_at > now {
			return Err(ValidationError::FutureTimestamp { id: self.id, field: "updated_at" });
		}
		if self.updated_at < self.created_at {
			return Err(ValidationError::TimestampOrder { id: self.id });
		}

		if let Some(size) = self.size
			&& size > MAX_DOCUMENT_SIZE
		{
			return Err(ValidationError::SizeExceeded { id: self.id, size });
		}

		for group in &self.groups {
			if !is_slug(group) {
				return Err(ValidationError::InvalidGroup { id: self.id, group: group.clone() });
			}
		}

		let embedded = self.chunks.iter().filter(|chunk| !chunk.embedding.is_empty()).count();

		if embedded != 0 && embedded != self.chunks.len() {
			return Err(ValidationError::PartialEmbedding { id: self.id });
		}
		if self.embedding_model.is_some() && self.chunks.is_empty() {
			return Err(ValidationError::PartialEmbedding { id: self.id });
		}

		Ok(())
	}

	/// Classifies a new document for ingestion per the lifecycle table.
	/// `directly_indexable` is the converter registry's verdict on the
	/// mimetype.
	pub fn ingest_disposition(&self, directly_indexable: bool) -> IngestDisposition {
		if self.content.trim().is_empty() && self.content_uri.is_some() {
			IngestDisposition::Download
		} else if directly_indexable {
			IngestDisposition::Index
		} else {
			IngestDisposition::Convert
		}
	}
}

/// What ingestion does with a new document before the first write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IngestDisposition {
	/// Content must be fetched later; the document enters the index as `Wait`.
	Download,
	/// Inline content needs conversion before it is searchable.
	Convert,
	/// Inline content is text-like and indexable as-is.
	Index,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Chunk {
	pub index: u32,
	pub content: String,
	pub embedding: Vec<f32>,
}

/// Coarse visibility tier.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reach {
	Public,
	Authenticated,
	Restricted,
}
impl Reach {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Public => "public",
			Self::Authenticated => "authenticated",
			Self::Restricted => "restricted",
		}
	}
}

/// Content lifecycle state. Transitions are driven synchronously by pipeline
/// phases; there are no timers.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
	/// Content must be downloaded from `content_uri`.
	Wait,
	/// Raw content is present but not yet converted to indexable text.
	Loaded,
	/// Content is final text and searchable.
	Ready,
}
impl ContentStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Wait => "wait",
			Self::Loaded => "loaded",
			Self::Ready => "ready",
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
	#[error("Document {id} must carry a title or content.")]
	EmptyDocument { id: Uuid },
	#[error("Document {id} field {field} must be in the past.")]
	FutureTimestamp { id: Uuid, field: &'static str },
	#[error("Document {id} updated_at must not precede created_at.")]
	TimestampOrder { id: Uuid },
	#[error("Document {id} size {size} exceeds the allowed maximum.")]
	SizeExceeded { id: Uuid, size: u64 },
	#[error("Document {id} group {group:?} is not a valid slug.")]
	InvalidGroup { id: Uuid, group: String },
	#[error("Document {id} chunk embeddings must be all-or-nothing.")]
	PartialEmbedding { id: Uuid },
}

/// The text handed to the embedding and rerank providers for a document.
pub fn format_embedding_input(title: &str, content: &str) -> String {
	format!("<{title}>:<{content}>")
}

fn is_slug(value: &str) -> bool {
	!value.is_empty()
		&& value
			.chars()
			.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_')
}
