use serde_json::{Value, json};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{Document, LanguageCode};

/// Renders the store source for a document. Exactly one language pair is
/// written; a full `index` replace is what removes a previous language's
/// fields on re-ingestion.
pub fn to_source(document: &Document, language: LanguageCode) -> Result<Value, SourceError> {
	let chunks = if document.chunks.is_empty() {
		Value::Null
	} else {
		Value::Array(
			document
				.chunks
				.iter()
				.map(|chunk| {
					json!({
						"index": chunk.index,
						"content": chunk.content,
						"embedding": chunk.embedding,
					})
				})
				.collect(),
		)
	};

	Ok(json!({
		"id": document.id.to_string(),
		"title": { language.as_str(): document.title },
		"content": { language.as_str(): document.content },
		"depth": document.depth,
		"path": document.path,
		"numchild": document.numchild,
		"created_at": format_timestamp(document.created_at)?,
		"updated_at": format_timestamp(document.updated_at)?,
		"size": document.size,
		"users": document.users,
		"groups": document.groups,
		"reach": document.reach.as_str(),
		"tags": document.tags,
		"is_active": document.is_active,
		"mimetype": document.mimetype,
		"content_uri": document.content_uri,
		"content_status": document.content_status.as_str(),
		"chunks": chunks,
		"embedding_model": document.embedding_model,
	}))
}

/// First supported language pair found in a source document.
pub fn language_values(source: &Value) -> Option<(LanguageCode, String, String)> {
	let title = source.get("title");
	let content = source.get("content");

	for language in LanguageCode::ALL {
		let title_value =
			title.and_then(|value| value.get(language.as_str())).and_then(Value::as_str);
		let content_value =
			content.and_then(|value| value.get(language.as_str())).and_then(Value::as_str);

		if title_value.is_some() || content_value.is_some() {
			return Some((
				language,
				title_value.unwrap_or_default().to_string(),
				content_value.unwrap_or_default().to_string(),
			));
		}
	}

	None
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
	#[error("Failed to format a document timestamp.")]
	FormatTimestamp(#[from] time::error::Format),
}

fn format_timestamp(timestamp: OffsetDateTime) -> Result<String, SourceError> {
	Ok(timestamp.format(&Rfc3339)?)
}

#[cfg(test)]
mod tests {
	use time::Duration;
	use uuid::Uuid;

	use super::*;
	use crate::{Chunk, ContentStatus, Reach};

	fn sample() -> Document {
		let now = OffsetDateTime::now_utc().replace_nanosecond(0).unwrap()
			- Duration::minutes(5);

		Document {
			id: Uuid::new_v4(),
			title: "titre du document".to_string(),
			content: "Contenu du document.".to_string(),
			depth: Some(2),
			path: Some("00010002".to_string()),
			numchild: Some(0),
			created_at: now,
			updated_at: now,
			size: Some(64),
			users: vec!["user-a".to_string()],
			groups: vec!["group-a".to_string()],
			reach: Reach::Restricted,
			tags: vec!["memo".to_string()],
			is_active: true,
			mimetype: Some("text/plain".to_string()),
			content_uri: None,
			content_status: ContentStatus::Ready,
			chunks: vec![Chunk {
				index: 0,
				content: "Contenu du document.".to_string(),
				embedding: vec![0.25, 0.5],
			}],
			embedding_model: Some("embeddings-small".to_string()),
		}
	}

	#[test]
	fn source_carries_exactly_one_language_pair() {
		let document = sample();
		let source = to_source(&document, LanguageCode::Fr).expect("Failed to encode source.");

		assert_eq!(source["title"]["fr"], json!("titre du document"));
		assert!(source["title"].get("en").is_none());
		assert_eq!(source["id"], json!(document.id.to_string()));
		assert_eq!(source["reach"], json!("restricted"));
		assert_eq!(source["content_status"], json!("ready"));
		assert_eq!(source["chunks"][0]["embedding"], json!([0.25, 0.5]));
		assert_eq!(source["embedding_model"], json!("embeddings-small"));
	}

	#[test]
	fn empty_chunks_encode_as_null() {
		let mut document = sample();

		document.chunks = Vec::new();
		document.embedding_model = None;

		let source = to_source(&document, LanguageCode::Und).expect("Failed to encode source.");

		assert!(source["chunks"].is_null());
		assert!(source["embedding_model"].is_null());
	}

	#[test]
	fn language_values_finds_the_active_pair() {
		let source = json!({
			"title": { "de": "titel" },
			"content": { "de": "inhalt" },
		});
		let (language, title, content) =
			language_values(&source).expect("Expected a language pair.");

		assert_eq!(language, LanguageCode::De);
		assert_eq!(title, "titel");
		assert_eq!(content, "inhalt");
	}
}
