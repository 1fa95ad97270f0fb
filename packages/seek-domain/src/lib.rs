mod document;
mod language;
mod source;

pub use document::{
	Chunk, ContentStatus, Document, IngestDisposition, MAX_DOCUMENT_SIZE, Reach, ValidationError,
	format_embedding_input,
};
pub use language::{LanguageCode, detect_language};
pub use source::{SourceError, language_values, to_source};
