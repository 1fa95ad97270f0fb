use std::{collections::HashMap, sync::Arc};

use seek_config::ConverterProviderConfig;
use seek_store::backend::BoxFuture;

/// Turns raw document bytes into indexable text.
pub trait Converter
where
	Self: Send + Sync,
{
	fn convert<'a>(
		&'a self,
		mimetype: &'a str,
		content: Vec<u8>,
	) -> BoxFuture<'a, seek_providers::Result<String>>;
}

/// Static dispatch table from exact mimetype to converter. Mimetypes matching
/// an indexable glob bypass conversion entirely; anything else without a
/// registered converter is a hard content error for that document.
pub struct ConverterRegistry {
	converters: HashMap<String, Arc<dyn Converter>>,
	/// Glob patterns for mimetypes indexable as-is. A pattern ending in `/`
	/// matches every subtype; otherwise it must match exactly.
	indexable: Vec<String>,
}
impl ConverterRegistry {
	pub fn new() -> Self {
		Self { converters: HashMap::new(), indexable: vec!["text/".to_string()] }
	}

	pub fn with_defaults(cfg: ConverterProviderConfig) -> Self {
		let mut registry = Self::new();

		registry.register("application/pdf", Arc::new(RemoteConverter { cfg }));

		registry
	}

	pub fn register(&mut self, mimetype: impl Into<String>, converter: Arc<dyn Converter>) {
		self.converters.insert(mimetype.into(), converter);
	}

	pub fn is_directly_indexable(&self, mimetype: Option<&str>) -> bool {
		let Some(mimetype) = mimetype else {
			return false;
		};

		!mimetype.is_empty()
			&& self.indexable.iter().any(|pattern| match_mimetype_glob(mimetype, pattern))
	}

	/// `Ok(None)` when no conversion is needed; `Err` with the reason when the
	/// mimetype is neither indexable nor registered.
	pub fn converter_for(&self, mimetype: Option<&str>) -> Result<Option<Arc<dyn Converter>>, String> {
		if self.is_directly_indexable(mimetype) {
			return Ok(None);
		}

		let mimetype = mimetype.unwrap_or_default();

		self.converters.get(mimetype).cloned().map(Some).ok_or_else(|| {
			format!("No such converter for the unindexable mimetype {mimetype:?}")
		})
	}
}
impl Default for ConverterRegistry {
	fn default() -> Self {
		Self::new()
	}
}

/// Remote document parse API client.
pub struct RemoteConverter {
	pub cfg: ConverterProviderConfig,
}
impl Converter for RemoteConverter {
	fn convert<'a>(
		&'a self,
		mimetype: &'a str,
		content: Vec<u8>,
	) -> BoxFuture<'a, seek_providers::Result<String>> {
		Box::pin(seek_providers::convert::convert(&self.cfg, mimetype, content))
	}
}

/// A pattern ending in `/` matches every subtype; otherwise the mimetype must
/// match exactly. `application/pdf` never matches `application/pdf+bin`.
pub fn match_mimetype_glob(mimetype: &str, pattern: &str) -> bool {
	if mimetype.is_empty() {
		return false;
	}
	if pattern.ends_with('/') {
		return mimetype.starts_with(pattern);
	}

	mimetype == pattern
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn prefix_patterns_match_all_subtypes() {
		assert!(match_mimetype_glob("text/plain", "text/"));
		assert!(match_mimetype_glob("text/html", "text/"));
		assert!(!match_mimetype_glob("application/pdf", "text/"));
	}

	#[test]
	fn exact_patterns_reject_suffixed_variants() {
		assert!(match_mimetype_glob("application/pdf", "application/pdf"));
		assert!(!match_mimetype_glob("application/pdf+bin", "application/pdf"));
	}

	#[test]
	fn empty_mimetype_never_matches() {
		assert!(!match_mimetype_glob("", "text/"));
	}

	#[test]
	fn registry_flags_text_as_directly_indexable() {
		let registry = ConverterRegistry::new();

		assert!(registry.is_directly_indexable(Some("text/markdown")));
		assert!(!registry.is_directly_indexable(Some("application/pdf")));
		assert!(!registry.is_directly_indexable(None));
	}

	#[test]
	fn unregistered_mimetype_is_a_content_error() {
		let registry = ConverterRegistry::new();

		assert!(registry.converter_for(Some("text/plain")).expect("text must pass").is_none());
		assert!(registry.converter_for(Some("application/zip")).is_err());
	}
}
