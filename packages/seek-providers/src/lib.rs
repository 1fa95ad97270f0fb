pub mod convert;
pub mod download;
pub mod embedding;
pub mod rerank;

mod error;

pub use error::{Error, Result};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(
		AUTHORIZATION,
		format!("Bearer {api_key}")
			.parse()
			.map_err(|_| Error::InvalidHeader("authorization".to_string()))?,
	);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidHeader(format!("{key} value must be a string")));
		};

		headers.insert(
			HeaderName::from_bytes(key.as_bytes())
				.map_err(|_| Error::InvalidHeader(key.clone()))?,
			raw.parse().map_err(|_| Error::InvalidHeader(key.clone()))?,
		);
	}

	Ok(headers)
}
