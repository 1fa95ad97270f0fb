use std::time::Duration;

use reqwest::{
	Client,
	multipart::{Form, Part},
};
use serde_json::Value;

use crate::{Error, Result};

/// Document parse call: uploads raw bytes and returns the extracted markdown,
/// one page per entry, joined with newlines.
pub async fn convert(
	cfg: &seek_config::ConverterProviderConfig,
	mimetype: &str,
	content: Vec<u8>,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let part = Part::bytes(content)
		.file_name("input")
		.mime_str(mimetype)
		.map_err(|_| Error::InvalidHeader(format!("mimetype {mimetype}")))?;
	let form = Form::new().part("file", part).text("output_format", "markdown");
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.multipart(form)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_convert_response(json)
}

fn parse_convert_response(json: Value) -> Result<String> {
	let pages = json.get("data").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::MalformedResponse("Parse response is missing data array.".to_string())
	})?;
	let mut contents = Vec::with_capacity(pages.len());

	for page in pages {
		let content = page.get("content").and_then(|v| v.as_str()).ok_or_else(|| {
			Error::MalformedResponse("Parse response page missing content.".to_string())
		})?;

		contents.push(content);
	}

	Ok(contents.join("\n"))
}
