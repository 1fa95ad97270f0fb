use std::time::Duration;

use reqwest::Client;

use crate::Result;

/// Fetches remote document content with a bounded timeout.
pub async fn download(uri: &str, timeout_ms: u64) -> Result<Vec<u8>> {
	let client = Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?;
	let res = client.get(uri).send().await?.error_for_status()?;

	Ok(res.bytes().await?.to_vec())
}
