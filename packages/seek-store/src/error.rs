use crate::bulk::BulkError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Http(#[from] reqwest::Error),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	#[error("Store returned status {status} for {operation}: {body}")]
	UnexpectedResponse { operation: &'static str, status: u16, body: String },
	#[error("Bulk commit reported {} failed operation(s).", .errors.len())]
	Bulk { errors: Vec<BulkError> },
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
}
