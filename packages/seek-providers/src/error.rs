pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Http(#[from] reqwest::Error),
	#[error("Invalid provider header: {0}")]
	InvalidHeader(String),
	#[error("{0}")]
	MalformedResponse(String),
}
