pub mod backend;
pub mod bulk;
pub mod http;
pub mod query;
pub mod schema;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Deterministic tenant index name.
pub fn index_name(prefix: &str, tenant: &str) -> String {
	format!("{prefix}-{tenant}")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn index_names_are_prefix_qualified() {
		assert_eq!(index_name("seek-index", "acme"), "seek-index-acme");
	}
}
