mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Chunking, Config, ConverterProviderConfig, EmbeddingProviderConfig, Indexer, Language,
	Providers, RerankProviderConfig, Search, Store,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.store.url.trim().is_empty() {
		return Err(Error::Validation { message: "store.url must be non-empty.".to_string() });
	}
	if cfg.store.index_prefix.trim().is_empty() {
		return Err(Error::Validation {
			message: "store.index_prefix must be non-empty.".to_string(),
		});
	}
	if !cfg
		.store
		.index_prefix
		.chars()
		.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
	{
		return Err(Error::Validation {
			message: "store.index_prefix must contain only lowercase letters, digits, and hyphens."
				.to_string(),
		});
	}
	if cfg.store.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "store.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.indexer.batch_size == 0 {
		return Err(Error::Validation {
			message: "indexer.batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.indexer.download_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "indexer.download_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.chunking.chunk_size == 0 {
		return Err(Error::Validation {
			message: "chunking.chunk_size must be greater than zero.".to_string(),
		});
	}
	if cfg.chunking.chunk_overlap >= cfg.chunking.chunk_size {
		return Err(Error::Validation {
			message: "chunking.chunk_overlap must be less than chunking.chunk_size.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.language.confidence_threshold) {
		return Err(Error::Validation {
			message: "language.confidence_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.search.hybrid_pipeline.trim().is_empty() {
		return Err(Error::Validation {
			message: "search.hybrid_pipeline must be non-empty.".to_string(),
		});
	}
	if cfg.search.hybrid_weights.len() != 2 {
		return Err(Error::Validation {
			message: "search.hybrid_weights must hold exactly two weights.".to_string(),
		});
	}

	for weight in &cfg.search.hybrid_weights {
		if !weight.is_finite() || !(0.0..=1.0).contains(weight) {
			return Err(Error::Validation {
				message: "search.hybrid_weights entries must be in the range 0.0-1.0.".to_string(),
			});
		}
	}

	if cfg.search.hybrid_weights.iter().sum::<f32>() <= 0.0 {
		return Err(Error::Validation {
			message: "search.hybrid_weights must not sum to zero.".to_string(),
		});
	}
	if !cfg.search.trigram_boost.is_finite() || cfg.search.trigram_boost <= 0.0 {
		return Err(Error::Validation {
			message: "search.trigram_boost must be greater than zero.".to_string(),
		});
	}
	if cfg.search.trigram_minimum_should_match.trim().is_empty() {
		return Err(Error::Validation {
			message: "search.trigram_minimum_should_match must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.enabled {
		if cfg.providers.embedding.dimensions == 0 {
			return Err(Error::Validation {
				message: "providers.embedding.dimensions must be greater than zero.".to_string(),
			});
		}
		if cfg.providers.embedding.timeout_ms == 0 {
			return Err(Error::Validation {
				message: "providers.embedding.timeout_ms must be greater than zero.".to_string(),
			});
		}
	}
	if cfg.providers.reranker.enabled {
		for (label, value) in [
			("providers.reranker.api_base", &cfg.providers.reranker.api_base),
			("providers.reranker.model", &cfg.providers.reranker.model),
		] {
			if value.trim().is_empty() {
				return Err(Error::Validation {
					message: format!("{label} must be non-empty when the reranker is enabled."),
				});
			}
		}

		if cfg.providers.reranker.timeout_ms == 0 {
			return Err(Error::Validation {
				message: "providers.reranker.timeout_ms must be greater than zero.".to_string(),
			});
		}
	}
	if cfg.providers.converter.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.converter.timeout_ms must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.store.username.as_deref().map(|name| name.trim().is_empty()).unwrap_or(false) {
		cfg.store.username = None;
	}
	if cfg.store.password.as_deref().map(|pass| pass.trim().is_empty()).unwrap_or(false) {
		cfg.store.password = None;
	}

	for base in [
		&mut cfg.store.url,
		&mut cfg.providers.embedding.api_base,
		&mut cfg.providers.reranker.api_base,
		&mut cfg.providers.converter.api_base,
	] {
		while base.ends_with('/') {
			base.pop();
		}
	}
}
