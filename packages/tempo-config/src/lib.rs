mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Chunking, Config, EmbeddingProviderConfig, LlmProviderConfig, Postgres, Providers, Search,
	SearchCascade, SearchEnhancement, SearchRanking, Service, Storage, Validation, Worker,
};

use std::{fs, path::Path};

const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

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
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.admin_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.postgres.statement_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.statement_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}

	for (label, timeout_ms) in [
		("embedding", cfg.providers.embedding.timeout_ms),
		("completion", cfg.providers.completion.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("Provider {label} timeout_ms must be greater than zero."),
			});
		}
	}
	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("completion", &cfg.providers.completion.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if !cfg.providers.completion.temperature.is_finite()
		|| !(0.0..=2.0).contains(&cfg.providers.completion.temperature)
	{
		return Err(Error::Validation {
			message: "providers.completion.temperature must be in the range 0.0-2.0.".to_string(),
		});
	}
	if cfg.chunking.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
		return Err(Error::Validation {
			message: "chunking.utc_offset_minutes must be within +/-1080.".to_string(),
		});
	}
	if cfg.chunking.reference_session_minutes == 0 {
		return Err(Error::Validation {
			message: "chunking.reference_session_minutes must be greater than zero.".to_string(),
		});
	}

	validate_ranking(cfg)?;
	validate_enhancement(cfg)?;

	let validation = &cfg.validation;

	for (label, value) in [
		("validation.correction_threshold", validation.correction_threshold),
		("validation.fallback_score", validation.fallback_score),
	] {
		if !value.is_finite() || !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if cfg.worker.batch_size == 0 {
		return Err(Error::Validation {
			message: "worker.batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "worker.poll_interval_ms must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_ranking(cfg: &Config) -> Result<()> {
	let ranking = &cfg.search.ranking;

	if !ranking.min_similarity.is_finite() || !(0.0..=1.0).contains(&ranking.min_similarity) {
		return Err(Error::Validation {
			message: "search.ranking.min_similarity must be in the range 0.0-1.0.".to_string(),
		});
	}
	if ranking.semantic_limit == 0 || ranking.lexical_limit == 0 {
		return Err(Error::Validation {
			message: "search.ranking semantic_limit and lexical_limit must be greater than zero."
				.to_string(),
		});
	}
	if !ranking.priority_weight.is_finite() || ranking.priority_weight < 0.0 {
		return Err(Error::Validation {
			message: "search.ranking.priority_weight must be a finite number zero or greater."
				.to_string(),
		});
	}
	if !ranking.rrf_k.is_finite() || ranking.rrf_k <= 0.0 {
		return Err(Error::Validation {
			message: "search.ranking.rrf_k must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_enhancement(cfg: &Config) -> Result<()> {
	let enhancement = &cfg.search.enhancement;

	for (label, weight) in [
		("hyde_weight", enhancement.hyde_weight),
		("hyde_original_weight", enhancement.hyde_original_weight),
		("combined_hyde_weight", enhancement.combined_hyde_weight),
		("combined_decomposition_weight", enhancement.combined_decomposition_weight),
		("combined_original_weight", enhancement.combined_original_weight),
	] {
		if !weight.is_finite() || weight < 0.0 {
			return Err(Error::Validation {
				message: format!(
					"search.enhancement.{label} must be a finite number zero or greater."
				),
			});
		}
	}

	if enhancement.min_sub_queries < 2 {
		return Err(Error::Validation {
			message: "search.enhancement.min_sub_queries must be at least 2.".to_string(),
		});
	}
	if enhancement.max_sub_queries < enhancement.min_sub_queries {
		return Err(Error::Validation {
			message:
				"search.enhancement.max_sub_queries must be at least search.enhancement.min_sub_queries."
					.to_string(),
		});
	}
	if !(0.0..=1.0).contains(&enhancement.min_confidence) {
		return Err(Error::Validation {
			message: "search.enhancement.min_confidence must be in the range 0.0-1.0.".to_string(),
		});
	}
	if enhancement.result_limit == 0 {
		return Err(Error::Validation {
			message: "search.enhancement.result_limit must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for api_base in
		[&mut cfg.providers.embedding.api_base, &mut cfg.providers.completion.api_base]
	{
		let trimmed = api_base.trim().trim_end_matches('/').to_string();

		*api_base = trimmed;
	}

	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}
}
