use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub chunking: Chunking,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub validation: Validation,
	#[serde(default)]
	pub worker: Worker,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
	/// Upper bound for a single similarity or lexical query, in milliseconds.
	#[serde(default = "default_statement_timeout_ms")]
	pub statement_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub completion: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	#[serde(default)]
	pub max_tokens: Option<u32>,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Chunking {
	/// Offset applied to session timestamps before bucketing by hour, day, week, and month.
	pub utc_offset_minutes: i32,
	/// Sessions at least this long count as substantial work.
	pub substantial_session_minutes: u32,
	/// Reference session length used to normalize average durations.
	pub reference_session_minutes: u32,
}
impl Default for Chunking {
	fn default() -> Self {
		Self { utc_offset_minutes: 0, substantial_session_minutes: 25, reference_session_minutes: 30 }
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Search {
	pub cascade: SearchCascade,
	pub ranking: SearchRanking,
	pub enhancement: SearchEnhancement,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SearchCascade {
	pub simple_min_summary_docs: u32,
	pub simple_min_relevant_docs: u32,
	pub moderate_min_relevant_docs: u32,
	pub moderate_min_total_docs: u32,
	pub daily_min_docs: u32,
	pub daily_min_total_docs: u32,
	pub max_monthly: u32,
	pub max_weekly: u32,
	pub weekly_total_cap: u32,
	pub max_relevant: u32,
	pub relevant_total_cap: u32,
	pub max_daily: u32,
	pub daily_total_cap: u32,
}
impl Default for SearchCascade {
	fn default() -> Self {
		Self {
			simple_min_summary_docs: 2,
			simple_min_relevant_docs: 4,
			moderate_min_relevant_docs: 6,
			moderate_min_total_docs: 8,
			daily_min_docs: 2,
			daily_min_total_docs: 12,
			max_monthly: 3,
			max_weekly: 4,
			weekly_total_cap: 18,
			max_relevant: 8,
			relevant_total_cap: 15,
			max_daily: 5,
			daily_total_cap: 20,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SearchRanking {
	pub min_similarity: f32,
	pub semantic_limit: u32,
	pub lexical_limit: u32,
	/// Query terms must be strictly longer than this many characters.
	pub min_term_chars: u32,
	pub priority_weight: f32,
	pub rrf_k: f32,
}
impl Default for SearchRanking {
	fn default() -> Self {
		Self {
			min_similarity: 0.1,
			semantic_limit: 15,
			lexical_limit: 10,
			min_term_chars: 2,
			priority_weight: 10.0,
			rrf_k: 60.0,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SearchEnhancement {
	pub enabled: bool,
	pub hyde_weight: f32,
	pub hyde_original_weight: f32,
	pub combined_hyde_weight: f32,
	pub combined_decomposition_weight: f32,
	pub combined_original_weight: f32,
	pub min_sub_queries: u32,
	pub max_sub_queries: u32,
	pub decomposition_min_words: u32,
	pub combined_min_words: u32,
	pub min_confidence: f32,
	pub result_limit: u32,
}
impl Default for SearchEnhancement {
	fn default() -> Self {
		Self {
			enabled: true,
			hyde_weight: 0.7,
			hyde_original_weight: 0.3,
			combined_hyde_weight: 0.4,
			combined_decomposition_weight: 0.3,
			combined_original_weight: 0.3,
			min_sub_queries: 2,
			max_sub_queries: 4,
			decomposition_min_words: 8,
			combined_min_words: 15,
			min_confidence: 0.6,
			result_limit: 20,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Validation {
	pub enabled: bool,
	/// Answers scoring at or below this value get one correction pass.
	pub correction_threshold: f32,
	/// Score reported when the validator is unavailable or its output cannot be parsed.
	pub fallback_score: f32,
}
impl Default for Validation {
	fn default() -> Self {
		Self { enabled: true, correction_threshold: 0.8, fallback_score: 0.7 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Worker {
	pub poll_interval_ms: u64,
	pub batch_size: u32,
	pub max_backoff_ms: u64,
}
impl Default for Worker {
	fn default() -> Self {
		Self { poll_interval_ms: 500, batch_size: 32, max_backoff_ms: 30_000 }
	}
}

fn default_statement_timeout_ms() -> u64 {
	5_000
}
