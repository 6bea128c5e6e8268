use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use tempo_config::{Config, Error};

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_value() -> Value {
	toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.")
}

fn set_path(value: &mut Value, path: &[&str], new_value: Value) {
	let (last, parents) = path.split_last().expect("Path must be non-empty.");
	let mut table = value.as_table_mut().expect("Config must be a table.");

	for key in parents {
		table = table
			.entry(key.to_string())
			.or_insert_with(|| Value::Table(Default::default()))
			.as_table_mut()
			.expect("Config section must be a table.");
	}

	table.insert(last.to_string(), new_value);
}

fn remove_path(value: &mut Value, path: &[&str]) {
	let (last, parents) = path.split_last().expect("Path must be non-empty.");
	let mut table = value.as_table_mut().expect("Config must be a table.");

	for key in parents {
		table = table
			.get_mut(*key)
			.and_then(Value::as_table_mut)
			.expect("Config section must be a table.");
	}

	table.remove(*last);
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("tempo_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_value(value: Value) -> tempo_config::Result<Config> {
	let payload = toml::to_string(&value).expect("Failed to render test config.");
	let path = write_temp_config(payload);
	let result = tempo_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn expect_validation_error(value: Value, expected: &str) {
	let err = load_value(value).expect_err("Expected validation error.");
	let message = err.to_string();

	assert!(matches!(err, Error::Validation { .. }), "Unexpected error kind: {err:?}");
	assert!(message.contains(expected), "Unexpected error message: {message}");
}

#[test]
fn sample_config_loads_and_normalizes_api_base() {
	let cfg = load_value(sample_value()).expect("Sample config must load.");

	assert_eq!(cfg.providers.embedding.api_base, "https://api.openai.com/v1");
	assert_eq!(cfg.providers.embedding.dimensions, 1_536);
	assert_eq!(cfg.storage.postgres.statement_timeout_ms, 5_000);
}

#[test]
fn omitted_policy_sections_use_defaults() {
	let mut value = sample_value();

	remove_path(&mut value, &["search"]);
	remove_path(&mut value, &["validation"]);
	remove_path(&mut value, &["chunking"]);

	let cfg = load_value(value).expect("Config without policy sections must load.");

	assert_eq!(cfg.search.cascade.max_monthly, 3);
	assert_eq!(cfg.search.cascade.daily_total_cap, 20);
	assert_eq!(cfg.search.ranking.rrf_k, 60.0);
	assert_eq!(cfg.search.enhancement.hyde_weight, 0.7);
	assert_eq!(cfg.validation.fallback_score, 0.7);
	assert_eq!(cfg.chunking.substantial_session_minutes, 25);
}

#[test]
fn partial_policy_section_keeps_other_defaults() {
	let mut value = sample_value();

	set_path(&mut value, &["search", "cascade", "max_daily"], Value::Integer(9));

	let cfg = load_value(value).expect("Config must load.");

	assert_eq!(cfg.search.cascade.max_daily, 9);
	assert_eq!(cfg.search.cascade.max_weekly, 4);
}

#[test]
fn empty_log_level_falls_back_to_info() {
	let mut value = sample_value();

	set_path(&mut value, &["service", "log_level"], Value::String("  ".to_string()));

	let cfg = load_value(value).expect("Config must load.");

	assert_eq!(cfg.service.log_level, "info");
}

#[test]
fn embedding_dimensions_must_be_positive() {
	let mut value = sample_value();

	set_path(&mut value, &["providers", "embedding", "dimensions"], Value::Integer(0));

	expect_validation_error(value, "providers.embedding.dimensions must be greater than zero.");
}

#[test]
fn provider_api_keys_must_be_non_empty() {
	let mut value = sample_value();

	set_path(&mut value, &["providers", "completion", "api_key"], Value::String(" ".to_string()));

	expect_validation_error(value, "Provider completion api_key must be non-empty.");
}

#[test]
fn provider_timeouts_must_be_positive() {
	let mut value = sample_value();

	set_path(&mut value, &["providers", "embedding", "timeout_ms"], Value::Integer(0));

	expect_validation_error(value, "Provider embedding timeout_ms must be greater than zero.");
}

#[test]
fn min_similarity_must_be_in_unit_range() {
	let mut value = sample_value();

	set_path(&mut value, &["search", "ranking", "min_similarity"], Value::Float(1.5));

	expect_validation_error(value, "search.ranking.min_similarity must be in the range 0.0-1.0.");
}

#[test]
fn rrf_k_must_be_positive() {
	let mut value = sample_value();

	set_path(&mut value, &["search", "ranking", "rrf_k"], Value::Float(0.0));

	expect_validation_error(value, "search.ranking.rrf_k must be greater than zero.");
}

#[test]
fn sub_query_bounds_must_be_ordered() {
	let mut value = sample_value();

	set_path(&mut value, &["search", "enhancement", "min_sub_queries"], Value::Integer(3));
	set_path(&mut value, &["search", "enhancement", "max_sub_queries"], Value::Integer(2));

	expect_validation_error(
		value,
		"search.enhancement.max_sub_queries must be at least search.enhancement.min_sub_queries.",
	);
}

#[test]
fn enhancement_weights_must_be_non_negative() {
	let mut value = sample_value();

	set_path(&mut value, &["search", "enhancement", "hyde_weight"], Value::Float(-0.1));

	expect_validation_error(
		value,
		"search.enhancement.hyde_weight must be a finite number zero or greater.",
	);
}

#[test]
fn correction_threshold_must_be_in_unit_range() {
	let mut value = sample_value();

	set_path(&mut value, &["validation", "correction_threshold"], Value::Float(1.2));

	expect_validation_error(value, "validation.correction_threshold must be in the range 0.0-1.0.");
}

#[test]
fn utc_offset_must_be_bounded() {
	let mut value = sample_value();

	set_path(&mut value, &["chunking", "utc_offset_minutes"], Value::Integer(2_000));

	expect_validation_error(value, "chunking.utc_offset_minutes must be within +/-1080.");
}

#[test]
fn missing_file_reports_read_error() {
	let path = env::temp_dir().join("tempo_config_test_missing_file.toml");
	let err = tempo_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }));
}

#[test]
fn malformed_file_reports_parse_error() {
	let path = write_temp_config("[service\nhttp_bind = ".to_string());
	let result = tempo_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	assert!(matches!(result, Err(Error::ParseConfig { .. })));
}
