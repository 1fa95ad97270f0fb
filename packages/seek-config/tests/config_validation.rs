use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use seek_config::Config;

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml<F>(mutate: F) -> String
where
	F: FnOnce(&mut toml::map::Map<String, Value>),
{
	let mut value: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let root = value.as_table_mut().expect("Template config must be a table.");

	mutate(root);

	toml::to_string(&value).expect("Failed to render template config.")
}

fn section<'a>(
	root: &'a mut toml::map::Map<String, Value>,
	name: &str,
) -> &'a mut toml::map::Map<String, Value> {
	root.get_mut(name)
		.and_then(Value::as_table_mut)
		.unwrap_or_else(|| panic!("Template config must include [{name}]."))
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

	path.push(format!("seek_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_error_message(payload: String) -> String {
	let path = write_temp_config(payload);
	let result = seek_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result.expect_err("Expected a validation error.").to_string()
}

#[test]
fn template_config_loads() {
	let path = write_temp_config(sample_toml(|_| {}));
	let result = seek_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Template config must load.");

	assert_eq!(cfg.store.index_prefix, "seek-index");
	assert!(cfg.hybrid_search_enabled());
}

#[test]
fn index_prefix_must_be_index_safe() {
	let message = sample_toml(|root| {
		section(root, "store")
			.insert("index_prefix".to_string(), Value::String("Seek Index".to_string()));
	});

	assert!(
		load_error_message(message).contains("store.index_prefix must contain only"),
		"Unexpected validation error."
	);
}

#[test]
fn chunk_overlap_must_be_less_than_chunk_size() {
	let message = sample_toml(|root| {
		let chunking = section(root, "chunking");

		chunking.insert("chunk_size".to_string(), Value::Integer(100));
		chunking.insert("chunk_overlap".to_string(), Value::Integer(100));
	});

	assert!(
		load_error_message(message)
			.contains("chunking.chunk_overlap must be less than chunking.chunk_size."),
		"Unexpected validation error."
	);
}

#[test]
fn hybrid_weights_must_hold_two_entries() {
	let message = sample_toml(|root| {
		section(root, "search").insert(
			"hybrid_weights".to_string(),
			Value::Array(vec![Value::Float(1.0)]),
		);
	});

	assert!(
		load_error_message(message)
			.contains("search.hybrid_weights must hold exactly two weights."),
		"Unexpected validation error."
	);
}

#[test]
fn hybrid_weights_must_stay_in_unit_range() {
	let message = sample_toml(|root| {
		section(root, "search").insert(
			"hybrid_weights".to_string(),
			Value::Array(vec![Value::Float(0.4), Value::Float(1.5)]),
		);
	});

	assert!(
		load_error_message(message)
			.contains("search.hybrid_weights entries must be in the range 0.0-1.0."),
		"Unexpected validation error."
	);
}

#[test]
fn embedding_dimensions_required_when_enabled() {
	let message = sample_toml(|root| {
		let providers = section(root, "providers");
		let embedding = providers
			.get_mut("embedding")
			.and_then(Value::as_table_mut)
			.expect("Template config must include [providers.embedding].");

		embedding.insert("dimensions".to_string(), Value::Integer(0));
	});

	assert!(
		load_error_message(message)
			.contains("providers.embedding.dimensions must be greater than zero."),
		"Unexpected validation error."
	);
}

#[test]
fn disabled_embedding_reports_missing_hybrid_settings() {
	let payload = sample_toml(|root| {
		let providers = section(root, "providers");
		let embedding = providers
			.get_mut("embedding")
			.and_then(Value::as_table_mut)
			.expect("Template config must include [providers.embedding].");

		embedding.insert("enabled".to_string(), Value::Boolean(false));
		embedding.insert("api_key".to_string(), Value::String(String::new()));
	});
	let cfg: Config = toml::from_str(&payload).expect("Failed to parse test config.");

	assert!(!cfg.hybrid_search_enabled());
	assert_eq!(
		cfg.missing_hybrid_settings(),
		vec!["providers.embedding.enabled", "providers.embedding.api_key"]
	);
}

#[test]
fn normalization_strips_trailing_slashes_and_blank_credentials() {
	let payload = sample_toml(|root| {
		let store = section(root, "store");

		store.insert("url".to_string(), Value::String("http://localhost:9200/".to_string()));
		store.insert("username".to_string(), Value::String("  ".to_string()));
		store.insert("password".to_string(), Value::String(String::new()));
	});
	let path = write_temp_config(payload);
	let result = seek_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Config must load.");

	assert_eq!(cfg.store.url, "http://localhost:9200");
	assert_eq!(cfg.store.username, None);
	assert_eq!(cfg.store.password, None);
}
