use std::{fs, path::Path};

use arkive_config::{Config, Error};

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn write_temp_config(dir: &tempfile::TempDir, payload: &str) -> std::path::PathBuf {
	let path = dir.path().join("arkive.toml");

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse test config.")
}

#[test]
fn sample_config_loads() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let path = write_temp_config(&dir, SAMPLE_CONFIG_TOML);
	let cfg = arkive_config::load_with(Some(&path), |_| None).expect("Failed to load config.");

	assert_eq!(cfg.service.log_level, "debug");
	assert_eq!(cfg.storage.postgres.port, 5_433);
	assert_eq!(cfg.storage.queue_log.path(), Path::new("/srv/arkive/new_urls.txt"));
	assert_eq!(cfg.service.log_path(), Path::new("/var/log/arkive/run.log"));
	assert_eq!(cfg.worker.command_options, "--depth=0 --extract=wget,screenshot");
	assert_eq!(cfg.worker.environment.len(), 2);
	assert_eq!(cfg.listener.wait_timeout().map(|d| d.as_secs()), Some(30));
	assert_eq!(cfg.alerts.urls, vec!["ntfy://ntfy.sh/bookmarks"]);
}

#[test]
fn environment_overrides_file_values() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let path = write_temp_config(&dir, SAMPLE_CONFIG_TOML);
	let cfg = arkive_config::load_with(Some(&path), |key| match key {
		"DB_HOST" => Some("127.0.0.1".to_string()),
		"ARCHIVEBOX_CONTAINER_NAME" => Some("archivebox-2".to_string()),
		"DATA_DIR" => Some("/tmp/arkive".to_string()),
		"ALERT_URLS" => Some(String::new()),
		_ => None,
	})
	.expect("Failed to load config.");

	assert_eq!(cfg.storage.postgres.host, "127.0.0.1");
	assert_eq!(cfg.storage.postgres.name, "linkding");
	assert_eq!(cfg.worker.container, "archivebox-2");
	assert_eq!(cfg.storage.queue_log.path(), Path::new("/tmp/arkive/new_urls.txt"));
	assert!(cfg.alerts.urls.is_empty());
}

#[test]
fn missing_file_is_a_read_error() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let path = dir.path().join("absent.toml");
	let err = arkive_config::load_with(Some(&path), |_| None)
		.expect_err("Expected missing file to fail.");

	assert!(matches!(err, Error::ReadConfig { .. }), "Unexpected error: {err}");
}

#[test]
fn malformed_file_is_a_parse_error() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let path = write_temp_config(&dir, "[storage.postgres]\nport = \"not a port\"\n");
	let err = arkive_config::load_with(Some(&path), |_| None)
		.expect_err("Expected malformed file to fail.");

	assert!(matches!(err, Error::ParseConfig { .. }), "Unexpected error: {err}");
}

#[test]
fn alert_urls_need_a_scheme() {
	let mut cfg = base_config();

	cfg.alerts.urls = vec!["ntfy.sh/bookmarks".to_string()];

	let err = arkive_config::validate(&cfg).expect_err("Expected alert URL validation error.");

	assert!(
		err.to_string().contains("must look like scheme://target."),
		"Unexpected error: {err}"
	);
}

#[test]
fn dsn_skips_connection_field_checks() {
	let mut cfg = base_config();

	cfg.storage.postgres.host = String::new();

	assert!(arkive_config::validate(&cfg).is_err());

	cfg.storage.postgres.dsn = Some("postgres://u:p@localhost/db".to_string());

	assert!(arkive_config::validate(&cfg).is_ok());
}

#[test]
fn environment_keys_cannot_contain_equals() {
	let mut cfg = base_config();

	cfg.worker.environment.insert("A=B".to_string(), String::new());

	let err = arkive_config::validate(&cfg).expect_err("Expected environment key error.");

	assert!(err.to_string().contains("worker.environment keys"), "Unexpected error: {err}");
}
