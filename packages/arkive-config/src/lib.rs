mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	ALERT_SCHEMES, Alerts, Config, Identity, Listener, NOTIFY_CHANNEL, Postgres, QueueLog, Service, Storage,
	WATCHED_TABLE, Worker,
};

use std::{env, fs, path::Path, str::FromStr};

/// Loads the configuration from an optional TOML file, then overlays process environment
/// variables on top.
pub fn load(path: Option<&Path>) -> Result<Config> {
	load_with(path, |key| env::var(key).ok())
}

/// Same as [`load`], reading environment values through `lookup`.
pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Config>
where
	F: Fn(&str) -> Option<String>,
{
	let mut cfg = match path {
		Some(path) => {
			let raw = fs::read_to_string(path)
				.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

			toml::from_str(&raw)
				.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?
		},
		None => Config::default(),
	};

	apply_env(&mut cfg, lookup)?;
	normalize(&mut cfg);
	validate(&cfg)?;

	Ok(cfg)
}

/// Overlays the deployment's environment variables. Unset variables leave the value untouched.
pub fn apply_env<F>(cfg: &mut Config, lookup: F) -> Result<()>
where
	F: Fn(&str) -> Option<String>,
{
	let pg = &mut cfg.storage.postgres;

	if let Some(value) = lookup("DB_NAME") {
		pg.name = value;
	}
	if let Some(value) = lookup("DB_USER") {
		pg.user = value;
	}
	if let Some(value) = lookup("DB_PASSWORD") {
		pg.password = value;
	}
	if let Some(value) = lookup("DB_HOST") {
		pg.host = value;
	}
	if let Some(value) = lookup("DB_PORT") {
		pg.port = parse_env("DB_PORT", &value)?;
	}
	if let Some(value) = lookup("ARCHIVEBOX_CONTAINER_NAME") {
		cfg.worker.container = value;
	}
	if let Some(value) = lookup("ARCHIVEBOX_PUID") {
		cfg.worker.uid = Some(parse_env("ARCHIVEBOX_PUID", &value)?);
	}
	if let Some(value) = lookup("ARCHIVEBOX_PGID") {
		cfg.worker.gid = Some(parse_env("ARCHIVEBOX_PGID", &value)?);
	}
	if let Some(value) = lookup("ARCHIVEBOX_CMD_OPTIONS") {
		cfg.worker.command_options = value;
	}
	if let Some(value) = lookup("DATA_DIR") {
		cfg.storage.queue_log.data_dir = value.into();
	}
	if let Some(value) = lookup("LOGS_DIR") {
		cfg.service.logs_dir = value.into();
	}
	if let Some(value) = lookup("ALERT_URLS") {
		cfg.alerts.urls = value.split_whitespace().map(str::to_string).collect();
	}
	if let Some(value) = lookup("ARKIVE_LOG_LEVEL") {
		cfg.service.log_level = value;
	}
	if let Some(value) = lookup("ARKIVE_WAIT_TIMEOUT_SECS") {
		cfg.listener.wait_timeout_secs = Some(parse_env("ARKIVE_WAIT_TIMEOUT_SECS", &value)?);
	}

	Ok(())
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.is_none() {
		let pg = &cfg.storage.postgres;

		for (label, value) in [
			("storage.postgres.name", &pg.name),
			("storage.postgres.user", &pg.user),
			("storage.postgres.host", &pg.host),
		] {
			if value.trim().is_empty() {
				return Err(Error::Validation { message: format!("{label} must be non-empty.") });
			}
		}

		if pg.port == 0 {
			return Err(Error::Validation {
				message: "storage.postgres.port must be greater than zero.".to_string(),
			});
		}
	}
	if cfg.storage.queue_log.file.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.queue_log.file must be non-empty.".to_string(),
		});
	}
	if cfg.service.log_file.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_file must be non-empty.".to_string(),
		});
	}
	if cfg.worker.container.trim().is_empty() {
		return Err(Error::Validation {
			message: "worker.container must be non-empty.".to_string(),
		});
	}
	if cfg.worker.runtime_bin.trim().is_empty() {
		return Err(Error::Validation {
			message: "worker.runtime_bin must be non-empty.".to_string(),
		});
	}
	if cfg.worker.uid.is_some() != cfg.worker.gid.is_some() {
		return Err(Error::Validation {
			message: "worker.uid and worker.gid must be set together.".to_string(),
		});
	}
	if cfg.worker.environment.keys().any(|key| key.is_empty() || key.contains('=')) {
		return Err(Error::Validation {
			message: "worker.environment keys must be non-empty and must not contain '='."
				.to_string(),
		});
	}
	if cfg.worker.command_args().is_none() {
		return Err(Error::Validation {
			message: format!(
				"worker.command_options has unbalanced quoting: {:?}.",
				cfg.worker.command_options
			),
		});
	}
	if cfg.listener.wait_timeout_secs == Some(0) {
		return Err(Error::Validation {
			message: "listener.wait_timeout_secs must be greater than zero.".to_string(),
		});
	}

	for url in &cfg.alerts.urls {
		let Some((scheme, target)) = url.split_once("://").filter(|(_, target)| !target.is_empty())
		else {
			return Err(Error::Validation {
				message: format!("alerts.urls entry {url:?} must look like scheme://target."),
			});
		};

		if !ALERT_SCHEMES.contains(&scheme) {
			return Err(Error::Validation {
				message: format!(
					"alerts.urls entry for {target:?} uses unsupported scheme {scheme:?}; \
					 expected one of {}.",
					ALERT_SCHEMES.join(", ")
				),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.storage.postgres.dsn.as_deref().map(|dsn| dsn.trim().is_empty()).unwrap_or(false) {
		cfg.storage.postgres.dsn = None;
	}

	cfg.worker.command_options = cfg.worker.command_options.trim().to_string();
	cfg.alerts.urls.retain(|url| !url.trim().is_empty());
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
	T: FromStr,
{
	value.trim().parse().map_err(|_| Error::Validation {
		message: format!("{key} must be a valid number, got {value:?}."),
	})
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> =
			pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();

		move |key| map.get(key).cloned()
	}

	#[test]
	fn defaults_match_legacy_deployment() {
		let cfg = load_with(None, |_| None).expect("Defaults must validate.");

		assert_eq!(cfg.storage.postgres.host, "postgres");
		assert_eq!(cfg.storage.postgres.port, 5_432);
		assert_eq!(cfg.worker.container, "compose_archivebox_1");
		assert_eq!(cfg.storage.queue_log.path(), Path::new("/data/new_urls.txt"));
		assert_eq!(cfg.service.log_path(), Path::new("/logs/run.log"));
		assert_eq!(cfg.worker.environment.get("CHROME_USER_DATA_DIR"), Some(&String::new()));
		assert!(cfg.alerts.urls.is_empty());
		assert!(cfg.worker.identity().is_none());
		assert!(cfg.listener.wait_timeout().is_none());
	}

	#[test]
	fn alert_urls_split_on_whitespace() {
		let cfg = load_with(
			None,
			lookup(&[("ALERT_URLS", "  ntfy://ntfy.sh/a   jsons://hooks.example.com/b ")]),
		)
		.expect("Config must validate.");

		assert_eq!(cfg.alerts.urls, vec!["ntfy://ntfy.sh/a", "jsons://hooks.example.com/b"]);
	}

	#[test]
	fn empty_alert_urls_disable_alerting() {
		let cfg = load_with(None, lookup(&[("ALERT_URLS", "")])).expect("Config must validate.");

		assert!(cfg.alerts.urls.is_empty());
	}

	#[test]
	fn non_numeric_port_is_rejected() {
		let err = load_with(None, lookup(&[("DB_PORT", "fivefour")]))
			.expect_err("Expected DB_PORT validation error.");

		assert!(err.to_string().contains("DB_PORT"), "Unexpected error: {err}");
	}

	#[test]
	fn identity_requires_both_ids() {
		let err = load_with(None, lookup(&[("ARCHIVEBOX_PUID", "911")]))
			.expect_err("Expected identity validation error.");

		assert!(
			err.to_string().contains("worker.uid and worker.gid must be set together."),
			"Unexpected error: {err}"
		);

		let cfg =
			load_with(None, lookup(&[("ARCHIVEBOX_PUID", "911"), ("ARCHIVEBOX_PGID", "1000")]))
				.expect("Config must validate.");

		assert_eq!(cfg.worker.identity(), Some(Identity { uid: 911, gid: 1_000 }));
		assert_eq!(cfg.worker.identity().map(|id| id.to_string()).as_deref(), Some("911:1000"));
	}

	#[test]
	fn command_options_follow_shell_quoting() {
		let cfg = load_with(
			None,
			lookup(&[("ARCHIVEBOX_CMD_OPTIONS", r#" --tag="reading list" --depth=0 "#)]),
		)
		.expect("Config must validate.");

		assert_eq!(
			cfg.worker.command_args(),
			Some(vec!["--tag=reading list".to_string(), "--depth=0".to_string()])
		);

		let err = load_with(None, lookup(&[("ARCHIVEBOX_CMD_OPTIONS", r#"--tag="reading list"#)]))
			.expect_err("Expected quoting validation error.");

		assert!(err.to_string().contains("unbalanced quoting"), "Unexpected error: {err}");
	}

	#[test]
	fn unsupported_alert_scheme_is_rejected() {
		let err = load_with(None, lookup(&[("ALERT_URLS", "mailto://ops@example.com")]))
			.expect_err("Expected alert scheme validation error.");

		assert!(
			err.to_string().contains("unsupported scheme \"mailto\""),
			"Unexpected error: {err}"
		);
	}

	#[test]
	fn zero_wait_timeout_is_rejected() {
		let err = load_with(None, lookup(&[("ARKIVE_WAIT_TIMEOUT_SECS", "0")]))
			.expect_err("Expected wait timeout validation error.");

		assert!(err.to_string().contains("listener.wait_timeout_secs"), "Unexpected error: {err}");
	}
}
