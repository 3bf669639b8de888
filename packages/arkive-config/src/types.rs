use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use serde::Deserialize;

/// Table whose inserts are archived. Fixed by the bookmark manager's schema.
pub const WATCHED_TABLE: &str = "bookmark";
/// Channel the insert trigger publishes on.
pub const NOTIFY_CHANNEL: &str = "new_bookmark";
/// URI schemes an alert transport exists for.
pub const ALERT_SCHEMES: [&str; 4] = ["ntfy", "ntfys", "json", "jsons"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub listener: Listener,
	pub worker: Worker,
	pub alerts: Alerts,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Service {
	pub log_level: String,
	pub logs_dir: PathBuf,
	pub log_file: String,
}
impl Service {
	pub fn log_path(&self) -> PathBuf {
		self.logs_dir.join(&self.log_file)
	}
}
impl Default for Service {
	fn default() -> Self {
		Self {
			log_level: "info".to_string(),
			logs_dir: PathBuf::from("/logs"),
			log_file: "run.log".to_string(),
		}
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Storage {
	pub postgres: Postgres,
	pub queue_log: QueueLog,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Postgres {
	/// Optional. When set, takes precedence over the individual connection fields.
	pub dsn: Option<String>,
	pub name: String,
	pub user: String,
	pub password: String,
	pub host: String,
	pub port: u16,
}
impl Default for Postgres {
	fn default() -> Self {
		Self {
			dsn: None,
			name: "mydb".to_string(),
			user: "myuser".to_string(),
			password: "mypassword".to_string(),
			host: "postgres".to_string(),
			port: 5_432,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct QueueLog {
	pub data_dir: PathBuf,
	pub file: String,
}
impl QueueLog {
	pub fn path(&self) -> PathBuf {
		self.data_dir.join(&self.file)
	}
}
impl Default for QueueLog {
	fn default() -> Self {
		Self { data_dir: PathBuf::from("/data"), file: "new_urls.txt".to_string() }
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Listener {
	/// Optional. Idle wait before a timeout notice is logged; unset waits indefinitely.
	pub wait_timeout_secs: Option<u64>,
}
impl Listener {
	pub fn wait_timeout(&self) -> Option<Duration> {
		self.wait_timeout_secs.map(Duration::from_secs)
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Worker {
	/// Container the `archivebox` command is executed in.
	pub container: String,
	/// Container CLI used to reach the container, e.g. `docker` or `podman`.
	pub runtime_bin: String,
	pub uid: Option<u32>,
	pub gid: Option<u32>,
	/// Extra flags placed between `archivebox add` and the URL. Split with POSIX shell quoting.
	pub command_options: String,
	/// Environment applied to the worker process. An empty value clears the variable.
	pub environment: BTreeMap<String, String>,
}
impl Worker {
	pub fn identity(&self) -> Option<Identity> {
		match (self.uid, self.gid) {
			(Some(uid), Some(gid)) => Some(Identity { uid, gid }),
			_ => None,
		}
	}

	/// `command_options` split into arguments. `None` when the quoting is unbalanced.
	pub fn command_args(&self) -> Option<Vec<String>> {
		shlex::split(&self.command_options)
	}
}
impl Default for Worker {
	fn default() -> Self {
		Self {
			container: "compose_archivebox_1".to_string(),
			runtime_bin: "docker".to_string(),
			uid: None,
			gid: None,
			command_options: String::new(),
			environment: BTreeMap::from([("CHROME_USER_DATA_DIR".to_string(), String::new())]),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
	pub uid: u32,
	pub gid: u32,
}
impl std::fmt::Display for Identity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}", self.uid, self.gid)
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Alerts {
	/// Transport URIs. Empty disables alerting.
	pub urls: Vec<String>,
}
