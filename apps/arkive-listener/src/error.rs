pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure categories of the listener process.
///
/// Only [`Error::Archival`] and [`Error::AlertTransport`] are recovered inside a single job;
/// every other kind ends the process and relies on the supervisor to restart it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid startup configuration: {message}")]
	Config { message: String },
	#[error("Failed to install the notify trigger.")]
	SchemaInstall(#[source] arkive_storage::Error),
	#[error("Notification channel failed.")]
	ListenerTransport(#[source] arkive_storage::Error),
	#[error("Archiving {url} failed.")]
	Archival {
		url: String,
		#[source]
		source: Box<dyn std::error::Error + Send + Sync>,
	},
	#[error("Alert for {url} was not delivered.")]
	AlertTransport {
		url: String,
		#[source]
		source: arkive_alerts::Error,
	},
}
impl Error {
	pub fn is_fatal(&self) -> bool {
		!matches!(self, Self::Archival { .. } | Self::AlertTransport { .. })
	}

	pub(crate) fn config(err: impl std::fmt::Display) -> Self {
		Self::Config { message: err.to_string() }
	}
}
