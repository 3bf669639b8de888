#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Queue log I/O failed at {path:?}.")]
	QueueLog { path: std::path::PathBuf, source: std::io::Error },
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Notification connection closed on channel {channel:?}.")]
	ConnectionClosed { channel: String },
}
