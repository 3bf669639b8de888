pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid URL for dispatch: {0:?}.")]
	InvalidUrl(String),
	#[error("Unbalanced quoting in worker command options: {0:?}.")]
	InvalidOptions(String),
	#[error("Failed to start {bin:?}.")]
	Spawn { bin: String, source: std::io::Error },
	#[error("Worker output stream failed.")]
	Stream(#[source] std::io::Error),
	#[error("Failed to wait for the worker process.")]
	Wait(#[source] std::io::Error),
	#[error("Worker exited with status {}.", exit_label(.code))]
	NonZeroExit { code: Option<i32> },
	#[error("{0}")]
	Runtime(String),
}

fn exit_label(code: &Option<i32>) -> String {
	match code {
		Some(code) => code.to_string(),
		None => "unknown (terminated by signal)".to_string(),
	}
}
