pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid alert URL {url:?}: {message}")]
	InvalidUrl { url: String, message: String },
	#[error("Unsupported alert scheme {scheme:?}. Supported: ntfy, ntfys, json, jsons.")]
	UnsupportedScheme { scheme: String },
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error("Alert delivery failed for {} transport(s): {}", .failures.len(), .failures.join("; "))]
	Delivery { failures: Vec<String> },
}
