use std::collections::BTreeMap;

use arkive_config::Identity;

use crate::{Completion, Error, ExecRequest, ExecRuntime, Result};

const ARCHIVE_COMMAND: [&str; 2] = ["archivebox", "add"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOptions {
	pub container: String,
	/// Flags placed between `archivebox add` and the URL, already split with shell quoting rules.
	pub command_args: Vec<String>,
	pub identity: Option<Identity>,
	pub environment: BTreeMap<String, String>,
}
impl DispatchOptions {
	pub fn from_config(cfg: &arkive_config::Worker) -> Result<Self> {
		let command_args = cfg
			.command_args()
			.ok_or_else(|| Error::InvalidOptions(cfg.command_options.clone()))?;

		Ok(Self {
			container: cfg.container.clone(),
			command_args,
			identity: cfg.identity(),
			environment: cfg.environment.clone(),
		})
	}
}

/// Hands one URL at a time to `archivebox add` and waits for it to finish.
pub struct WorkerDispatcher<R> {
	runtime: R,
	options: DispatchOptions,
}
impl<R> WorkerDispatcher<R>
where
	R: ExecRuntime,
{
	pub fn new(runtime: R, options: DispatchOptions) -> Self {
		Self { runtime, options }
	}

	/// Human-readable form of the archive command, as logged.
	pub fn command_line(&self, url: &str) -> String {
		self.argv(url).join(" ")
	}

	pub fn request(&self, url: &str) -> ExecRequest {
		ExecRequest {
			target: self.options.container.clone(),
			argv: self.argv(url),
			identity: self.options.identity,
			environment: self.options.environment.clone(),
		}
	}

	/// Archives `url` exactly as given, logging the worker's output line by line as it is
	/// produced.
	///
	/// A non-zero exit is reported as [`Error::NonZeroExit`]: ArchiveBox signals a failed add
	/// through its exit status, so it counts as a failed dispatch.
	pub async fn dispatch(&self, url: &str) -> Result<Completion> {
		// A leading dash would be parsed as a flag by `archivebox add`.
		if url.trim().is_empty() || url.starts_with('-') {
			return Err(Error::InvalidUrl(url.to_string()));
		}

		let request = self.request(url);

		tracing::info!(
			url,
			container = %request.target,
			command = %self.command_line(url),
			"Dispatching archive job."
		);

		let mut on_line = |line: &str| {
			tracing::info!(target: "archivebox", url, "{line}");
		};
		let completion = self.runtime.exec(&request, &mut on_line).await?;

		if !completion.success() {
			return Err(Error::NonZeroExit { code: completion.exit_code });
		}

		Ok(completion)
	}

	fn argv(&self, url: &str) -> Vec<String> {
		ARCHIVE_COMMAND
			.iter()
			.copied()
			.map(str::to_string)
			.chain(self.options.command_args.iter().cloned())
			.chain(std::iter::once(url.to_string()))
			.collect()
	}
}
