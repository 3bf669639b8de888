use std::{collections::BTreeMap, process::Stdio};

use tokio::{
	io::{AsyncBufReadExt, AsyncRead, BufReader},
	process::{Child, Command},
};

use arkive_config::Identity;

use crate::{BoxFuture, Error, Result};

/// A command to run inside a named execution target (a container).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
	pub target: String,
	pub argv: Vec<String>,
	pub identity: Option<Identity>,
	/// Applied on top of the target's environment. Empty values are passed as `KEY=`.
	pub environment: BTreeMap<String, String>,
}

/// End-of-stream signal of a finished execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
	/// `None` when the process was terminated by a signal.
	pub exit_code: Option<i32>,
}
impl Completion {
	pub fn success(&self) -> bool {
		self.exit_code == Some(0)
	}
}

/// The external execution environment the archiver runs in.
///
/// Implementations call `on_line` for every line of combined output as it arrives and resolve
/// with [`Completion`] once the output has ended and the process has exited. An `Err` means the
/// execution itself broke (spawn, stream, transport), never a non-zero exit.
pub trait ExecRuntime
where
	Self: Send + Sync,
{
	fn exec<'a>(
		&'a self,
		request: &'a ExecRequest,
		on_line: &'a mut (dyn FnMut(&str) + Send),
	) -> BoxFuture<'a, Result<Completion>>;
}

/// Runs requests through a container CLI (`docker exec`, `podman exec`).
///
/// A fresh process per request, so a failed dispatch never poisons later ones.
#[derive(Debug, Clone)]
pub struct DockerCli {
	bin: String,
}
impl DockerCli {
	pub fn new(bin: impl Into<String>) -> Self {
		Self { bin: bin.into() }
	}

	/// Arguments passed to the CLI binary for `request`.
	pub fn args(request: &ExecRequest) -> Vec<String> {
		let mut args = vec!["exec".to_string()];

		if let Some(identity) = request.identity {
			args.push("--user".to_string());
			args.push(identity.to_string());
		}

		for (key, value) in &request.environment {
			args.push("--env".to_string());
			args.push(format!("{key}={value}"));
		}

		args.push(request.target.clone());
		args.extend(request.argv.iter().cloned());

		args
	}

	async fn run(
		&self,
		request: &ExecRequest,
		on_line: &mut (dyn FnMut(&str) + Send),
	) -> Result<Completion> {
		let mut command = Command::new(&self.bin);

		command
			.args(Self::args(request))
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);

		let child = command
			.spawn()
			.map_err(|err| Error::Spawn { bin: self.bin.clone(), source: err })?;

		stream_child(child, on_line).await
	}
}
impl ExecRuntime for DockerCli {
	fn exec<'a>(
		&'a self,
		request: &'a ExecRequest,
		on_line: &'a mut (dyn FnMut(&str) + Send),
	) -> BoxFuture<'a, Result<Completion>> {
		Box::pin(self.run(request, on_line))
	}
}

/// Forwards stdout and stderr lines of `child` as they arrive, then waits for it to exit.
pub(crate) async fn stream_child(
	mut child: Child,
	on_line: &mut (dyn FnMut(&str) + Send),
) -> Result<Completion> {
	let stdout = child.stdout.take().ok_or_else(|| Error::Runtime("stdout not piped".into()))?;
	let stderr = child.stderr.take().ok_or_else(|| Error::Runtime("stderr not piped".into()))?;
	let mut stdout = lines(stdout);
	let mut stderr = lines(stderr);
	let mut stdout_open = true;
	let mut stderr_open = true;

	while stdout_open || stderr_open {
		tokio::select! {
			segment = stdout.next_segment(), if stdout_open => match segment.map_err(Error::Stream)? {
				Some(raw) => emit(&raw, on_line),
				None => stdout_open = false,
			},
			segment = stderr.next_segment(), if stderr_open => match segment.map_err(Error::Stream)? {
				Some(raw) => emit(&raw, on_line),
				None => stderr_open = false,
			},
		}
	}

	let status = child.wait().await.map_err(Error::Wait)?;

	Ok(Completion { exit_code: status.code() })
}

fn lines<R>(reader: R) -> tokio::io::Split<BufReader<R>>
where
	R: AsyncRead + Unpin,
{
	BufReader::new(reader).split(b'\n')
}

fn emit(raw: &[u8], on_line: &mut (dyn FnMut(&str) + Send)) {
	let line = String::from_utf8_lossy(raw);

	on_line(line.trim_end_matches('\r'));
}

#[cfg(test)]
mod tests {
	use super::*;

	fn request() -> ExecRequest {
		ExecRequest {
			target: "archivebox".to_string(),
			argv: vec!["archivebox".into(), "add".into(), "https://example.com/a".into()],
			identity: Some(Identity { uid: 911, gid: 1_000 }),
			environment: BTreeMap::from([("CHROME_USER_DATA_DIR".to_string(), String::new())]),
		}
	}

	#[test]
	fn docker_args_carry_identity_and_environment() {
		assert_eq!(
			DockerCli::args(&request()),
			vec![
				"exec",
				"--user",
				"911:1000",
				"--env",
				"CHROME_USER_DATA_DIR=",
				"archivebox",
				"archivebox",
				"add",
				"https://example.com/a",
			]
		);
	}

	#[test]
	fn docker_args_omit_user_without_identity() {
		let mut request = request();

		request.identity = None;
		request.environment.clear();

		assert_eq!(
			DockerCli::args(&request),
			vec!["exec", "archivebox", "archivebox", "add", "https://example.com/a"]
		);
	}

	#[tokio::test]
	async fn streams_both_pipes_and_reports_exit_code() {
		let child = Command::new("sh")
			.args(["-c", "echo one; echo two >&2; printf 'three\\r\\n'; exit 3"])
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.spawn()
			.expect("Failed to spawn sh.");
		let mut seen = Vec::new();
		let mut on_line = |line: &str| seen.push(line.to_string());
		let completion = stream_child(child, &mut on_line).await.expect("Stream failed.");

		assert_eq!(completion, Completion { exit_code: Some(3) });
		assert!(!completion.success());

		seen.sort();

		assert_eq!(seen, vec!["one", "three", "two"]);
	}

	#[tokio::test]
	async fn missing_binary_is_a_spawn_error() {
		let runtime = DockerCli::new("/nonexistent/arkive-container-cli");
		let mut on_line = |_: &str| {};
		let err = runtime.exec(&request(), &mut on_line).await.expect_err("Expected spawn error.");

		assert!(matches!(err, Error::Spawn { .. }), "Unexpected error: {err}");
	}
}
