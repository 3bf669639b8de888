use std::path::{Path, PathBuf};

use tokio::{
	fs::{self, File, OpenOptions},
	io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
};

use crate::{Error, Result, models::QueueLogEntry};

/// Append-only ledger of URLs handed to the dispatcher, one URL per line.
///
/// The file is reopened in append mode for every entry and never truncated, so operators can
/// tail it while the listener runs. Compaction is out of scope here.
pub struct DurableQueueLog {
	path: PathBuf,
	next_sequence: u64,
	/// The last line has no terminating newline, e.g. after a crash mid-write.
	torn_tail: bool,
}
impl DurableQueueLog {
	/// Opens the ledger at `path`, continuing the sequence after any existing lines.
	///
	/// A torn last line keeps its position; the next entry starts on a fresh line.
	pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
		let path = path.into();
		let (lines, torn_tail) = match scan(&path).await {
			Ok(scanned) => scanned,
			Err(err) => return Err(Error::QueueLog { path, source: err }),
		};

		if torn_tail {
			tracing::warn!(
				path = %path.display(),
				line = lines,
				"Queue log ends with a partial line."
			);
		}

		Ok(Self { path, next_sequence: lines + 1, torn_tail })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Writes `url` followed by a newline and syncs it to disk before returning.
	pub async fn append(&mut self, url: &str) -> Result<QueueLogEntry> {
		if url.contains(['\n', '\r']) {
			return Err(Error::InvalidArgument(format!(
				"Queue log entries must be a single line, got {url:?}."
			)));
		}

		let mut line = String::with_capacity(url.len() + 2);

		if self.torn_tail {
			line.push('\n');
		}

		line.push_str(url);
		line.push('\n');

		self.write_line(line.as_bytes()).await.map_err(|err| Error::QueueLog {
			path: self.path.clone(),
			source: err,
		})?;

		let entry = QueueLogEntry { url: url.to_string(), sequence: self.next_sequence };

		self.next_sequence += 1;
		self.torn_tail = false;

		Ok(entry)
	}

	/// Reads every entry back in append order.
	pub async fn read_entries(&self) -> Result<Vec<QueueLogEntry>> {
		let raw = match fs::read_to_string(&self.path).await {
			Ok(raw) => raw,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(err) => return Err(Error::QueueLog { path: self.path.clone(), source: err }),
		};

		Ok(raw
			.lines()
			.zip(1..)
			.map(|(url, sequence)| QueueLogEntry { url: url.to_string(), sequence })
			.collect())
	}

	async fn write_line(&self, line: &[u8]) -> std::io::Result<()> {
		let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;

		file.write_all(line).await?;
		// tokio buffers file writes on a blocking thread; flush hands them to the OS.
		file.flush().await?;
		file.sync_data().await
	}
}

/// Counts lines without loading the file, and whether the last one lacks its newline.
async fn scan(path: &Path) -> std::io::Result<(u64, bool)> {
	let file = match File::open(path).await {
		Ok(file) => file,
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok((0, false)),
		Err(err) => return Err(err),
	};
	let mut reader = BufReader::new(file);
	let mut newlines = 0_u64;
	let mut last = None;

	loop {
		let chunk = reader.fill_buf().await?;

		if chunk.is_empty() {
			break;
		}

		newlines += chunk.iter().filter(|byte| **byte == b'\n').count() as u64;
		last = chunk.last().copied();

		let consumed = chunk.len();

		reader.consume(consumed);
	}

	let torn_tail = last.is_some_and(|byte| byte != b'\n');

	Ok((newlines + u64::from(torn_tail), torn_tail))
}
