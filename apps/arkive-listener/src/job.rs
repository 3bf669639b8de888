use arkive_alerts::{AlertSink, Outcome};
use arkive_dispatch::{ExecRuntime, WorkerDispatcher};
use arkive_storage::queue_log::DurableQueueLog;

use crate::{BoxFuture, Error, Result, listener::JobHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
	Pending,
	Dispatched,
	Succeeded,
	Failed,
}
impl JobStatus {
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Succeeded | Self::Failed)
	}

	fn can_become(self, next: Self) -> bool {
		matches!(
			(self, next),
			(Self::Pending, Self::Dispatched)
				| (Self::Dispatched, Self::Succeeded | Self::Failed)
				// The ledger write failed, so the worker was never invoked.
				| (Self::Pending, Self::Failed)
		)
	}
}

/// Per-notification state. Reaches exactly one terminal status, then is alerted once.
#[derive(Debug)]
pub struct ArchiveJob {
	url: String,
	status: JobStatus,
	alerted: bool,
}
impl ArchiveJob {
	pub fn new(url: String) -> Self {
		Self { url, status: JobStatus::Pending, alerted: false }
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	pub fn status(&self) -> JobStatus {
		self.status
	}

	pub fn is_alerted(&self) -> bool {
		self.alerted
	}

	fn advance(&mut self, next: JobStatus) {
		debug_assert!(
			self.status.can_become(next),
			"Invalid job transition {:?} -> {next:?}.",
			self.status
		);

		self.status = next;
	}

	fn mark_alerted(&mut self) {
		debug_assert!(self.status.is_terminal() && !self.alerted);

		self.alerted = true;
	}

	fn outcome(&self) -> Outcome {
		match self.status {
			JobStatus::Succeeded => Outcome::Archived,
			_ => Outcome::Failed,
		}
	}
}

/// Sequences ledger append, dispatch and alert for each received URL.
pub struct JobRunner<R> {
	queue_log: DurableQueueLog,
	dispatcher: WorkerDispatcher<R>,
	alerts: AlertSink,
}
impl<R> JobRunner<R>
where
	R: ExecRuntime,
{
	pub fn new(queue_log: DurableQueueLog, dispatcher: WorkerDispatcher<R>, alerts: AlertSink) -> Self {
		Self { queue_log, dispatcher, alerts }
	}

	pub fn queue_log(&self) -> &DurableQueueLog {
		&self.queue_log
	}

	/// Runs one job to a terminal, alerted state. Archival and alert failures are logged here
	/// and never returned.
	///
	/// Surrounding whitespace is stripped once, so the ledger, the worker and the alert all see
	/// the same URL.
	pub async fn process(&mut self, url: String) -> ArchiveJob {
		let mut job = ArchiveJob::new(url.trim().to_string());

		match self.archive(&mut job).await {
			Ok(()) => tracing::info!(url = job.url(), "Added {}", job.url()),
			Err(err) => tracing::error!(
				url = job.url(),
				error = %err,
				cause = %source_of(&err),
				"Archive job failed."
			),
		}

		if let Err(source) = self.alerts.notify(job.outcome(), job.url()).await {
			let err = Error::AlertTransport { url: job.url().to_string(), source };

			tracing::warn!(error = %err, cause = %source_of(&err), "Dropping undelivered alert.");
		}

		job.mark_alerted();

		job
	}

	async fn archive(&mut self, job: &mut ArchiveJob) -> Result<()> {
		let entry = match self.queue_log.append(job.url()).await {
			Ok(entry) => entry,
			Err(err) => {
				job.advance(JobStatus::Failed);

				return Err(archival(job.url(), err));
			},
		};

		tracing::debug!(url = job.url(), sequence = entry.sequence, "Queue log entry written.");

		job.advance(JobStatus::Dispatched);

		match self.dispatcher.dispatch(job.url()).await {
			Ok(_) => {
				job.advance(JobStatus::Succeeded);

				Ok(())
			},
			Err(err) => {
				job.advance(JobStatus::Failed);

				Err(archival(job.url(), err))
			},
		}
	}
}
impl<R> JobHandler for JobRunner<R>
where
	R: ExecRuntime,
{
	fn handle(&mut self, url: String) -> BoxFuture<'_, Result<JobStatus>> {
		Box::pin(async move { Ok(self.process(url).await.status()) })
	}
}

fn archival<E>(url: &str, err: E) -> Error
where
	E: std::error::Error + Send + Sync + 'static,
{
	Error::Archival { url: url.to_string(), source: Box::new(err) }
}

fn source_of(err: &Error) -> String {
	std::error::Error::source(err).map(ToString::to_string).unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn happy_path_transitions_are_allowed() {
		assert!(JobStatus::Pending.can_become(JobStatus::Dispatched));
		assert!(JobStatus::Dispatched.can_become(JobStatus::Succeeded));
		assert!(JobStatus::Dispatched.can_become(JobStatus::Failed));
		assert!(JobStatus::Pending.can_become(JobStatus::Failed));
	}

	#[test]
	fn terminal_states_do_not_move() {
		for terminal in [JobStatus::Succeeded, JobStatus::Failed] {
			assert!(terminal.is_terminal());

			for next in
				[JobStatus::Pending, JobStatus::Dispatched, JobStatus::Succeeded, JobStatus::Failed]
			{
				assert!(!terminal.can_become(next));
			}
		}

		assert!(!JobStatus::Pending.can_become(JobStatus::Succeeded));
	}

	#[test]
	fn outcome_follows_status() {
		let mut job = ArchiveJob::new("https://example.com/a".to_string());

		job.advance(JobStatus::Dispatched);
		job.advance(JobStatus::Succeeded);

		assert_eq!(job.outcome(), Outcome::Archived);

		let mut job = ArchiveJob::new("https://example.com/b".to_string());

		job.advance(JobStatus::Failed);

		assert_eq!(job.outcome(), Outcome::Failed);
	}
}
