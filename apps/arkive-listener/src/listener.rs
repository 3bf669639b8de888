//! The notification loop: wait on the channel, drain every queued URL, hand each to a job.

use std::{future::Future, pin::Pin, time::Duration};

use tokio::time;

use arkive_config::NOTIFY_CHANNEL;
use arkive_storage::listener::BookmarkListener;

use crate::{BoxFuture, Error, Result, job::JobStatus};

/// Where notification payloads come from.
pub trait NotificationSource
where
	Self: Send,
{
	/// Waits until a payload is available. Errors are fatal to the loop.
	fn recv(&mut self) -> BoxFuture<'_, Result<String>>;

	/// Returns a payload that has already arrived, without waiting for more.
	fn try_next(&mut self) -> BoxFuture<'_, Result<Option<String>>>;
}
impl NotificationSource for BookmarkListener {
	fn recv(&mut self) -> BoxFuture<'_, Result<String>> {
		Box::pin(async move { BookmarkListener::recv(self).await.map_err(Error::ListenerTransport) })
	}

	fn try_next(&mut self) -> BoxFuture<'_, Result<Option<String>>> {
		Box::pin(async move {
			BookmarkListener::try_next(self).await.map_err(Error::ListenerTransport)
		})
	}
}

/// Processes one URL to a terminal status.
pub trait JobHandler
where
	Self: Send,
{
	fn handle(&mut self, url: String) -> BoxFuture<'_, Result<JobStatus>>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListenerStats {
	pub received: u64,
	pub succeeded: u64,
	pub failed: u64,
	pub timeouts: u64,
}

/// Runs until `shutdown` resolves or the source fails.
///
/// `shutdown` is observed while waiting for notifications and between two jobs of a drain, never
/// during a job, so a job that has started is always finished. Payloads not yet taken from the
/// source when shutdown is seen are left on the connection. URLs are processed one at a time in
/// arrival order; anything arriving meanwhile stays queued on the connection.
pub async fn run<S, H, F>(
	source: &mut S,
	handler: &mut H,
	wait_timeout: Option<Duration>,
	shutdown: F,
) -> Result<ListenerStats>
where
	S: NotificationSource,
	H: JobHandler,
	F: Future<Output = ()>,
{
	let mut shutdown = std::pin::pin!(shutdown);
	let mut stats = ListenerStats::default();

	tracing::info!(
		channel = NOTIFY_CHANNEL,
		"Waiting for notifications on channel '{NOTIFY_CHANNEL}'"
	);

	'listen: loop {
		let woke = tokio::select! {
			biased;

			() = &mut shutdown => {
				tracing::info!("Shutdown signal received. Stopping listener.");

				break;
			},
			woke = wait(source, wait_timeout) => woke?,
		};
		let Some(first) = woke else {
			stats.timeouts += 1;

			tracing::info!(
				timeout_secs = wait_timeout.map(|timeout| timeout.as_secs_f64()),
				"No notifications within the wait timeout."
			);

			continue;
		};
		let mut next = Some(first);

		while let Some(url) = next {
			stats.received += 1;

			tracing::info!(url = %url, "Received URL: {url}");

			match handler.handle(url).await {
				Ok(JobStatus::Succeeded) => stats.succeeded += 1,
				Ok(_) => stats.failed += 1,
				Err(err) if err.is_fatal() => return Err(err),
				Err(err) => {
					stats.failed += 1;

					tracing::error!(error = %err, "Job failed. Continuing with the next URL.");
				},
			}

			if resolved(shutdown.as_mut()).await {
				tracing::info!("Shutdown signal received during drain. Stopping listener.");

				break 'listen;
			}

			next = source.try_next().await?;
		}
	}

	tracing::info!(
		received = stats.received,
		succeeded = stats.succeeded,
		failed = stats.failed,
		timeouts = stats.timeouts,
		"Listener stopped."
	);

	Ok(stats)
}

/// Polls `shutdown` once without waiting.
async fn resolved<F>(shutdown: Pin<&mut F>) -> bool
where
	F: Future<Output = ()>,
{
	tokio::select! {
		biased;

		() = shutdown => true,
		() = std::future::ready(()) => false,
	}
}

async fn wait<S>(source: &mut S, wait_timeout: Option<Duration>) -> Result<Option<String>>
where
	S: NotificationSource,
{
	let Some(wait_timeout) = wait_timeout else {
		return source.recv().await.map(Some);
	};

	match time::timeout(wait_timeout, source.recv()).await {
		Ok(received) => received.map(Some),
		Err(_) => Ok(None),
	}
}
