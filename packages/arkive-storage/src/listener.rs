//! `LISTEN` side of the bookmark notification channel.

use std::time::Duration;

use sqlx::postgres::PgListener;
use tokio::time;

use arkive_config::NOTIFY_CHANNEL;

use crate::{Error, Result, db::Db};

/// A dedicated `LISTEN new_bookmark` session.
///
/// # Delivery Guarantees
///
/// - Notifications sent before `LISTEN` is issued are not delivered.
/// - A lost connection is reported as [`Error::ConnectionClosed`] and is not retried here;
///   notifications published while disconnected are lost to this session.
pub struct BookmarkListener {
	inner: PgListener,
}
impl BookmarkListener {
	pub async fn connect(db: &Db) -> Result<Self> {
		let mut inner = PgListener::connect_with(&db.pool).await?;

		inner.listen(NOTIFY_CHANNEL).await?;

		tracing::debug!(channel = NOTIFY_CHANNEL, "Listening for notifications.");

		Ok(Self { inner })
	}

	/// Waits for the next notification payload.
	pub async fn recv(&mut self) -> Result<String> {
		match self.inner.try_recv().await? {
			Some(notification) => Ok(notification.payload().to_string()),
			None => Err(Error::ConnectionClosed { channel: NOTIFY_CHANNEL.to_string() }),
		}
	}

	/// Returns a notification that has already arrived, without waiting for new ones.
	///
	/// Checks the listener's internal buffer first, then polls the socket once so that
	/// notifications delivered in the same read as the last one are drained too.
	pub async fn try_next(&mut self) -> Result<Option<String>> {
		if let Some(notification) = self.inner.next_buffered() {
			return Ok(Some(notification.payload().to_string()));
		}

		match time::timeout(Duration::ZERO, self.inner.try_recv()).await {
			Ok(Ok(Some(notification))) => Ok(Some(notification.payload().to_string())),
			Ok(Ok(None)) => Err(Error::ConnectionClosed { channel: NOTIFY_CHANNEL.to_string() }),
			Ok(Err(err)) => Err(err.into()),
			Err(_) => Ok(None),
		}
	}
}
