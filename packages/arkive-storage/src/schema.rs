use sqlx::{Connection, PgConnection};

use arkive_config::{NOTIFY_CHANNEL, WATCHED_TABLE};

use crate::Result;

pub const TRIGGER_NAME: &str = "new_bookmark_trigger";

const NOTIFY_FUNCTION_SQL: &str = include_str!("../../../sql/001_notify_new_bookmark.sql");
const CREATE_TRIGGER_SQL: &str = include_str!("../../../sql/002_new_bookmark_trigger.sql");
const INSTALL_LOCK_ID: i64 = 7_120_233;

/// Replaces the notify function and creates the insert trigger when it is missing.
///
/// Runs in a single transaction holding an advisory lock, so concurrent startups cannot race
/// between the catalog check and the `CREATE TRIGGER`. Any error aborts the transaction and
/// is meant to abort startup.
pub async fn install(conn: &mut PgConnection) -> Result<()> {
	// Advisory locks are held per connection. The xact variant releases on commit or rollback.
	let mut tx = conn.begin().await?;

	sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(INSTALL_LOCK_ID).execute(&mut *tx).await?;
	sqlx::raw_sql(NOTIFY_FUNCTION_SQL).execute(&mut *tx).await?;
	sqlx::raw_sql(CREATE_TRIGGER_SQL).execute(&mut *tx).await?;

	tx.commit().await?;

	tracing::info!(
		table = WATCHED_TABLE,
		channel = NOTIFY_CHANNEL,
		trigger = TRIGGER_NAME,
		"Notify trigger installed."
	);

	Ok(())
}

/// Number of user triggers named [`TRIGGER_NAME`] on the watched table.
pub async fn trigger_count(conn: &mut PgConnection) -> Result<i64> {
	let count = sqlx::query_scalar(
		"\
SELECT count(*)
FROM pg_trigger
WHERE tgname = $1
	AND tgrelid = to_regclass($2)
	AND NOT tgisinternal",
	)
	.bind(TRIGGER_NAME)
	.bind(WATCHED_TABLE)
	.fetch_one(conn)
	.await?;

	Ok(count)
}
