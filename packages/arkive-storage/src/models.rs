use time::OffsetDateTime;

/// A row of the watched table. Written by the bookmark manager, only ever read here.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookmarkRecord {
	pub url: String,
	pub inserted_at: OffsetDateTime,
}

/// One line of the durable queue log. `sequence` is the 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueLogEntry {
	pub url: String,
	pub sequence: u64,
}
