use std::str::FromStr;

use sqlx::{
	PgPool,
	postgres::{PgConnectOptions, PgPoolOptions},
};

use crate::{Result, schema};

// One connection for the LISTEN session, one for schema installation and ad-hoc queries.
const POOL_MAX_CONNS: u32 = 2;

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &arkive_config::Postgres) -> Result<Self> {
		let pool = PgPoolOptions::new()
			.max_connections(POOL_MAX_CONNS)
			.connect_with(connect_options(cfg)?)
			.await?;

		Ok(Self { pool })
	}

	/// Installs the notify trigger on the watched table. Safe to run on every startup.
	pub async fn ensure_schema(&self) -> Result<()> {
		let mut conn = self.pool.acquire().await?;

		schema::install(&mut conn).await
	}
}

pub fn connect_options(cfg: &arkive_config::Postgres) -> Result<PgConnectOptions> {
	if let Some(dsn) = cfg.dsn.as_deref() {
		return Ok(PgConnectOptions::from_str(dsn)?);
	}

	Ok(PgConnectOptions::new()
		.host(&cfg.host)
		.port(cfg.port)
		.username(&cfg.user)
		.password(&cfg.password)
		.database(&cfg.name))
}
