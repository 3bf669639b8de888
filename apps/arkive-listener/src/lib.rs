pub mod job;
pub mod listener;

mod error;

pub use error::{Error, Result};

use std::{fs::OpenOptions, future::Future, path::PathBuf, pin::Pin, sync::Mutex};

use clap::Parser;
use tokio::{fs, signal};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use arkive_alerts::AlertSink;
use arkive_config::Config;
use arkive_dispatch::{DispatchOptions, DockerCli, WorkerDispatcher};
use arkive_storage::{db::Db, listener::BookmarkListener, queue_log::DurableQueueLog};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Parser)]
#[command(
	version = arkive_cli::VERSION,
	rename_all = "kebab",
	styles = arkive_cli::styles(),
)]
pub struct Args {
	/// Optional TOML config. Environment variables override its values.
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: Option<PathBuf>,
	/// Install the notify trigger and exit.
	#[arg(long, conflicts_with = "skip_install")]
	pub install_only: bool,
	/// Start listening without touching the schema.
	#[arg(long)]
	pub skip_install: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = arkive_config::load(args.config.as_deref()).map_err(Error::config)?;

	ensure_directories(&config).await?;
	init_tracing(&config)?;

	if let Err(err) = serve(&config, &args).await {
		tracing::error!(error = %err, fatal = err.is_fatal(), "Listener terminated.");

		return Err(err.into());
	}

	Ok(())
}

async fn serve(config: &Config, args: &Args) -> Result<()> {
	let alerts = AlertSink::from_urls(&config.alerts.urls).map_err(Error::config)?;

	tracing::info!(transports = alerts.len(), enabled = alerts.is_enabled(), "Alert sink ready.");

	let db = Db::connect(&config.storage.postgres).await.map_err(Error::ListenerTransport)?;

	if args.skip_install {
		tracing::info!("Skipping notify trigger installation.");
	} else {
		db.ensure_schema().await.map_err(Error::SchemaInstall)?;
	}
	if args.install_only {
		return Ok(());
	}

	let queue_log =
		DurableQueueLog::open(config.storage.queue_log.path()).await.map_err(Error::config)?;
	let dispatcher = WorkerDispatcher::new(
		DockerCli::new(config.worker.runtime_bin.as_str()),
		DispatchOptions::from_config(&config.worker).map_err(Error::config)?,
	);
	let mut runner = job::JobRunner::new(queue_log, dispatcher, alerts);
	let mut source = BookmarkListener::connect(&db).await.map_err(Error::ListenerTransport)?;

	listener::run(&mut source, &mut runner, config.listener.wait_timeout(), shutdown_signal())
		.await?;

	Ok(())
}

async fn ensure_directories(config: &Config) -> Result<()> {
	for dir in [&config.storage.queue_log.data_dir, &config.service.logs_dir] {
		fs::create_dir_all(dir).await.map_err(|err| Error::Config {
			message: format!("Failed to create directory {dir:?}: {err}."),
		})?;
	}

	Ok(())
}

/// Logs to stdout and appends the same events, without colors, to the operational log file.
fn init_tracing(config: &Config) -> Result<()> {
	let filter = match EnvFilter::try_from_default_env() {
		Ok(filter) => filter,
		Err(_) => EnvFilter::try_new(&config.service.log_level).map_err(Error::config)?,
	};
	let log_path = config.service.log_path();
	let log_file = OpenOptions::new().create(true).append(true).open(&log_path).map_err(|err| {
		Error::Config { message: format!("Failed to open log file {log_path:?}: {err}.") }
	})?;

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().compact())
		.with(fmt::layer().with_ansi(false).with_writer(Mutex::new(log_file)))
		.try_init()
		.map_err(Error::config)?;

	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(err) = signal::ctrl_c().await {
			tracing::error!(error = %err, "Failed to listen for interrupt.");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			},
			Err(err) => {
				tracing::error!(error = %err, "Failed to listen for SIGTERM.");
				std::future::pending::<()>().await;
			},
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => tracing::info!(reason = "SIGINT", "Interrupt received."),
		() = terminate => tracing::info!(reason = "SIGTERM", "Termination requested."),
	}
}
