use std::{
	collections::BTreeMap,
	sync::{Arc, Mutex},
	time::Duration,
};

use tempfile::TempDir;
use tokio::time;

use arkive_alerts::AlertSink;
use arkive_config::Postgres;
use arkive_dispatch::{Completion, DispatchOptions, ExecRequest, ExecRuntime, WorkerDispatcher};
use arkive_listener::{job::JobRunner, listener};
use arkive_storage::{db::Db, listener::BookmarkListener, queue_log::DurableQueueLog};
use arkive_testkit::TestDatabase;

#[derive(Clone, Default)]
struct RecordingRuntime {
	urls: Arc<Mutex<Vec<String>>>,
}
impl ExecRuntime for RecordingRuntime {
	fn exec<'a>(
		&'a self,
		request: &'a ExecRequest,
		_: &'a mut (dyn FnMut(&str) + Send),
	) -> arkive_dispatch::BoxFuture<'a, arkive_dispatch::Result<Completion>> {
		Box::pin(async move {
			if let Some(url) = request.argv.last() {
				self.urls.lock().expect("Lock poisoned.").push(url.clone());
			}

			Ok(Completion { exit_code: Some(0) })
		})
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ARKIVE_PG_DSN to run."]
async fn inserted_bookmarks_are_archived_in_order() {
	let Some(base_dsn) = arkive_testkit::env_dsn() else {
		eprintln!("Skipping inserted_bookmarks_are_archived_in_order; set ARKIVE_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");

	test_db.create_bookmark_table().await.expect("Failed to create bookmark table.");

	let cfg = Postgres { dsn: Some(test_db.dsn().to_string()), ..Default::default() };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to install schema.");

	let dir = TempDir::new().expect("Failed to create temp dir.");
	let queue_log = DurableQueueLog::open(dir.path().join("queue.txt"))
		.await
		.expect("Failed to open queue log.");
	let runtime = RecordingRuntime::default();
	let options = DispatchOptions {
		container: "archivebox".to_string(),
		command_args: Vec::new(),
		identity: None,
		environment: BTreeMap::new(),
	};
	let dispatcher = WorkerDispatcher::new(runtime.clone(), options);
	let mut runner = JobRunner::new(queue_log, dispatcher, AlertSink::default());
	let mut source = BookmarkListener::connect(&db).await.expect("Failed to listen.");
	let urls = ["https://example.com/a", "https://example.com/b", "https://example.com/c"];

	for url in urls {
		sqlx::query("INSERT INTO bookmark (url) VALUES ($1)")
			.bind(url)
			.execute(&db.pool)
			.await
			.expect("Failed to insert bookmark.");
	}

	let stats = listener::run(
		&mut source,
		&mut runner,
		Some(Duration::from_millis(500)),
		time::sleep(Duration::from_secs(3)),
	)
	.await
	.expect("Listener failed.");

	assert_eq!(stats.received, 3);
	assert_eq!(stats.succeeded, 3);
	assert_eq!(*runtime.urls.lock().expect("Lock poisoned."), urls);

	let logged: Vec<String> = runner
		.queue_log()
		.read_entries()
		.await
		.expect("Failed to read queue log.")
		.into_iter()
		.map(|entry| entry.url)
		.collect();

	assert_eq!(logged, urls);

	drop(source);
	db.pool.close().await;
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
