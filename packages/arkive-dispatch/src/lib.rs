//! Invokes `archivebox add` inside the ArchiveBox container and streams its output.

pub mod dispatcher;
pub mod runtime;

mod error;

pub use dispatcher::{DispatchOptions, WorkerDispatcher};
pub use error::{Error, Result};
pub use runtime::{Completion, DockerCli, ExecRequest, ExecRuntime};

use std::{future::Future, pin::Pin};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
