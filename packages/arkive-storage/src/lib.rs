pub mod db;
pub mod listener;
pub mod models;
pub mod queue_log;
pub mod schema;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
