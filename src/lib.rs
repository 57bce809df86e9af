//! Bot database client library.
//!
//! Wraps an `sqlx` connection pool (SQLite, PostgreSQL, MySQL) for the chat
//! bot: the client is configured from an explicit [`ClientOptions`] record and
//! reports readiness through the bot's own logger.

pub mod config;
pub mod db;
pub mod error;
pub mod logger;
pub mod manager;
pub mod models;

pub use config::{ClientOptions, Config, ErrorFormat, LogLevel, LogLevels};
pub use db::Transaction;
pub use error::{DbError, DbResult};
pub use logger::{HostLogger, TracingLogger};
pub use manager::{DatabaseManager, LOADED_MESSAGE};
