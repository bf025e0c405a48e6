//! # dblog
//!
//! A log sink that writes structured records into a relational table, one
//! row per record, and keeps each channel bounded by probabilistically
//! pruning its oldest rows.
//!
//! ```no_run
//! use dblog::database::{connect_with_file_creation, ensure_log_table};
//! use dblog::{DbHandler, Level, LogRecord, RecordSink, SqliteStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = connect_with_file_creation("sqlite://app-log.db").await?;
//! ensure_log_table(&pool, "log", &["user_id".to_string()]).await?;
//!
//! let mut handler = DbHandler::new(SqliteStore::new(pool))
//!     .with_additional_fields(["user_id"])
//!     .with_max_entries(Some(10_000));
//! handler.set_clean_divisor(1000)?;
//!
//! handler
//!     .accept(LogRecord::new("billing", Level::Error, "Payment failed").with_context("user_id", 42))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod formatter;
pub mod handler;
pub mod record;
pub mod store;

#[cfg(test)]
mod test_utils;

pub use error::ConfigError;
pub use formatter::{DbFormatter, Formatter, LineFormatter};
pub use handler::{DbHandler, RandomSource, RecordSink};
pub use record::{Fields, Level, LogRecord};
pub use store::{Dialect, LogStore, Row, SqliteStore};
