//! # Store Module
//!
//! The relational client the database handler writes through. A store knows
//! how to insert one row, fetch a single integer and execute a statement;
//! the handler builds the SQL and the store runs it.
//!
//! Errors are the store's own type and are handed back to the caller as-is.

pub mod dialect;
pub mod sqlite;

pub use dialect::Dialect;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

/// One row to insert, column name to value, in column order
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Relational backend used by [`DbHandler`](crate::handler::DbHandler)
#[async_trait]
pub trait LogStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Insert `row` into `table`
    async fn insert(&self, table: &str, row: &Row) -> Result<(), Self::Error>;

    /// Run a query returning a single integer, e.g. a `COUNT(*)`
    async fn fetch_scalar(&self, query: &str, params: &[&str]) -> Result<i64, Self::Error>;

    /// Run a statement and return the number of affected rows
    async fn execute(&self, query: &str, params: &[&str]) -> Result<u64, Self::Error>;

    /// SQL flavour used to build statements for this store
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }
}
