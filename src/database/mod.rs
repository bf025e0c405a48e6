//!
//! # Database Module for dblog
//!
//! Connection and schema helpers for the SQLite log store.
//!
//! ## Features
//!
//! - **Database Initialization**: Creates the SQLite database file if needed.
//! - **Log Table Provisioning**: Creates the log table with the indexes used
//!   by retention cleanup, and adds columns for promoted fields to an
//!   existing table.
//! - **Schema Inspection**: Lists the columns of a table.

use sqlx::{Row, Sqlite, migrate::MigrateDatabase, sqlite::SqlitePool};
use tracing::info;

use crate::store::Dialect;

pub const DBLOG_DB_URL: &str = "sqlite://dblog.db";

const RESERVED_COLUMNS: [&str; 5] = ["log_entry_id", "time", "channel", "level", "message"];

///////////////////////////////////////////////////////////////////////////////
//****                       Public Functions                            ****//
///////////////////////////////////////////////////////////////////////////////

/// Connect to the database, creating the file if it doesn't exist
pub async fn connect_with_file_creation(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        info!("Database does not exist at {}, creating it", database_url);
        Sqlite::create_database(database_url).await?;
    }

    let pool = SqlitePool::connect(database_url).await?;
    sqlx::query("SELECT 1").execute(&pool).await?;
    Ok(pool)
}

/// Create the log table and its indexes if missing, and add any of
/// `additional_columns` the table lacks.
///
/// Additional columns are declared without a type so values keep the
/// storage class they were bound with.
pub async fn ensure_log_table(
    pool: &SqlitePool,
    table: &str,
    additional_columns: &[String],
) -> Result<(), sqlx::Error> {
    let dialect = Dialect::Sqlite;
    let quoted = dialect.quote_identifier(table);

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            `log_entry_id` INTEGER PRIMARY KEY AUTOINCREMENT,
            `time` TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
            `channel` TEXT NOT NULL,
            `level` TEXT NOT NULL,
            `message` TEXT NOT NULL
        )",
        quoted
    ))
    .execute(pool)
    .await?;

    for column in ["time", "channel", "level"] {
        let index = dialect.quote_identifier(&format!("{}_{}", table, column));
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            index,
            quoted,
            dialect.quote_identifier(column)
        ))
        .execute(pool)
        .await?;
    }

    let existing = table_columns(pool, table).await?;
    for column in additional_columns {
        if RESERVED_COLUMNS.contains(&column.as_str()) || existing.contains(column) {
            continue;
        }
        info!("Adding column {} to table {}", column, table);
        sqlx::query(&format!(
            "ALTER TABLE {} ADD COLUMN {}",
            quoted,
            dialect.quote_identifier(column)
        ))
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Column names of `table`, in declaration order
pub async fn table_columns(pool: &SqlitePool, table: &str) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query("SELECT name FROM pragma_table_info(?) ORDER BY cid")
        .bind(table)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| row.get::<String, _>("name"))
        .collect())
}

///////////////////////////////////////////////////////////////////////////////
//****                              Tests                                ****//
///////////////////////////////////////////////////////////////////////////////
