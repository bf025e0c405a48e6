//! [`LogStore`] backed by an sqlx SQLite pool.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqlitePool};
use sqlx::Sqlite;
use sqlx::query::Query;

use super::{Dialect, LogStore, Row};

/// SQLite log store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LogStore for SqliteStore {
    type Error = sqlx::Error;

    async fn insert(&self, table: &str, row: &Row) -> Result<(), sqlx::Error> {
        let sql = Dialect::Sqlite.insert_sql(table, row.keys().map(String::as_str));

        let mut query = sqlx::query(&sql);
        for value in row.values() {
            query = bind_value(query, value);
        }
        query.execute(&self.pool).await?;

        Ok(())
    }

    async fn fetch_scalar(&self, query: &str, params: &[&str]) -> Result<i64, sqlx::Error> {
        let mut scalar = sqlx::query_scalar::<_, i64>(query);
        for param in params {
            scalar = scalar.bind(*param);
        }
        scalar.fetch_one(&self.pool).await
    }

    async fn execute(&self, query: &str, params: &[&str]) -> Result<u64, sqlx::Error> {
        let mut statement = sqlx::query(query);
        for param in params {
            statement = statement.bind(*param);
        }
        let result = statement.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }
}

/// Bind a JSON value using the closest SQLite storage class
fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                query.bind(n.to_string())
            }
        }
        Value::String(s) => query.bind(s.as_str()),
        // Nested structures are stored as their JSON text.
        Value::Array(_) | Value::Object(_) => query.bind(value.to_string()),
    }
}

///////////////////////////////////////////////////////////////////////////////
//****                              Tests                                ****//
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::Row as _;

    async fn create_test_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        sqlx::query(
            "CREATE TABLE log (
                time TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
                channel TEXT NOT NULL,
                level TEXT NOT NULL,
                message TEXT NOT NULL,
                user_id,
                tags
            )",
        )
        .execute(&pool)
        .await
        .expect("Failed to create test table");

        SqliteStore::new(pool)
    }

    #[tokio::test]
    async fn test_insert_binds_values_by_type() {
        let store = create_test_store().await;
        let mut row = Row::new();
        row.insert("channel".into(), json!("system"));
        row.insert("level".into(), json!("ERROR"));
        row.insert("message".into(), json!("boom"));
        row.insert("user_id".into(), json!(7));
        row.insert("tags".into(), json!(["a", "b"]));

        store.insert("log", &row).await.unwrap();

        let stored = sqlx::query("SELECT channel, message, user_id, tags, typeof(user_id) AS kind FROM log")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(stored.get::<String, _>("channel"), "system");
        assert_eq!(stored.get::<String, _>("message"), "boom");
        assert_eq!(stored.get::<i64, _>("user_id"), 7);
        assert_eq!(stored.get::<String, _>("kind"), "integer");
        assert_eq!(stored.get::<String, _>("tags"), r#"["a","b"]"#);
    }

    #[tokio::test]
    async fn test_fetch_scalar_and_execute() {
        let store = create_test_store().await;
        for channel in ["a", "a", "b"] {
            let mut row = Row::new();
            row.insert("channel".into(), json!(channel));
            row.insert("level".into(), json!("INFO"));
            row.insert("message".into(), json!("m"));
            store.insert("log", &row).await.unwrap();
        }

        let count = store
            .fetch_scalar("SELECT COUNT(*) FROM log WHERE channel = ?", &["a"])
            .await
            .unwrap();
        assert_eq!(count, 2);

        let deleted = store
            .execute("DELETE FROM log WHERE channel = ?", &["a"])
            .await
            .unwrap();
        assert_eq!(deleted, 2);
    }

    #[tokio::test]
    async fn test_insert_into_missing_table_fails() {
        let store = create_test_store().await;
        let mut row = Row::new();
        row.insert("channel".into(), json!("system"));

        assert!(store.insert("missing", &row).await.is_err());
    }
}
