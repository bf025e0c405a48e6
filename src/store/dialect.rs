//! SQL text used by the handler, per database flavour.
//!
//! Only identifiers and the delete row limit are interpolated. The limit is
//! computed internally from a row count and never comes from user input;
//! every other value is a bound parameter.

/// SQL flavour a store speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// MySQL/MariaDB, which support `DELETE ... ORDER BY ... LIMIT`
    #[default]
    MySql,
    /// SQLite, where a bounded delete goes through a `rowid` subquery
    Sqlite,
}

impl Dialect {
    /// Quote an identifier with backticks, doubling embedded backticks
    pub fn quote_identifier(&self, identifier: &str) -> String {
        format!("`{}`", identifier.replace('`', "``"))
    }

    /// `INSERT` statement with one placeholder per column
    pub fn insert_sql<'a>(&self, table: &str, columns: impl IntoIterator<Item = &'a str>) -> String {
        let columns: Vec<String> = columns
            .into_iter()
            .map(|c| self.quote_identifier(c))
            .collect();
        let placeholders = vec!["?"; columns.len()].join(", ");

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.quote_identifier(table),
            columns.join(", "),
            placeholders
        )
    }

    /// Count the rows of one channel; binds the channel name
    pub fn count_channel_sql(&self, table: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM {} WHERE `channel` = ?",
            self.quote_identifier(table)
        )
    }

    /// Delete the `limit` oldest rows of one channel; binds the channel name
    pub fn delete_oldest_sql(&self, table: &str, limit: u64) -> String {
        let table = self.quote_identifier(table);
        match self {
            Dialect::MySql => format!(
                "DELETE FROM {} WHERE `channel` = ? ORDER BY `time` ASC LIMIT {}",
                table, limit
            ),
            Dialect::Sqlite => format!(
                "DELETE FROM {0} WHERE rowid IN \
                 (SELECT rowid FROM {0} WHERE `channel` = ? ORDER BY `time` ASC, rowid ASC LIMIT {1})",
                table, limit
            ),
        }
    }

    /// Delete every row of one channel; binds the channel name
    pub fn clear_channel_sql(&self, table: &str) -> String {
        format!(
            "DELETE FROM {} WHERE `channel` = ?",
            self.quote_identifier(table)
        )
    }
}
