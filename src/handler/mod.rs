//! # Handler Module
//!
//! The database sink. Every accepted record becomes exactly one row:
//!
//! 1. Configured additional fields are moved out of the record's context (or,
//!    failing that, its extra data) into their own columns.
//! 2. The remaining record is rendered by the formatter into `message`.
//! 3. The row `{channel, level, message, ...additional fields}` is inserted.
//! 4. With probability `clean_probability / clean_divisor` the channel is
//!    pruned back to `max_entries` rows, oldest first.
//!
//! Retention is sampled per write; nothing runs on a schedule. Storage errors
//! from any step are returned unchanged.
//!
//! ## Caveat
//!
//! An additional field named `channel`, `level` or `message` overwrites that
//! column's value in the inserted row.
//!
//! ## Table Layout
//!
//! ```sql
//! CREATE TABLE `log` (
//!   `log_entry_id` INTEGER PRIMARY KEY AUTOINCREMENT,
//!   `time` TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
//!   `channel` TEXT NOT NULL,
//!   `level` TEXT NOT NULL,
//!   `message` TEXT NOT NULL
//! );
//! ```
//!
//! See [`crate::database::ensure_log_table`].

pub mod random;

pub use random::{RandomSource, SequenceRandom, ThreadRandom};

use async_trait::async_trait;
use tracing::debug;

use crate::error::ConfigError;
use crate::formatter::{DbFormatter, Formatter};
use crate::record::{Fields, Level, LogRecord};
use crate::store::{LogStore, Row};

pub const DEFAULT_TABLE: &str = "log";
pub const DEFAULT_CLEAN_DIVISOR: u32 = 100;
pub const DEFAULT_CLEAN_PROBABILITY: u32 = 1;

/// Callback run on every handled record before it is written
pub type Processor = Box<dyn Fn(&mut LogRecord) + Send + Sync>;

/// A destination for log records
#[async_trait]
pub trait RecordSink: Send + Sync {
    type Error;

    /// Write one record
    async fn accept(&self, record: LogRecord) -> Result<(), Self::Error>;

    /// Remove every stored record of a channel, returning how many were removed
    async fn clear(&self, channel: &str) -> Result<u64, Self::Error>;
}

///////////////////////////////////////////////////////////////////////////////
//****                         Public Structs                            ****//
///////////////////////////////////////////////////////////////////////////////

/// Writes log records to a database table and prunes old ones
pub struct DbHandler<S: LogStore> {
    store: S,
    table: String,
    additional_fields: Vec<String>,
    max_entries: Option<u64>,
    clean_divisor: u32,
    clean_probability: u32,
    level: Level,
    bubble: bool,
    formatter: Box<dyn Formatter>,
    random: Box<dyn RandomSource>,
    processors: Vec<Processor>,
}

impl<S: LogStore> DbHandler<S> {
    /// Create a handler writing to the `log` table, without retention limit
    pub fn new(store: S) -> Self {
        Self {
            store,
            table: DEFAULT_TABLE.to_string(),
            additional_fields: Vec::new(),
            max_entries: None,
            clean_divisor: DEFAULT_CLEAN_DIVISOR,
            clean_probability: DEFAULT_CLEAN_PROBABILITY,
            level: Level::Debug,
            bubble: true,
            formatter: Box::new(DbFormatter::default()),
            random: Box::new(ThreadRandom),
            processors: Vec::new(),
        }
    }

    /// Keep at most `max_entries` rows per channel. `None` or `0` disables cleanup.
    pub fn with_max_entries(mut self, max_entries: Option<u64>) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Fields to promote from context/extra into their own columns.
    ///
    /// Duplicate names are ignored; the first occurrence keeps its position.
    pub fn with_additional_fields<I, T>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.additional_fields.clear();
        for field in fields {
            let field = field.into();
            if !self.additional_fields.contains(&field) {
                self.additional_fields.push(field);
            }
        }
        self
    }

    /// Minimum level handled by [`DbHandler::handle`]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Whether records handled here should continue to later sinks
    pub fn with_bubble(mut self, bubble: bool) -> Self {
        self.bubble = bubble;
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn with_random_source(mut self, random: impl RandomSource + 'static) -> Self {
        self.random = Box::new(random);
        self
    }

    /// Set the denominator of the cleanup probability
    pub fn set_clean_divisor(&mut self, clean_divisor: u32) -> Result<(), ConfigError> {
        if clean_divisor == 0 {
            return Err(ConfigError::ZeroCleanDivisor);
        }
        self.clean_divisor = clean_divisor;
        Ok(())
    }

    /// Set the numerator of the cleanup probability.
    ///
    /// With a probability of 1 and a divisor of 100 there is a 1% chance the
    /// channel is pruned on each write. `0` never prunes; a value equal to or
    /// above the divisor prunes on every write.
    pub fn set_clean_probability(&mut self, clean_probability: u32) {
        self.clean_probability = clean_probability;
    }

    pub fn set_formatter(&mut self, formatter: impl Formatter + 'static) {
        self.formatter = Box::new(formatter);
    }

    pub fn set_random_source(&mut self, random: impl RandomSource + 'static) {
        self.random = Box::new(random);
    }

    /// Add a processor; the most recently pushed one runs first
    pub fn push_processor(&mut self, processor: impl Fn(&mut LogRecord) + Send + Sync + 'static) {
        self.processors.push(Box::new(processor));
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn additional_fields(&self) -> &[String] {
        &self.additional_fields
    }

    pub fn max_entries(&self) -> Option<u64> {
        self.max_entries
    }

    pub fn clean_divisor(&self) -> u32 {
        self.clean_divisor
    }

    pub fn clean_probability(&self) -> u32 {
        self.clean_probability
    }

    pub fn bubble(&self) -> bool {
        self.bubble
    }

    /// Whether a record of this level would be written by [`DbHandler::handle`]
    pub fn is_handling(&self, level: Level) -> bool {
        level >= self.level
    }

    /// Filter by level, run processors, then write the record.
    ///
    /// Returns `Ok(true)` when the record was written and should not bubble
    /// to later sinks, `Ok(false)` otherwise.
    pub async fn handle(&self, mut record: LogRecord) -> Result<bool, S::Error> {
        if !self.is_handling(record.level) {
            return Ok(false);
        }

        for processor in self.processors.iter().rev() {
            processor(&mut record);
        }

        self.write(record).await?;
        Ok(!self.bubble)
    }

    async fn write(&self, mut record: LogRecord) -> Result<(), S::Error> {
        let additional = self.extract_additional_fields(&mut record);
        let message = self.formatter.format(&record);
        let row = build_row(&record, message, additional);

        self.store.insert(&self.table, &row).await?;

        self.clean(&record.channel).await
    }

    /// Move configured fields out of context/extra, context first
    fn extract_additional_fields(&self, record: &mut LogRecord) -> Fields {
        let mut additional = Fields::new();

        for field in &self.additional_fields {
            let value = record
                .context
                .shift_remove(field)
                .or_else(|| record.extra.shift_remove(field));

            if let Some(value) = value {
                additional.insert(field.clone(), value);
            }
        }

        additional
    }

    async fn clean(&self, channel: &str) -> Result<(), S::Error> {
        let Some(max_entries) = self.max_entries.filter(|max| *max > 0) else {
            return Ok(());
        };
        if self.random.draw(self.clean_divisor) > self.clean_probability {
            return Ok(());
        }

        let current_count = self.channel_entries_count(channel).await?;
        if current_count > max_entries {
            let entries_to_delete = current_count - max_entries;
            self.delete_oldest_channel_entries(channel, entries_to_delete)
                .await?;
        }

        Ok(())
    }

    /// Number of stored rows for `channel`
    pub async fn channel_entries_count(&self, channel: &str) -> Result<u64, S::Error> {
        let sql = self.store.dialect().count_channel_sql(&self.table);
        let count = self.store.fetch_scalar(&sql, &[channel]).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn delete_oldest_channel_entries(
        &self,
        channel: &str,
        entries_to_delete: u64,
    ) -> Result<(), S::Error> {
        let sql = self
            .store
            .dialect()
            .delete_oldest_sql(&self.table, entries_to_delete);
        let deleted = self.store.execute(&sql, &[channel]).await?;

        debug!(
            channel = channel,
            requested = entries_to_delete,
            deleted = deleted,
            "Pruned oldest log entries"
        );
        Ok(())
    }
}

#[async_trait]
impl<S: LogStore> RecordSink for DbHandler<S> {
    type Error = S::Error;

    async fn accept(&self, record: LogRecord) -> Result<(), S::Error> {
        self.write(record).await
    }

    async fn clear(&self, channel: &str) -> Result<u64, S::Error> {
        let sql = self.store.dialect().clear_channel_sql(&self.table);
        let deleted = self.store.execute(&sql, &[channel]).await?;
        debug!("Cleared {} log entries from channel {}", deleted, channel);
        Ok(deleted)
    }
}

/// Assemble the stored row; additional fields may overwrite reserved columns
fn build_row(record: &LogRecord, message: String, additional: Fields) -> Row {
    let mut row = Row::new();
    row.insert("channel".to_string(), record.channel.clone().into());
    row.insert("level".to_string(), record.level_name().into());
    row.insert("message".to_string(), message.into());

    for (column, value) in additional {
        row.insert(column, value);
    }

    row
}

///////////////////////////////////////////////////////////////////////////////
//****                              Tests                                ****//
///////////////////////////////////////////////////////////////////////////////
