//! # Record Module
//!
//! The log record consumed by the database sink: a message, its severity,
//! the channel it belongs to and two ordered bags of structured data
//! (`context` supplied by the caller, `extra` added by processors).
//!
//! Structured values are plain `serde_json::Value`s, and the maps keep
//! insertion order so the rendered JSON matches the order fields were added.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Ordered mapping of structured fields attached to a record.
pub type Fields = serde_json::Map<String, serde_json::Value>;

///////////////////////////////////////////////////////////////////////////////
//****                          Public Types                             ****//
///////////////////////////////////////////////////////////////////////////////

/// Log severity levels, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug = 100,
    Info = 200,
    Notice = 250,
    Warning = 300,
    Error = 400,
    Critical = 500,
    Alert = 550,
    Emergency = 600,
}

impl Level {
    /// Upper-case name stored in the `level` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Notice => "NOTICE",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Alert => "ALERT",
            Level::Emergency => "EMERGENCY",
        }
    }

    /// Numeric severity code
    pub fn code(&self) -> u16 {
        *self as u16
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "notice" => Ok(Level::Notice),
            "warning" | "warn" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            "critical" => Ok(Level::Critical),
            "alert" => Ok(Level::Alert),
            "emergency" => Ok(Level::Emergency),
            _ => Err(ConfigError::UnknownLevel(s.to_string())),
        }
    }
}

///////////////////////////////////////////////////////////////////////////////
//****                         Public Structs                            ****//
///////////////////////////////////////////////////////////////////////////////

/// A single log record as handed over by the logging pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub message: String,
    pub level: Level,
    pub channel: String,
    #[serde(default)]
    pub context: Fields,
    #[serde(default)]
    pub extra: Fields,
    #[serde(default = "Utc::now")]
    pub datetime: DateTime<Utc>,
}

impl LogRecord {
    /// Create a record with empty context and extra, stamped with the current time
    pub fn new(channel: impl Into<String>, level: Level, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            channel: channel.into(),
            context: Fields::new(),
            extra: Fields::new(),
            datetime: Utc::now(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_datetime(mut self, datetime: DateTime<Utc>) -> Self {
        self.datetime = datetime;
        self
    }

    /// Level name as stored in the `level` column, e.g. `"ERROR"`
    pub fn level_name(&self) -> &'static str {
        self.level.as_str()
    }
}

///////////////////////////////////////////////////////////////////////////////
//****                              Tests                                ****//
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_levels_are_ordered_by_severity() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Alert < Level::Emergency);
        assert_eq!(Level::Error.code(), 400);
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("ERROR".parse::<Level>().unwrap(), Level::Error);
        assert_eq!("warn".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!(" Notice ".parse::<Level>().unwrap(), Level::Notice);
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_fields_keep_insertion_order() {
        let record = LogRecord::new("system", Level::Info, "hello")
            .with_context("zeta", 1)
            .with_context("alpha", 2);

        let keys: Vec<&String> = record.context.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_record_deserializes_with_defaults() {
        let record: LogRecord = serde_json::from_value(json!({
            "message": "The error message",
            "level": "ERROR",
            "channel": "system"
        }))
        .unwrap();

        assert_eq!(record.level_name(), "ERROR");
        assert!(record.context.is_empty());
        assert!(record.extra.is_empty());
    }
}
