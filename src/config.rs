//! Environment variable validation and configuration module for dblog
//!
//! This module provides centralized validation and configuration management
//! for all environment variables used by the dblog sink and its CLI.
//!
//! # Supported Environment Variables
//!
//! ## Database Configuration
//! - `DBLOG_DB_URL`: Database connection URL (default: "sqlite://dblog.db")
//! - `DBLOG_TABLE`: Log table name (default: "log")
//!
//! ## Handler Configuration
//! - `DBLOG_LEVEL`: Minimum level written to the table (default: "debug")
//! - `DBLOG_BUBBLE`: Let handled records continue to later sinks (default: "true")
//! - `DBLOG_ADDITIONAL_FIELDS`: Comma separated fields promoted to columns (default: none)
//! - `DBLOG_MAX_LENGTH`: Maximum stored message length, "none" to disable (default: "65535")
//!
//! ## Retention Configuration
//! - `DBLOG_MAX_ENTRIES`: Rows kept per channel, unset or "0" disables cleanup
//! - `DBLOG_CLEAN_DIVISOR`: Denominator of the cleanup chance (default: "100")
//! - `DBLOG_CLEAN_PROBABILITY`: Numerator of the cleanup chance (default: "1")
//!
//! ## Logging Configuration
//! - `RUST_LOG`: Standard Rust logging configuration
//! - `DBLOG_LOG_LEVEL`: Application-specific log level override

use std::env;
use std::str::FromStr;
use tracing::{info, warn};

use crate::database::DBLOG_DB_URL;
use crate::error::ConfigError;
use crate::formatter::{DbFormatter, MAX_LENGTH_DEFAULT};
use crate::handler::{DEFAULT_CLEAN_DIVISOR, DEFAULT_CLEAN_PROBABILITY, DEFAULT_TABLE, DbHandler};
use crate::record::Level;
use crate::store::LogStore;

const DEFAULT_LOG_FILTER: &str = "dblog=info";

/// Environment validation errors
#[derive(Debug, Clone)]
pub struct EnvValidationError {
    pub variable: String,
    pub message: String,
    pub severity: ErrorSeverity,
}

/// Severity level for environment validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSeverity {
    /// Critical errors that prevent startup
    Critical,
    /// Warnings about suspicious but usable values
    Warning,
    /// Informational messages about default values being used
    Info,
}

/// Validated configuration derived from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    // Database
    pub database_url: String,
    pub table: String,

    // Handler
    pub level: Level,
    pub bubble: bool,
    pub additional_fields: Vec<String>,
    pub max_length: Option<usize>,

    // Retention
    pub max_entries: Option<u64>,
    pub clean_divisor: u32,
    pub clean_probability: u32,

    // Logging
    pub log_level: String,
}

impl AppConfig {
    /// Build a handler over `store` with this configuration
    pub fn handler<S: LogStore>(&self, store: S) -> Result<DbHandler<S>, ConfigError> {
        let mut handler = DbHandler::new(store)
            .with_table(&self.table)
            .with_level(self.level)
            .with_bubble(self.bubble)
            .with_additional_fields(self.additional_fields.iter().cloned())
            .with_max_entries(self.max_entries)
            .with_formatter(DbFormatter::with_max_length(self.max_length));

        handler.set_clean_divisor(self.clean_divisor)?;
        handler.set_clean_probability(self.clean_probability);
        Ok(handler)
    }
}

/// Validate the process environment and return configuration or errors
pub fn validate_environment() -> Result<AppConfig, Vec<EnvValidationError>> {
    validate_with(|name| env::var(name).ok())
}

/// Validate configuration read through `lookup`.
///
/// Returns every collected message when any of them is critical.
pub fn validate_with<F>(lookup: F) -> Result<AppConfig, Vec<EnvValidationError>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Database configuration
    let database_url = lookup("DBLOG_DB_URL").unwrap_or_else(|| {
        warnings.push(info_message(
            "DBLOG_DB_URL",
            format!("Using default database URL '{}'", DBLOG_DB_URL),
        ));
        DBLOG_DB_URL.to_string()
    });

    let table = match lookup("DBLOG_TABLE") {
        Some(table) if table.trim().is_empty() => {
            errors.push(EnvValidationError {
                variable: "DBLOG_TABLE".to_string(),
                message: "Table name cannot be empty".to_string(),
                severity: ErrorSeverity::Critical,
            });
            DEFAULT_TABLE.to_string()
        }
        Some(table) => table.trim().to_string(),
        None => DEFAULT_TABLE.to_string(),
    };

    // Handler configuration
    let level = match lookup("DBLOG_LEVEL") {
        Some(value) => match value.parse::<Level>() {
            Ok(level) => level,
            Err(e) => {
                errors.push(EnvValidationError {
                    variable: "DBLOG_LEVEL".to_string(),
                    message: e.to_string(),
                    severity: ErrorSeverity::Critical,
                });
                Level::Debug
            }
        },
        None => Level::Debug,
    };

    let bubble = parse_bool_with_default(&lookup, "DBLOG_BUBBLE", true, &mut warnings);

    let additional_fields = lookup("DBLOG_ADDITIONAL_FIELDS")
        .map(|fields| {
            fields
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let max_length = match lookup("DBLOG_MAX_LENGTH") {
        Some(value) if is_disabled(&value) => None,
        Some(value) => match value.trim().parse::<usize>() {
            Ok(length) => Some(length),
            Err(e) => {
                warnings.push(EnvValidationError {
                    variable: "DBLOG_MAX_LENGTH".to_string(),
                    message: format!(
                        "Invalid value '{}': {}. Using default: {}",
                        value, e, MAX_LENGTH_DEFAULT
                    ),
                    severity: ErrorSeverity::Warning,
                });
                Some(MAX_LENGTH_DEFAULT)
            }
        },
        None => Some(MAX_LENGTH_DEFAULT),
    };

    // Retention configuration
    let max_entries = match lookup("DBLOG_MAX_ENTRIES") {
        Some(value) => match value.trim().parse::<u64>() {
            Ok(0) => None,
            Ok(max) => Some(max),
            Err(e) => {
                errors.push(EnvValidationError {
                    variable: "DBLOG_MAX_ENTRIES".to_string(),
                    message: format!("Invalid entry limit '{}': {}", value, e),
                    severity: ErrorSeverity::Critical,
                });
                None
            }
        },
        None => {
            warnings.push(info_message(
                "DBLOG_MAX_ENTRIES",
                "No entry limit set, retention cleanup disabled".to_string(),
            ));
            None
        }
    };

    let clean_divisor = parse_with_default(
        &lookup,
        "DBLOG_CLEAN_DIVISOR",
        DEFAULT_CLEAN_DIVISOR,
        &mut warnings,
    );
    if clean_divisor == 0 {
        errors.push(EnvValidationError {
            variable: "DBLOG_CLEAN_DIVISOR".to_string(),
            message: ConfigError::ZeroCleanDivisor.to_string(),
            severity: ErrorSeverity::Critical,
        });
    }

    let clean_probability = parse_with_default(
        &lookup,
        "DBLOG_CLEAN_PROBABILITY",
        DEFAULT_CLEAN_PROBABILITY,
        &mut warnings,
    );
    if clean_divisor > 0 && clean_probability >= clean_divisor {
        warnings.push(EnvValidationError {
            variable: "DBLOG_CLEAN_PROBABILITY".to_string(),
            message: format!(
                "Probability {} of {} runs cleanup on every write",
                clean_probability, clean_divisor
            ),
            severity: ErrorSeverity::Warning,
        });
    }

    // Logging configuration
    let log_level = log_filter_with(&lookup);

    // Add all warnings to errors for reporting
    errors.extend(warnings);

    if errors.iter().any(|e| e.severity == ErrorSeverity::Critical) {
        return Err(errors);
    }

    // Log non-critical issues
    for error in &errors {
        match error.severity {
            ErrorSeverity::Warning => warn!("{}: {}", error.variable, error.message),
            ErrorSeverity::Info => info!("{}: {}", error.variable, error.message),
            ErrorSeverity::Critical => {} // Already handled above
        }
    }

    Ok(AppConfig {
        database_url,
        table,
        level,
        bubble,
        additional_fields,
        max_length,
        max_entries,
        clean_divisor,
        clean_probability,
        log_level,
    })
}

/// Tracing filter from `DBLOG_LOG_LEVEL`, then `RUST_LOG`, then the default.
///
/// Readable before validation so the subscriber can be installed first.
pub fn log_filter() -> String {
    log_filter_with(&|name: &str| env::var(name).ok())
}

fn log_filter_with<F>(lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("DBLOG_LOG_LEVEL")
        .or_else(|| lookup("RUST_LOG"))
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

/// Get the validated configuration, exiting the process if validation fails
pub fn get_config() -> AppConfig {
    match validate_environment() {
        Ok(config) => config,
        Err(errors) => {
            print_validation_errors(&errors);
            std::process::exit(1);
        }
    }
}

/// Print validation errors in a user-friendly format
pub fn print_validation_errors(errors: &[EnvValidationError]) {
    let critical_count = errors
        .iter()
        .filter(|e| e.severity == ErrorSeverity::Critical)
        .count();
    eprintln!(
        "Environment validation failed with {} critical error(s):",
        critical_count
    );

    for error in errors {
        let prefix = match error.severity {
            ErrorSeverity::Critical => "CRITICAL",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Info => "INFO",
        };
        eprintln!("  {} - {}: {}", prefix, error.variable, error.message);
    }
}

/// Generate example environment configuration file
pub fn generate_env_example() -> String {
    format!(
        r#"# dblog Environment Configuration
# Copy this file to .env and customize the values for your deployment

# =============================================================================
# Database Configuration
# =============================================================================

# Database connection URL
# Default: {db_url}
DBLOG_DB_URL={db_url}

# Log table name
# Default: {table}
DBLOG_TABLE={table}

# =============================================================================
# Handler Configuration
# =============================================================================

# Minimum level written to the table
# One of: debug, info, notice, warning, error, critical, alert, emergency
DBLOG_LEVEL=debug

# Let handled records continue to later sinks
DBLOG_BUBBLE=true

# Comma separated context/extra fields stored in their own columns
# DBLOG_ADDITIONAL_FIELDS=user_id,request_id

# Maximum stored message length ("none" disables truncation)
DBLOG_MAX_LENGTH={max_length}

# =============================================================================
# Retention Configuration
# =============================================================================

# Rows kept per channel; leave unset or 0 to disable cleanup
# DBLOG_MAX_ENTRIES=10000

# Cleanup runs on a write with chance PROBABILITY / DIVISOR
DBLOG_CLEAN_DIVISOR={divisor}
DBLOG_CLEAN_PROBABILITY={probability}

# =============================================================================
# Logging Configuration
# =============================================================================

# Default: {log_filter}
RUST_LOG={log_filter}
"#,
        db_url = DBLOG_DB_URL,
        table = DEFAULT_TABLE,
        max_length = MAX_LENGTH_DEFAULT,
        divisor = DEFAULT_CLEAN_DIVISOR,
        probability = DEFAULT_CLEAN_PROBABILITY,
        log_filter = DEFAULT_LOG_FILTER,
    )
}

fn info_message(variable: &str, message: String) -> EnvValidationError {
    EnvValidationError {
        variable: variable.to_string(),
        message,
        severity: ErrorSeverity::Info,
    }
}

fn is_disabled(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "" | "none" | "off" | "null"
    )
}

/// Helper function to parse a variable with a default value
fn parse_with_default<F, T>(
    lookup: &F,
    var_name: &str,
    default: T,
    warnings: &mut Vec<EnvValidationError>,
) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Clone + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match lookup(var_name) {
        Some(value_str) => match value_str.trim().parse::<T>() {
            Ok(value) => value,
            Err(e) => {
                warnings.push(EnvValidationError {
                    variable: var_name.to_string(),
                    message: format!(
                        "Invalid value '{}': {}. Using default: {}",
                        value_str, e, default
                    ),
                    severity: ErrorSeverity::Warning,
                });
                default
            }
        },
        None => {
            warnings.push(info_message(
                var_name,
                format!("Using default value: {}", default),
            ));
            default
        }
    }
}

/// Helper function to parse a boolean variable with a default value
fn parse_bool_with_default<F>(
    lookup: &F,
    var_name: &str,
    default: bool,
    warnings: &mut Vec<EnvValidationError>,
) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var_name) {
        Some(value_str) => match value_str.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => {
                warnings.push(EnvValidationError {
                    variable: var_name.to_string(),
                    message: format!(
                        "Invalid boolean value '{}'. Using default: {}",
                        value_str, default
                    ),
                    severity: ErrorSeverity::Warning,
                });
                default
            }
        },
        None => default,
    }
}
