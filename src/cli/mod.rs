//! # CLI Module
//!
//! Command-line maintenance tool for a dblog table. Every command runs
//! through the same handler and store the library exposes, configured from
//! the environment (see [`crate::config`]).
//!
//! ## Commands
//!
//! - `init`: Create the log table and its indexes, plus any extra columns
//! - `write`: Write one record through the handler, cleanup included
//! - `count`: Print the number of stored rows for a channel
//! - `clear`: Remove every stored row of a channel
//! - `env-example`: Print an example `.env` file
//!
//! ## Usage Example
//!
//! ```bash
//! # Create the table with a column for user ids
//! DBLOG_ADDITIONAL_FIELDS=user_id dblog init
//!
//! # Write a record, promoting user_id out of the context
//! dblog write --channel app --level error --message "Payment failed" \
//!   --context '{"user_id": 42, "order": "A-17"}'
//!
//! # Inspect and reset the channel
//! dblog count --channel app
//! dblog clear --channel app
//! ```

use clap::{Parser, Subcommand};
use std::error::Error;
use tracing::info;

use crate::config::{AppConfig, generate_env_example};
use crate::database::{connect_with_file_creation, ensure_log_table};
use crate::handler::RecordSink;
use crate::record::{Fields, Level, LogRecord};
use crate::store::SqliteStore;

///////////////////////////////////////////////////////////////////////////////
//****                         Public Structs                            ****//
///////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Parser)]
#[command(name = "dblog")]
#[command(about = "Maintain a database log table")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

///////////////////////////////////////////////////////////////////////////////
//****                          Public Types                             ****//
///////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the log table, its indexes and any additional field columns
    #[command(name = "init")]
    Init {
        #[arg(long = "column", help = "Extra column to add (repeatable)")]
        columns: Vec<String>,
    },
    /// Write one record to the log table
    #[command(name = "write")]
    Write {
        #[arg(long)]
        channel: String,
        #[arg(long, default_value = "info")]
        level: String,
        #[arg(long)]
        message: String,
        #[arg(long, help = "Context as a JSON object")]
        context: Option<String>,
        #[arg(long, help = "Extra data as a JSON object")]
        extra: Option<String>,
    },
    /// Count the stored entries of a channel
    #[command(name = "count")]
    Count {
        #[arg(long)]
        channel: String,
    },
    /// Delete every stored entry of a channel
    #[command(name = "clear")]
    Clear {
        #[arg(long)]
        channel: String,
    },
    /// Print an example environment file
    #[command(name = "env-example")]
    EnvExample,
}

///////////////////////////////////////////////////////////////////////////////
//****                       Public Functions                            ****//
///////////////////////////////////////////////////////////////////////////////

pub async fn parse_cli_commands(config: &AppConfig) -> Result<(), Box<dyn Error>> {
    // Parse CLI commands
    let cli = Cli::parse();
    run_command(cli.command, config).await
}

/// Execute one parsed command against the configured database
pub async fn run_command(command: Commands, config: &AppConfig) -> Result<(), Box<dyn Error>> {
    if let Commands::EnvExample = command {
        print!("{}", generate_env_example());
        return Ok(());
    }

    let pool = connect_with_file_creation(&config.database_url).await?;

    match command {
        Commands::Init { columns } => {
            let mut all_columns = config.additional_fields.clone();
            all_columns.extend(columns);
            ensure_log_table(&pool, &config.table, &all_columns).await?;
            println!(
                "Initialized table {} in {}",
                config.table, config.database_url
            );
        }
        Commands::Write {
            channel,
            level,
            message,
            context,
            extra,
        } => {
            ensure_log_table(&pool, &config.table, &config.additional_fields).await?;

            let level: Level = level.parse()?;
            let mut record = LogRecord::new(&channel, level, message);
            if let Some(context) = context {
                record.context = parse_fields("context", &context)?;
            }
            if let Some(extra) = extra {
                record.extra = parse_fields("extra", &extra)?;
            }

            let handler = config.handler(SqliteStore::new(pool.clone()))?;
            if handler.is_handling(level) {
                handler.handle(record).await?;
                info!("Wrote {} record to channel {}", level, channel);
                println!("Wrote {} record to channel {}", level, channel);
            } else {
                println!(
                    "Skipped {} ({}) record: below the minimum level {} ({})",
                    level,
                    level.code(),
                    config.level,
                    config.level.code()
                );
            }
        }
        Commands::Count { channel } => {
            ensure_log_table(&pool, &config.table, &config.additional_fields).await?;
            let handler = config.handler(SqliteStore::new(pool.clone()))?;
            let count = handler.channel_entries_count(&channel).await?;
            println!("{}", count);
        }
        Commands::Clear { channel } => {
            ensure_log_table(&pool, &config.table, &config.additional_fields).await?;
            let handler = config.handler(SqliteStore::new(pool.clone()))?;
            let deleted = handler.clear(&channel).await?;
            println!("Removed {} entries from channel {}", deleted, channel);
        }
        Commands::EnvExample => {}
    }

    pool.close().await;
    Ok(())
}

///////////////////////////////////////////////////////////////////////////////
//****                       Private Functions                           ****//
///////////////////////////////////////////////////////////////////////////////

/// Parse a JSON object given on the command line
fn parse_fields(name: &str, json: &str) -> Result<Fields, Box<dyn Error>> {
    match serde_json::from_str::<serde_json::Value>(json)? {
        serde_json::Value::Object(fields) => Ok(fields),
        other => Err(format!("--{} must be a JSON object, got {}", name, other).into()),
    }
}

///////////////////////////////////////////////////////////////////////////////
//****                              Tests                                ****//
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validate_with;
    use serde_json::json;

    fn test_config(database_url: &str) -> AppConfig {
        let database_url = database_url.to_string();
        validate_with(move |name| match name {
            "DBLOG_DB_URL" => Some(database_url.clone()),
            "DBLOG_ADDITIONAL_FIELDS" => Some("user_id".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn test_parse_write_command() {
        let cli = Cli::try_parse_from([
            "dblog",
            "write",
            "--channel",
            "app",
            "--level",
            "error",
            "--message",
            "boom",
            "--context",
            r#"{"user_id":1}"#,
        ])
        .unwrap();

        match cli.command {
            Commands::Write {
                channel,
                level,
                message,
                context,
                extra,
            } => {
                assert_eq!(channel, "app");
                assert_eq!(level, "error");
                assert_eq!(message, "boom");
                assert_eq!(context.as_deref(), Some(r#"{"user_id":1}"#));
                assert!(extra.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_repeated_init_columns() {
        let cli =
            Cli::try_parse_from(["dblog", "init", "--column", "ip", "--column", "user_id"]).unwrap();
        match cli.command {
            Commands::Init { columns } => assert_eq!(columns, vec!["ip", "user_id"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_write_requires_channel() {
        assert!(Cli::try_parse_from(["dblog", "write", "--message", "m"]).is_err());
    }

    #[test]
    fn test_parse_fields() {
        let fields = parse_fields("context", r#"{"b":1,"a":[2]}"#).unwrap();
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(fields["a"], json!([2]));

        assert!(parse_fields("context", "[1,2]").is_err());
        assert!(parse_fields("extra", "not json").is_err());
    }

    #[tokio::test]
    async fn test_run_write_count_clear() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("cli.db").display());
        let config = test_config(&url);

        for message in ["first", "second"] {
            run_command(
                Commands::Write {
                    channel: "app".to_string(),
                    level: "warning".to_string(),
                    message: message.to_string(),
                    context: Some(r#"{"user_id":7}"#.to_string()),
                    extra: None,
                },
                &config,
            )
            .await
            .unwrap();
        }

        let pool = connect_with_file_creation(&url).await.unwrap();
        let user_ids: Vec<i64> = sqlx::query_scalar("SELECT user_id FROM log ORDER BY log_entry_id")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(user_ids, vec![7, 7]);

        let handler = config.handler(SqliteStore::new(pool.clone())).unwrap();
        assert_eq!(handler.channel_entries_count("app").await.unwrap(), 2);

        run_command(
            Commands::Clear {
                channel: "app".to_string(),
            },
            &config,
        )
        .await
        .unwrap();
        assert_eq!(handler.channel_entries_count("app").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_write_rejects_unknown_level() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("cli.db").display());
        let config = test_config(&url);

        let result = run_command(
            Commands::Write {
                channel: "app".to_string(),
                level: "loud".to_string(),
                message: "m".to_string(),
                context: None,
                extra: None,
            },
            &config,
        )
        .await;
        assert!(result.is_err());
    }
}
