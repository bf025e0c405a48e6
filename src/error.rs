use thiserror::Error;

/// Errors raised while configuring the sink.
///
/// Storage failures are not wrapped here; they reach the caller as the
/// store's own error type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("clean divisor must be greater than zero")]
    ZeroCleanDivisor,

    #[error("unknown log level '{0}'")]
    UnknownLevel(String),
}
