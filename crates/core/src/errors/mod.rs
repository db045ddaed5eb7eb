//! Error types and Result alias for the metrics engine

use thiserror::Error;

/// Main error type for mintwatch
#[derive(Error, Debug)]
pub enum Error {
    #[error("Provider request failed: {0}")]
    Provider(String),

    #[error("Provider rate limit exceeded")]
    RateLimited,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("No resolvable entry baseline for signal {0}")]
    MissingBaseline(i64),

    #[error("Signal not found: {0}")]
    SignalNotFound(i64),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Provider(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidData(err.to_string())
    }
}
