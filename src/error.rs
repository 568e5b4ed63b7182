use std::io;
use std::result::Result as StdResult;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Upstream API error: {0}")]
    Upstream(String),
    #[error("Upstream returned invalid data: {0}")]
    InvalidData(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
    #[error("Storage not configured")]
    StorageNotConfigured,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidData(err.to_string())
    }
}

pub type Result<T> = StdResult<T, Error>;
