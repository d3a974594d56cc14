//! Error types for store and engine operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("account not found: {0}")]
    EntityNotFound(i64),

    /// An accessor was called before its initializer.
    #[error("precondition failed: {0}")]
    Precondition(&'static str),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
