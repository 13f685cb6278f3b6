use engine_core::error::{ExtractionError, WriteError};
use thiserror::Error;

/// Errors raised while opening or talking to a source or target store.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The connection string could not be parsed.
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    /// PostgreSQL driver error.
    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// TLS setup failed.
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    /// Fixture file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fixture file is not valid JSON for the expected tables.
    #[error("Invalid fixture: {0}")]
    Fixture(#[from] serde_json::Error),

    /// Embedded document store error.
    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),
}

impl From<ConnectorError> for ExtractionError {
    fn from(err: ConnectorError) -> Self {
        ExtractionError::Io(err.to_string())
    }
}

impl From<ConnectorError> for WriteError {
    fn from(err: ConnectorError) -> Self {
        WriteError::Io(err.to_string())
    }
}
