use connectors::error::ConnectorError;
use engine_config::settings::error::SettingsError;
use engine_core::error::StateStoreError;
use engine_runtime::error::MigrationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to run the migration: {0}")]
    Runner(#[from] MigrationError),

    #[error("Connection failed: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Failed to open job state: {0}")]
    State(#[from] StateStoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
