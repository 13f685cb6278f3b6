use connectors::error::ConnectorError;
use engine_config::settings::error::SettingsError;
use engine_core::error::StateStoreError;
use model::execution::job::JobStatus;
use thiserror::Error;

/// Top-level errors of the migration runtime. A FAILED run is not an error:
/// it is reported through the returned job execution.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Job history could not be read or written.
    #[error("Job repository error: {0}")]
    State(#[from] StateStoreError),

    /// Setting error.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Source or target store could not be opened.
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// There is no execution of the job to restart.
    #[error("No execution of job '{job_name}' to restart")]
    NothingToRestart { job_name: String },

    /// The most recent execution did not fail.
    #[error("Execution {id} of job '{job_name}' is {status}; only a FAILED execution can be restarted")]
    NotRestartable {
        id: u64,
        job_name: String,
        status: JobStatus,
    },
}
