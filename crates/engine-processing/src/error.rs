use engine_core::error::{CacheError, ExtractionError, StateStoreError, TransformError, WriteError};
use thiserror::Error;

/// Why a step ended FAILED. Every variant is fatal to the owning step.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("Write failed: {0}")]
    Write(#[from] WriteError),

    #[error("Reference cache misuse: {0}")]
    Cache(#[from] CacheError),

    #[error("Checkpoint failed: {0}")]
    State(#[from] StateStoreError),

    #[error("Step cancelled")]
    Cancelled,

    /// The task running the step panicked or was aborted.
    #[error("Step task aborted: {0}")]
    Aborted(String),
}
