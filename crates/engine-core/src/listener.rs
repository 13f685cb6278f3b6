use crate::error::StateStoreError;
use async_trait::async_trait;
use model::execution::step::{StepExecution, StepName, StepStatus};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Hooks the step engine calls explicitly at each lifecycle transition.
///
/// An error returned by a listener fails the step.
#[async_trait]
pub trait StepListener: Send + Sync {
    async fn before_step(&self, _step: &StepExecution) -> Result<(), StateStoreError> {
        Ok(())
    }

    async fn before_chunk(&self, _step: StepName, _seq: u64) -> Result<(), StateStoreError> {
        Ok(())
    }

    /// Called after a chunk was committed; `step` carries updated counters.
    async fn after_chunk(
        &self,
        _step: &StepExecution,
        _seq: u64,
        _rows: usize,
    ) -> Result<(), StateStoreError> {
        Ok(())
    }

    async fn on_chunk_error(
        &self,
        _step: StepName,
        _seq: u64,
        _error: &str,
    ) -> Result<(), StateStoreError> {
        Ok(())
    }

    async fn after_step(&self, _step: &StepExecution) -> Result<(), StateStoreError> {
        Ok(())
    }
}

pub type Listeners = Vec<Arc<dyn StepListener>>;

/// Logs chunk boundaries of every step.
pub struct LoggingListener;

#[async_trait]
impl StepListener for LoggingListener {
    async fn before_step(&self, step: &StepExecution) -> Result<(), StateStoreError> {
        info!(step = %step.step, resume_from = step.resume_from, "Step started");
        Ok(())
    }

    async fn before_chunk(&self, step: StepName, seq: u64) -> Result<(), StateStoreError> {
        info!(step = %step, chunk = seq, "Chunk started");
        Ok(())
    }

    async fn after_chunk(
        &self,
        step: &StepExecution,
        seq: u64,
        rows: usize,
    ) -> Result<(), StateStoreError> {
        info!(
            step = %step.step,
            chunk = seq,
            rows,
            committed = step.rows_committed(),
            "Chunk committed"
        );
        Ok(())
    }

    async fn on_chunk_error(
        &self,
        step: StepName,
        seq: u64,
        error: &str,
    ) -> Result<(), StateStoreError> {
        warn!(step = %step, chunk = seq, error, "Chunk failed");
        Ok(())
    }

    async fn after_step(&self, step: &StepExecution) -> Result<(), StateStoreError> {
        match step.status {
            StepStatus::Failed => error!(
                step = %step.step,
                committed = step.rows_committed(),
                failure = step.failure.as_deref().unwrap_or("unknown"),
                "Step failed"
            ),
            _ => info!(
                step = %step.step,
                rows_read = step.rows_read,
                committed = step.rows_committed(),
                chunks = step.chunks_written,
                "Step completed"
            ),
        }
        Ok(())
    }
}
