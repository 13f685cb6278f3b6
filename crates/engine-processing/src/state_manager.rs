use async_trait::async_trait;
use engine_core::{error::StateStoreError, listener::StepListener, state::JobRepository};
use model::execution::step::{StepExecution, StepName};
use std::sync::Arc;
use tracing::debug;

/// Persists step records of one job execution at every checkpoint.
///
/// Each step is stored under its own key, so concurrent branch steps never
/// overwrite each other's progress.
pub struct StateManager {
    execution_id: u64,
    repository: Arc<dyn JobRepository>,
}

impl StateManager {
    pub fn new(execution_id: u64, repository: Arc<dyn JobRepository>) -> Self {
        Self {
            execution_id,
            repository,
        }
    }

    async fn save(&self, step: &StepExecution) -> Result<(), StateStoreError> {
        self.repository.save_step(self.execution_id, step).await
    }
}

#[async_trait]
impl StepListener for StateManager {
    async fn before_step(&self, step: &StepExecution) -> Result<(), StateStoreError> {
        self.save(step).await
    }

    async fn after_chunk(
        &self,
        step: &StepExecution,
        seq: u64,
        _rows: usize,
    ) -> Result<(), StateStoreError> {
        self.save(step).await?;
        debug!(
            execution_id = self.execution_id,
            step = %step.step,
            chunk = seq,
            committed = step.rows_committed(),
            "Checkpoint saved"
        );
        Ok(())
    }

    async fn on_chunk_error(
        &self,
        step: StepName,
        seq: u64,
        error: &str,
    ) -> Result<(), StateStoreError> {
        debug!(execution_id = self.execution_id, %step, chunk = seq, error, "Chunk discarded");
        Ok(())
    }

    async fn after_step(&self, step: &StepExecution) -> Result<(), StateStoreError> {
        self.save(step).await
    }
}
