use crate::error::StateStoreError;
use async_trait::async_trait;
use model::execution::{
    job::{JobExecution, JobParameters},
    step::StepExecution,
};

pub mod sled_store;

/// Durable history of job executions.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Creates a STARTED execution with every step PENDING and assigns its id.
    async fn create_execution(
        &self,
        job_name: &str,
        parameters: &JobParameters,
        restart_of: Option<u64>,
    ) -> Result<JobExecution, StateStoreError>;

    /// Stores the execution header together with all of its steps.
    async fn update_execution(&self, execution: &JobExecution) -> Result<(), StateStoreError>;

    /// Stores a single step record; called at every step checkpoint.
    async fn save_step(
        &self,
        execution_id: u64,
        step: &StepExecution,
    ) -> Result<(), StateStoreError>;

    async fn get_execution(&self, id: u64) -> Result<Option<JobExecution>, StateStoreError>;

    /// Most recent first.
    async fn list_executions(
        &self,
        job_name: &str,
        limit: usize,
    ) -> Result<Vec<JobExecution>, StateStoreError>;
}
