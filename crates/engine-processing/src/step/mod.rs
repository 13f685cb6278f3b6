use crate::error::StepError;
use async_trait::async_trait;
use engine_core::{listener::Listeners, metrics::MetricsSnapshot};
use model::execution::step::{StepExecution, StepName, StepStatus};
use tokio_util::sync::CancellationToken;

pub mod chunk;
pub mod cleanup;

pub use chunk::ChunkStep;
pub use cleanup::CleanupStep;

/// Everything a step needs from the run it belongs to.
#[derive(Clone)]
pub struct StepContext {
    pub chunk_size: usize,
    /// Rows committed by the execution being resumed.
    pub resume_from: u64,
    pub cancel: CancellationToken,
    pub listeners: Listeners,
}

impl StepContext {
    pub fn new(chunk_size: usize, cancel: CancellationToken, listeners: Listeners) -> Self {
        StepContext {
            chunk_size: chunk_size.max(1),
            resume_from: 0,
            cancel,
            listeners,
        }
    }

    pub fn resuming_from(mut self, rows: u64) -> Self {
        self.resume_from = rows;
        self
    }
}

/// Outcome of one step run.
#[derive(Debug)]
pub struct StepResult {
    pub execution: StepExecution,
    pub metrics: MetricsSnapshot,
    pub error: Option<StepError>,
}

impl StepResult {
    /// A step that failed before it could run.
    pub fn failed_before_start(step: StepName, error: StepError) -> Self {
        let mut execution = StepExecution::pending(step);
        execution.mark_failed(error.to_string());
        StepResult {
            execution,
            metrics: MetricsSnapshot::default(),
            error: Some(error),
        }
    }

    pub fn step(&self) -> StepName {
        self.execution.step
    }

    pub fn status(&self) -> StepStatus {
        self.execution.status
    }

    /// Rows in fully committed chunks, including rows of a resumed attempt.
    pub fn rows_processed(&self) -> u64 {
        self.execution.rows_committed()
    }

    pub fn is_completed(&self) -> bool {
        self.execution.status == StepStatus::Completed
    }
}

/// A unit of work in the migration flow. Steps are single use.
#[async_trait]
pub trait Step: Send {
    fn name(&self) -> StepName;

    async fn run(self: Box<Self>, ctx: StepContext) -> StepResult;
}

pub(crate) async fn notify_before_step(
    listeners: &Listeners,
    step: &StepExecution,
) -> Result<(), StepError> {
    for listener in listeners {
        listener.before_step(step).await?;
    }
    Ok(())
}

pub(crate) async fn notify_after_step(
    listeners: &Listeners,
    step: &StepExecution,
) -> Result<(), StepError> {
    for listener in listeners {
        listener.after_step(step).await?;
    }
    Ok(())
}
