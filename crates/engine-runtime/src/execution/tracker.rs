use crate::{
    error::MigrationError,
    execution::factory::MigrationSteps,
    flow::{FlowController, ResumePlan},
};
use engine_config::settings::MigrationSettings;
use engine_core::{
    connectors::{destination::TargetStore, source::SourceStore},
    listener::{Listeners, LoggingListener, StepListener},
    state::JobRepository,
};
use engine_processing::{error::StepError, state_manager::StateManager, step::StepContext};
use model::execution::job::{JobExecution, JobParameters, JobStatus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Runs the migration job and keeps its execution history.
pub struct JobExecutionTracker {
    repository: Arc<dyn JobRepository>,
    source: Arc<dyn SourceStore>,
    target: Arc<dyn TargetStore>,
    settings: MigrationSettings,
    cancel: CancellationToken,
    listeners: Listeners,
}

impl JobExecutionTracker {
    pub fn new(
        repository: Arc<dyn JobRepository>,
        source: Arc<dyn SourceStore>,
        target: Arc<dyn TargetStore>,
        settings: MigrationSettings,
    ) -> Self {
        JobExecutionTracker {
            repository,
            source,
            target,
            settings,
            cancel: CancellationToken::new(),
            listeners: Vec::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Adds a listener notified by every step of every run.
    pub fn with_listener(mut self, listener: Arc<dyn StepListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn settings(&self) -> &MigrationSettings {
        &self.settings
    }

    /// Runs the flow once under the configured job name and returns the
    /// finished execution record. A failed run is `Ok` with status FAILED.
    pub async fn start(&self, parameters: JobParameters) -> Result<JobExecution, MigrationError> {
        self.launch(&self.settings.job_name, parameters, None).await
    }

    /// Most recent first.
    pub async fn history(
        &self,
        job_name: &str,
        limit: usize,
    ) -> Result<Vec<JobExecution>, MigrationError> {
        Ok(self.repository.list_executions(job_name, limit).await?)
    }

    /// Resubmits the parameters of the most recent execution of `job_name`
    /// if it FAILED. Steps resume after the rows their failed attempt
    /// committed.
    pub async fn restart_last(&self, job_name: &str) -> Result<JobExecution, MigrationError> {
        let latest = self
            .repository
            .list_executions(job_name, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MigrationError::NothingToRestart {
                job_name: job_name.to_string(),
            })?;

        if latest.status != JobStatus::Failed {
            return Err(MigrationError::NotRestartable {
                id: latest.id,
                job_name: job_name.to_string(),
                status: latest.status,
            });
        }

        info!(
            execution_id = latest.id,
            failed_step = ?latest.failed_step,
            parameters = %latest.parameters,
            "Restarting failed execution"
        );
        self.launch(&latest.job_name, latest.parameters.clone(), Some(&latest))
            .await
    }

    async fn launch(
        &self,
        job_name: &str,
        parameters: JobParameters,
        resume: Option<&JobExecution>,
    ) -> Result<JobExecution, MigrationError> {
        let plan = resume.map(ResumePlan::from_execution).unwrap_or_default();

        let mut execution = self
            .repository
            .create_execution(job_name, &parameters, resume.map(|e| e.id))
            .await?;
        if !plan.is_empty() {
            plan.apply_to(&mut execution);
            self.repository.update_execution(&execution).await?;
        }

        info!(
            execution_id = execution.id,
            job = job_name,
            %parameters,
            source = %self.source.describe(),
            target = %self.target.describe(),
            chunk_size = self.settings.chunk_size,
            "Job started"
        );

        let mut listeners: Listeners = vec![
            Arc::new(LoggingListener),
            Arc::new(StateManager::new(execution.id, self.repository.clone())),
        ];
        listeners.extend(self.listeners.iter().cloned());

        let steps = MigrationSteps::new(
            self.source.clone(),
            self.target.clone(),
            self.settings.write_mode,
        );
        let ctx = StepContext::new(self.settings.chunk_size, self.cancel.clone(), listeners);
        let result = FlowController::new(ctx)
            .with_resume(plan)
            .run_flow(&steps)
            .await;

        let checkpoints = if result
            .steps
            .iter()
            .any(|s| matches!(s.error, Some(StepError::Aborted(_))))
        {
            self.repository.get_execution(execution.id).await?
        } else {
            None
        };
        for step in &result.steps {
            let record = match (&step.error, &checkpoints) {
                // An aborted task reports no counters; the last checkpoint
                // still knows what it committed.
                (Some(err @ StepError::Aborted(_)), Some(saved)) => saved
                    .step(step.step())
                    .cloned()
                    .map(|mut record| {
                        record.mark_failed(err.to_string());
                        record
                    })
                    .unwrap_or_else(|| step.execution.clone()),
                _ => step.execution.clone(),
            };
            execution.put_step(record);
        }
        execution.finish(
            result.status,
            result.failed_step(),
            result.error().map(ToString::to_string),
        );
        self.repository.update_execution(&execution).await?;

        match execution.status {
            JobStatus::Completed => info!(execution_id = execution.id, "Job completed"),
            status => warn!(
                execution_id = execution.id,
                %status,
                failed_step = ?execution.failed_step,
                "Job did not complete"
            ),
        }
        Ok(execution)
    }
}
