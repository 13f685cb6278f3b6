use crate::{error::StateStoreError, state::JobRepository};
use async_trait::async_trait;
use model::execution::{
    job::{JobExecution, JobParameters},
    step::StepExecution,
};
use std::path::Path;
use tracing::debug;

pub struct SledJobRepository {
    db: sled::Db,
}

impl SledJobRepository {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    #[inline]
    fn exec_key(id: u64) -> String {
        format!("exec:{id:020}")
    }

    #[inline]
    fn step_prefix(id: u64) -> String {
        format!("step:{id:020}:")
    }

    #[inline]
    fn step_key(id: u64, step: &StepExecution) -> String {
        format!("{}{}", Self::step_prefix(id), step.step)
    }

    #[inline]
    fn index_prefix(job_name: &str) -> String {
        format!("idx:{job_name}:")
    }

    fn index_key(job_name: &str, id: u64) -> String {
        format!("{}{id:020}", Self::index_prefix(job_name))
    }

    fn id_from_index_key(key: &[u8], prefix_len: usize) -> Result<u64, StateStoreError> {
        let raw = String::from_utf8_lossy(key);
        raw.get(prefix_len..)
            .and_then(|suffix| suffix.parse::<u64>().ok())
            .ok_or_else(|| StateStoreError::CorruptKey(raw.to_string()))
    }

    fn load(&self, id: u64) -> Result<Option<JobExecution>, StateStoreError> {
        let Some(bytes) = self.db.get(Self::exec_key(id))? else {
            return Ok(None);
        };
        let mut execution: JobExecution = bincode::deserialize(&bytes)?;

        // Step records are written independently and are newer than the header.
        for item in self.db.scan_prefix(Self::step_prefix(id)) {
            let (_key, value) = item?;
            let step: StepExecution = bincode::deserialize(&value)?;
            execution.put_step(step);
        }

        Ok(Some(execution))
    }
}

#[async_trait]
impl JobRepository for SledJobRepository {
    async fn create_execution(
        &self,
        job_name: &str,
        parameters: &JobParameters,
        restart_of: Option<u64>,
    ) -> Result<JobExecution, StateStoreError> {
        // generate_id starts at 0; execution ids are 1-based.
        let id = self.db.generate_id()? + 1;
        let mut execution = JobExecution::started(id, job_name, parameters.clone());
        execution.restart_of = restart_of;

        let mut batch = sled::Batch::default();
        batch.insert(
            Self::exec_key(id).as_bytes(),
            bincode::serialize(&execution)?,
        );
        for step in &execution.steps {
            batch.insert(Self::step_key(id, step).as_bytes(), bincode::serialize(step)?);
        }
        batch.insert(Self::index_key(job_name, id).as_bytes(), Vec::<u8>::new());
        self.db.apply_batch(batch)?;
        self.db.flush_async().await?;

        debug!(execution_id = id, job = job_name, "Job execution created");
        Ok(execution)
    }

    async fn update_execution(&self, execution: &JobExecution) -> Result<(), StateStoreError> {
        let mut batch = sled::Batch::default();
        batch.insert(
            Self::exec_key(execution.id).as_bytes(),
            bincode::serialize(execution)?,
        );
        for step in &execution.steps {
            batch.insert(
                Self::step_key(execution.id, step).as_bytes(),
                bincode::serialize(step)?,
            );
        }
        self.db.apply_batch(batch)?;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn save_step(
        &self,
        execution_id: u64,
        step: &StepExecution,
    ) -> Result<(), StateStoreError> {
        if !self.db.contains_key(Self::exec_key(execution_id))? {
            return Err(StateStoreError::NotFound(execution_id));
        }
        self.db.insert(
            Self::step_key(execution_id, step),
            bincode::serialize(step)?,
        )?;
        // The checkpoint must be durable before the next chunk is read.
        self.db.flush_async().await?;
        Ok(())
    }

    async fn get_execution(&self, id: u64) -> Result<Option<JobExecution>, StateStoreError> {
        self.load(id)
    }

    async fn list_executions(
        &self,
        job_name: &str,
        limit: usize,
    ) -> Result<Vec<JobExecution>, StateStoreError> {
        let prefix = Self::index_prefix(job_name);
        let mut executions = Vec::new();

        for item in self.db.scan_prefix(&prefix).rev() {
            if executions.len() >= limit {
                break;
            }
            let (key, _) = item?;
            let id = Self::id_from_index_key(&key, prefix.len())?;
            if let Some(execution) = self.load(id)? {
                executions.push(execution);
            }
        }

        Ok(executions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::execution::{
        job::JobStatus,
        step::{StepName, StepStatus},
    };
    use tempfile::tempdir;

    const JOB: &str = "migrationJob";

    #[tokio::test]
    async fn creates_started_execution_with_pending_steps() {
        let dir = tempdir().unwrap();
        let repo = SledJobRepository::open(dir.path()).unwrap();

        let exec = repo
            .create_execution(JOB, &JobParameters::new().with("startAt", "1"), None)
            .await
            .unwrap();

        let loaded = repo.get_execution(exec.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Started);
        assert_eq!(loaded.parameters.get("startAt"), Some("1"));
        assert!(loaded.steps.iter().all(|s| s.status == StepStatus::Pending));
    }

    #[tokio::test]
    async fn step_checkpoints_override_header_steps() {
        let dir = tempdir().unwrap();
        let repo = SledJobRepository::open(dir.path()).unwrap();
        let exec = repo
            .create_execution(JOB, &JobParameters::new(), None)
            .await
            .unwrap();

        let mut book = StepExecution::pending(StepName::Book);
        book.mark_running(0);
        book.rows_written = 10;
        book.chunks_written = 1;
        repo.save_step(exec.id, &book).await.unwrap();

        let loaded = repo.get_execution(exec.id).await.unwrap().unwrap();
        let step = loaded.step(StepName::Book).unwrap();
        assert_eq!(step.status, StepStatus::Running);
        assert_eq!(step.rows_committed(), 10);
    }

    #[tokio::test]
    async fn step_checkpoint_survives_reopen() {
        let dir = tempdir().unwrap();
        let id = {
            let repo = SledJobRepository::open(dir.path()).unwrap();
            let exec = repo
                .create_execution(JOB, &JobParameters::new(), None)
                .await
                .unwrap();
            let mut author = StepExecution::pending(StepName::Author);
            author.mark_running(0);
            author.rows_written = 4;
            author.chunks_written = 2;
            repo.save_step(exec.id, &author).await.unwrap();
            exec.id
        };

        let repo = SledJobRepository::open(dir.path()).unwrap();
        let loaded = repo.get_execution(id).await.unwrap().unwrap();
        let author = loaded.step(StepName::Author).unwrap();
        assert_eq!(author.status, StepStatus::Running);
        assert_eq!(author.rows_committed(), 4);
    }

    #[tokio::test]
    async fn save_step_for_unknown_execution_fails() {
        let dir = tempdir().unwrap();
        let repo = SledJobRepository::open(dir.path()).unwrap();

        let err = repo
            .save_step(42, &StepExecution::pending(StepName::Author))
            .await
            .unwrap_err();
        assert!(matches!(err, StateStoreError::NotFound(42)));
    }

    #[tokio::test]
    async fn lists_most_recent_first_per_job() {
        let dir = tempdir().unwrap();
        let repo = SledJobRepository::open(dir.path()).unwrap();

        let first = repo
            .create_execution(JOB, &JobParameters::new(), None)
            .await
            .unwrap();
        let _other = repo
            .create_execution("otherJob", &JobParameters::new(), None)
            .await
            .unwrap();
        let mut second = repo
            .create_execution(JOB, &JobParameters::new(), Some(first.id))
            .await
            .unwrap();
        second.finish(JobStatus::Completed, None, None);
        repo.update_execution(&second).await.unwrap();

        let history = repo.list_executions(JOB, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[0].status, JobStatus::Completed);
        assert_eq!(history[0].restart_of, Some(first.id));
        assert_eq!(history[1].id, first.id);

        let limited = repo.list_executions(JOB, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, second.id);
    }

    #[tokio::test]
    async fn history_survives_reopen() {
        let dir = tempdir().unwrap();
        let id = {
            let repo = SledJobRepository::open(dir.path()).unwrap();
            let mut exec = repo
                .create_execution(JOB, &JobParameters::new(), None)
                .await
                .unwrap();
            exec.finish(JobStatus::Failed, Some(StepName::Book), Some("boom".into()));
            repo.update_execution(&exec).await.unwrap();
            exec.id
        };

        let repo = SledJobRepository::open(dir.path()).unwrap();
        let loaded = repo.get_execution(id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Failed);
        assert_eq!(loaded.failed_step, Some(StepName::Book));
    }
}
