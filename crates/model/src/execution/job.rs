use crate::execution::step::{StepExecution, StepName, StepStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Key of the wall-clock token stamped on every fresh submission.
pub const START_TOKEN: &str = "startAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Started,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Started => "STARTED",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters a run was submitted with. Restart resubmits them verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParameters(BTreeMap<String, String>);

impl JobParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh parameters carrying the submission time in epoch millis.
    pub fn stamped(at: DateTime<Utc>) -> Self {
        Self::new().with(START_TOKEN, at.timestamp_millis().to_string())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl fmt::Display for JobParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// One attempt to run the whole migration flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobExecution {
    pub id: u64,
    pub job_name: String,
    pub parameters: JobParameters,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepExecution>,
    pub failed_step: Option<StepName>,
    pub failure: Option<String>,
    /// Id of the failed execution this one resumed, if any.
    pub restart_of: Option<u64>,
}

impl JobExecution {
    pub fn started(id: u64, job_name: &str, parameters: JobParameters) -> Self {
        JobExecution {
            id,
            job_name: job_name.to_string(),
            parameters,
            status: JobStatus::Started,
            started_at: Utc::now(),
            ended_at: None,
            steps: StepName::ALL
                .iter()
                .map(|s| StepExecution::pending(*s))
                .collect(),
            failed_step: None,
            failure: None,
            restart_of: None,
        }
    }

    pub fn step(&self, name: StepName) -> Option<&StepExecution> {
        self.steps.iter().find(|s| s.step == name)
    }

    pub fn step_status(&self, name: StepName) -> StepStatus {
        self.step(name)
            .map(|s| s.status)
            .unwrap_or(StepStatus::Pending)
    }

    /// Replaces the stored record for `step.step`, keeping flow order.
    pub fn put_step(&mut self, step: StepExecution) {
        match self.steps.iter_mut().find(|s| s.step == step.step) {
            Some(existing) => *existing = step,
            None => {
                self.steps.push(step);
                self.steps.sort_by_key(|s| s.step);
            }
        }
    }

    pub fn finish(&mut self, status: JobStatus, failed_step: Option<StepName>, failure: Option<String>) {
        self.status = status;
        self.failed_step = failed_step;
        self.failure = failure;
        self.ended_at = Some(Utc::now());
    }
}
