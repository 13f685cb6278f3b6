use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The fixed set of steps in the migration flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StepName {
    Author,
    Genre,
    Book,
    Comment,
    Cleanup,
}

impl StepName {
    /// Flow order: branches first, then the sequential chain.
    pub const ALL: [StepName; 5] = [
        StepName::Author,
        StepName::Genre,
        StepName::Book,
        StepName::Comment,
        StepName::Cleanup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::Author => "author",
            StepName::Genre => "genre",
            StepName::Book => "book",
            StepName::Comment => "comment",
            StepName::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "author" => Ok(StepName::Author),
            "genre" => Ok(StepName::Genre),
            "book" => Ok(StepName::Book),
            "comment" => Ok(StepName::Comment),
            "cleanup" => Ok(StepName::Cleanup),
            other => Err(format!("Unknown step: {other}")),
        }
    }
}

/// `Pending -> Running -> Completed | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "PENDING",
            StepStatus::Running => "RUNNING",
            StepStatus::Completed => "COMPLETED",
            StepStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted record of one step within one job execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepExecution {
    pub step: StepName,
    pub status: StepStatus,
    /// Rows committed by an earlier attempt; replayed without being written.
    pub resume_from: u64,
    pub rows_read: u64,
    /// Rows re-read and transformed but not written while resuming.
    #[serde(default)]
    pub rows_replayed: u64,
    pub rows_written: u64,
    pub chunks_written: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub failure: Option<String>,
}

impl StepExecution {
    pub fn pending(step: StepName) -> Self {
        StepExecution {
            step,
            status: StepStatus::Pending,
            resume_from: 0,
            rows_read: 0,
            rows_replayed: 0,
            rows_written: 0,
            chunks_written: 0,
            started_at: None,
            ended_at: None,
            failure: None,
        }
    }

    /// The checkpoint: every row known to be committed in the target,
    /// including rows committed by the attempt this one resumed.
    pub fn rows_committed(&self) -> u64 {
        self.resume_from + self.rows_written
    }

    pub fn mark_running(&mut self, resume_from: u64) {
        self.status = StepStatus::Running;
        self.resume_from = resume_from;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self) {
        self.status = StepStatus::Completed;
        self.ended_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = StepStatus::Failed;
        self.failure = Some(reason.into());
        self.ended_at = Some(Utc::now());
    }
}
