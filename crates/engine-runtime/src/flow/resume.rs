use model::execution::{job::JobExecution, step::StepName};
use std::collections::BTreeMap;

/// Rows each step has already committed, taken from a failed execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumePlan {
    committed: BTreeMap<StepName, u64>,
}

impl ResumePlan {
    pub fn from_execution(execution: &JobExecution) -> Self {
        let committed = execution
            .steps
            .iter()
            .filter(|s| s.step != StepName::Cleanup)
            .map(|s| (s.step, s.rows_committed()))
            .filter(|(_, rows)| *rows > 0)
            .collect();
        ResumePlan { committed }
    }

    pub fn resume_from(&self, step: StepName) -> u64 {
        self.committed.get(&step).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    /// Stamps the resume points onto step records that have not run yet.
    pub fn apply_to(&self, execution: &mut JobExecution) {
        for step in &mut execution.steps {
            step.resume_from = self.resume_from(step.step);
        }
    }
}
