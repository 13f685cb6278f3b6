use crate::flow::resume::ResumePlan;
use engine_processing::{
    error::StepError,
    step::{Step, StepContext, StepResult},
};
use model::execution::{
    job::JobStatus,
    step::{StepName, StepStatus},
};
use std::time::Instant;
use tracing::{error, info};

/// Steps with no dependency on each other; run concurrently.
pub const BRANCHES: [StepName; 2] = [StepName::Author, StepName::Genre];

/// Steps run one after another once every branch completed.
pub const CHAIN: [StepName; 3] = [StepName::Book, StepName::Comment, StepName::Cleanup];

/// Builds steps on demand. A step is built right before it runs, so a
/// dependent step only acquires its inputs after the join barrier.
pub trait StepProvider: Send + Sync {
    fn build(&self, step: StepName) -> Result<Box<dyn Step>, StepError>;

    /// Called once, after both branches completed and before the first
    /// chained step is built.
    fn branches_joined(&self) {}
}

/// Outcome of one pass through the flow.
#[derive(Debug)]
pub struct JobResult {
    pub status: JobStatus,
    /// Results of the steps that ran, in flow order.
    pub steps: Vec<StepResult>,
}

impl JobResult {
    fn from_steps(steps: Vec<StepResult>) -> Self {
        let status = if steps.iter().any(|s| s.status() == StepStatus::Failed) {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };
        JobResult { status, steps }
    }

    fn failed(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.status() == StepStatus::Failed)
    }

    /// First failed step in flow order.
    pub fn failed_step(&self) -> Option<StepName> {
        self.failed().map(StepResult::step)
    }

    pub fn error(&self) -> Option<&StepError> {
        self.failed().and_then(|s| s.error.as_ref())
    }

    pub fn step(&self, name: StepName) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.step() == name)
    }
}

/// Runs the fixed dependency graph: `{Author, Genre}` concurrently, then
/// `Book -> Comment -> Cleanup`. The first failure stops the flow; steps
/// after it never start.
pub struct FlowController {
    base: StepContext,
    plan: ResumePlan,
}

impl FlowController {
    pub fn new(base: StepContext) -> Self {
        FlowController {
            base,
            plan: ResumePlan::default(),
        }
    }

    pub fn with_resume(mut self, plan: ResumePlan) -> Self {
        self.plan = plan;
        self
    }

    fn context_for(&self, step: StepName) -> StepContext {
        self.base
            .clone()
            .resuming_from(self.plan.resume_from(step))
    }

    fn not_started(&self, step: StepName, err: StepError) -> StepResult {
        let mut result = StepResult::failed_before_start(step, err);
        result.execution.resume_from = self.plan.resume_from(step);
        result
    }

    pub async fn run_flow(&self, provider: &dyn StepProvider) -> JobResult {
        let started = Instant::now();
        let mut results = self.run_branches(provider).await;

        if results.iter().all(StepResult::is_completed) {
            provider.branches_joined();
            info!("Branches joined, starting dependent steps");

            for name in CHAIN {
                let result = match provider.build(name) {
                    Ok(step) => step.run(self.context_for(name)).await,
                    Err(err) => self.not_started(name, err),
                };
                let completed = result.is_completed();
                results.push(result);
                if !completed {
                    break;
                }
            }
        }

        let result = JobResult::from_steps(results);
        match result.failed_step() {
            None => info!(
                duration_ms = started.elapsed().as_millis() as u64,
                "Flow completed"
            ),
            Some(step) => error!(
                %step,
                error = %result.error().map(ToString::to_string).unwrap_or_default(),
                "Flow failed, downstream steps skipped"
            ),
        }
        result
    }

    /// Spawns every branch and waits for all of them, even when one fails
    /// early. Results come back in branch order.
    async fn run_branches(&self, provider: &dyn StepProvider) -> Vec<StepResult> {
        let mut results = Vec::with_capacity(BRANCHES.len());
        let mut handles = Vec::with_capacity(BRANCHES.len());

        for name in BRANCHES {
            match provider.build(name) {
                Ok(step) => {
                    let ctx = self.context_for(name);
                    handles.push((name, tokio::spawn(step.run(ctx))));
                }
                Err(err) => results.push(self.not_started(name, err)),
            }
        }

        for (name, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => self.not_started(name, StepError::Aborted(join_err.to_string())),
            };
            results.push(result);
        }

        results.sort_by_key(StepResult::step);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use engine_core::metrics::MetricsSnapshot;
    use model::execution::step::StepExecution;
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };
    use tokio::sync::Barrier;
    use tokio_util::sync::CancellationToken;

    type Trace = Arc<Mutex<Vec<String>>>;

    struct FakeStep {
        name: StepName,
        fail: bool,
        delay_ms: u64,
        barrier: Option<Arc<Barrier>>,
        trace: Trace,
    }

    #[async_trait]
    impl Step for FakeStep {
        fn name(&self) -> StepName {
            self.name
        }

        async fn run(self: Box<Self>, ctx: StepContext) -> StepResult {
            self.trace.lock().unwrap().push(format!("start:{}", self.name));
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;

            let mut execution = StepExecution::pending(self.name);
            execution.mark_running(ctx.resume_from);
            let error = if self.fail {
                execution.mark_failed("boom");
                Some(StepError::Cancelled)
            } else {
                execution.mark_completed();
                None
            };
            self.trace.lock().unwrap().push(format!("end:{}", self.name));
            StepResult {
                execution,
                metrics: MetricsSnapshot::default(),
                error,
            }
        }
    }

    struct FakeProvider {
        failing: Vec<StepName>,
        slow: Option<StepName>,
        barrier: Option<Arc<Barrier>>,
        trace: Trace,
    }

    impl FakeProvider {
        fn new(failing: Vec<StepName>) -> Self {
            FakeProvider {
                failing,
                slow: None,
                barrier: None,
                trace: Arc::default(),
            }
        }

        fn trace(&self) -> Vec<String> {
            self.trace.lock().unwrap().clone()
        }
    }

    impl StepProvider for FakeProvider {
        fn build(&self, step: StepName) -> Result<Box<dyn Step>, StepError> {
            Ok(Box::new(FakeStep {
                name: step,
                fail: self.failing.contains(&step),
                delay_ms: if self.slow == Some(step) { 50 } else { 0 },
                barrier: self.barrier.clone().filter(|_| BRANCHES.contains(&step)),
                trace: self.trace.clone(),
            }))
        }

        fn branches_joined(&self) {
            self.trace.lock().unwrap().push("joined".to_string());
        }
    }

    fn controller() -> FlowController {
        FlowController::new(StepContext::new(10, CancellationToken::new(), vec![]))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn branches_run_concurrently() {
        // Each branch waits for the other; a sequential scheduler would hang.
        let mut provider = FakeProvider::new(vec![]);
        provider.barrier = Some(Arc::new(Barrier::new(2)));

        let result = tokio::time::timeout(Duration::from_secs(5), controller().run_flow(&provider))
            .await
            .expect("branches did not run concurrently");

        assert_eq!(result.status, JobStatus::Completed);
        assert_eq!(result.steps.len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn book_waits_for_the_slower_branch() {
        let mut provider = FakeProvider::new(vec![]);
        provider.slow = Some(StepName::Author);

        controller().run_flow(&provider).await;

        let trace = provider.trace();
        let pos = |e: &str| trace.iter().position(|t| t == e).unwrap();
        assert!(pos("end:author") < pos("joined"));
        assert!(pos("end:genre") < pos("joined"));
        assert!(pos("joined") < pos("start:book"));
        assert!(pos("end:book") < pos("start:comment"));
        assert!(pos("end:comment") < pos("start:cleanup"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_branch_skips_everything_downstream() {
        let provider = FakeProvider::new(vec![StepName::Genre]);

        let result = controller().run_flow(&provider).await;

        assert_eq!(result.status, JobStatus::Failed);
        assert_eq!(result.failed_step(), Some(StepName::Genre));
        assert!(result.step(StepName::Author).unwrap().is_completed());
        assert!(result.step(StepName::Book).is_none());
        assert!(!provider.trace().contains(&"joined".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn both_branches_failing_reports_author_first() {
        let provider = FakeProvider::new(vec![StepName::Genre, StepName::Author]);
        let result = controller().run_flow(&provider).await;
        assert_eq!(result.failed_step(), Some(StepName::Author));
        assert_eq!(result.steps.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn chain_stops_at_first_failure_without_cleanup() {
        let provider = FakeProvider::new(vec![StepName::Book]);

        let result = controller().run_flow(&provider).await;

        assert_eq!(result.failed_step(), Some(StepName::Book));
        assert!(result.step(StepName::Comment).is_none());
        assert!(result.step(StepName::Cleanup).is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn resume_points_reach_the_steps() {
        let mut failed = model::execution::job::JobExecution::started(
            1,
            "migrationJob",
            model::execution::job::JobParameters::new(),
        );
        for step in &mut failed.steps {
            if step.step == StepName::Comment {
                step.rows_written = 4;
            }
        }

        let provider = FakeProvider::new(vec![]);
        let result = controller()
            .with_resume(ResumePlan::from_execution(&failed))
            .run_flow(&provider)
            .await;

        let comment = result.step(StepName::Comment).unwrap();
        assert_eq!(comment.execution.resume_from, 4);
        assert_eq!(result.step(StepName::Book).unwrap().execution.resume_from, 0);
    }
}
