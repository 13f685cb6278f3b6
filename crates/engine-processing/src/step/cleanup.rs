use crate::{
    error::StepError,
    step::{Step, StepContext, StepResult, notify_after_step, notify_before_step},
};
use async_trait::async_trait;
use engine_core::{cache::ReferenceCache, metrics::MetricsSnapshot};
use model::execution::step::{StepExecution, StepName};
use tracing::info;

/// Terminal tasklet: drops every entry of the run's reference cache.
pub struct CleanupStep<V> {
    cache: ReferenceCache<V>,
}

impl<V: Clone + Send + Sync + 'static> CleanupStep<V> {
    pub fn new(cache: ReferenceCache<V>) -> Self {
        CleanupStep { cache }
    }
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> Step for CleanupStep<V> {
    fn name(&self) -> StepName {
        StepName::Cleanup
    }

    async fn run(self: Box<Self>, ctx: StepContext) -> StepResult {
        let mut exec = StepExecution::pending(StepName::Cleanup);
        exec.mark_running(0);

        let mut outcome = notify_before_step(&ctx.listeners, &exec).await;
        if outcome.is_ok() && ctx.cancel.is_cancelled() {
            outcome = Err(StepError::Cancelled);
        }
        if outcome.is_ok() {
            let dropped = self.cache.len();
            self.cache.clear();
            info!(entries = dropped, "Reference cache cleared");
            exec.mark_completed();
        }
        if let Err(err) = &outcome {
            exec.mark_failed(err.to_string());
        }

        if let Err(err) = notify_after_step(&ctx.listeners, &exec).await {
            if outcome.is_ok() {
                exec.mark_failed(err.to_string());
                outcome = Err(err);
            }
        }

        StepResult {
            execution: exec,
            metrics: MetricsSnapshot::default(),
            error: outcome.err(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn clears_the_cache() {
        let cache: ReferenceCache<String> = ReferenceCache::new();
        cache.populator().unwrap().insert(1, "G1".into()).unwrap();
        cache.seal();

        let result = Box::new(CleanupStep::new(cache.clone()))
            .run(StepContext::new(10, CancellationToken::new(), vec![]))
            .await;

        assert!(result.is_completed());
        assert!(cache.is_empty());
        assert!(cache.is_sealed());
    }
}
