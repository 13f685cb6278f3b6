use crate::{
    error::StepError,
    step::{Step, StepContext, StepResult, notify_after_step, notify_before_step},
};
use async_trait::async_trait;
use engine_core::{
    connectors::{destination::Writer, source::BoxExtractor},
    error::ExtractionError,
    metrics::Metrics,
    processor::Processor,
};
use futures::{FutureExt, future::BoxFuture};
use model::{
    execution::step::{StepExecution, StepName},
    records::{chunk::Chunk, source::SourceRow},
};
use std::time::Instant;
use tracing::{info, warn};

/// Opens the extractor when the step starts.
pub type OpenExtractor<S> =
    Box<dyn FnOnce() -> BoxFuture<'static, Result<BoxExtractor<S>, ExtractionError>> + Send>;

/// Read, transform and write one entity type in fixed-size chunks.
///
/// At most `chunk_size` transformed rows are held at a time. A chunk is
/// handed to the writer as one batch; the step's committed row count only
/// moves after the writer returns. When resuming, the first `resume_from`
/// rows are run through the processor but not written.
pub struct ChunkStep<S, T> {
    name: StepName,
    open: OpenExtractor<S>,
    processor: Box<dyn Processor<S, T>>,
    writer: Box<dyn Writer<T>>,
    metrics: Metrics,
}

impl<S, T> ChunkStep<S, T>
where
    S: SourceRow,
    T: Send + Sync + 'static,
{
    pub fn new(
        name: StepName,
        open: OpenExtractor<S>,
        processor: Box<dyn Processor<S, T>>,
        writer: Box<dyn Writer<T>>,
    ) -> Self {
        ChunkStep {
            name,
            open,
            processor,
            writer,
            metrics: Metrics::new(),
        }
    }

    /// Step over an extractor that is already open.
    pub fn with_extractor(
        name: StepName,
        extractor: BoxExtractor<S>,
        processor: Box<dyn Processor<S, T>>,
        writer: Box<dyn Writer<T>>,
    ) -> Self {
        Self::new(
            name,
            Box::new(move || async move { Ok::<_, ExtractionError>(extractor) }.boxed()),
            processor,
            writer,
        )
    }

    async fn execute(
        self,
        exec: &mut StepExecution,
        ctx: &StepContext,
    ) -> Result<(), StepError> {
        let ChunkStep {
            name,
            open,
            processor,
            writer,
            metrics,
        } = self;

        let mut extractor = open().await?;
        let mut replay_left = ctx.resume_from;
        let mut last_key: Option<i64> = None;
        let mut seq: u64 = 0;

        loop {
            if ctx.cancel.is_cancelled() {
                return Err(StepError::Cancelled);
            }

            let mut chunk = Chunk::with_capacity(ctx.chunk_size);
            let mut exhausted = false;

            let filled = async {
                while chunk.len() < ctx.chunk_size {
                    let Some(row) = extractor.next().await? else {
                        exhausted = true;
                        break;
                    };

                    let key = row.key();
                    if let Some(prev) = last_key {
                        if key <= prev {
                            return Err(StepError::from(ExtractionError::OutOfOrder { prev, next: key }));
                        }
                    }
                    last_key = Some(key);

                    exec.rows_read += 1;
                    metrics.increment_read(1);

                    let doc = processor.process(row)?;
                    if replay_left > 0 {
                        replay_left -= 1;
                        exec.rows_replayed += 1;
                        metrics.increment_replayed(1);
                        continue;
                    }
                    chunk.push(doc);
                }
                Ok::<(), StepError>(())
            }
            .await;

            if let Err(err) = filled {
                report_chunk_error(ctx, name, seq, &err).await;
                return Err(err);
            }

            if !chunk.is_empty() {
                for listener in &ctx.listeners {
                    listener.before_chunk(name, seq).await?;
                }

                if let Err(err) = writer.write(&chunk.rows).await {
                    let err = StepError::from(err);
                    report_chunk_error(ctx, name, seq, &err).await;
                    return Err(err);
                }

                let rows = chunk.len();
                exec.rows_written += rows as u64;
                exec.chunks_written += 1;
                metrics.increment_written(rows as u64);
                metrics.increment_chunks(1);

                for listener in &ctx.listeners {
                    listener.after_chunk(exec, seq, rows).await?;
                }
                seq += 1;
            }

            if exhausted {
                return Ok(());
            }
        }
    }
}

async fn report_chunk_error(ctx: &StepContext, step: StepName, seq: u64, err: &StepError) {
    let message = err.to_string();
    for listener in &ctx.listeners {
        if let Err(listener_err) = listener.on_chunk_error(step, seq, &message).await {
            warn!(%step, chunk = seq, error = %listener_err, "Chunk error listener failed");
        }
    }
}

#[async_trait]
impl<S, T> Step for ChunkStep<S, T>
where
    S: SourceRow,
    T: Send + Sync + 'static,
{
    fn name(&self) -> StepName {
        self.name
    }

    async fn run(self: Box<Self>, ctx: StepContext) -> StepResult {
        let name = self.name;
        let metrics = self.metrics.clone();
        let started = Instant::now();

        let mut exec = StepExecution::pending(name);
        exec.mark_running(ctx.resume_from);

        let mut outcome = notify_before_step(&ctx.listeners, &exec).await;
        if outcome.is_ok() {
            outcome = (*self).execute(&mut exec, &ctx).await;
        }

        match &outcome {
            Ok(()) => exec.mark_completed(),
            Err(err) => {
                metrics.increment_failures(1);
                exec.mark_failed(err.to_string());
            }
        }

        if let Err(err) = notify_after_step(&ctx.listeners, &exec).await {
            if outcome.is_ok() {
                exec.mark_failed(err.to_string());
                outcome = Err(err);
            } else {
                warn!(step = %name, error = %err, "Failed to record step failure");
            }
        }

        info!(
            step = %name,
            status = %exec.status,
            rows = exec.rows_committed(),
            chunks = exec.chunks_written,
            duration_ms = started.elapsed().as_millis() as u64,
            "Step finished"
        );

        StepResult {
            execution: exec,
            metrics: metrics.snapshot(),
            error: outcome.err(),
        }
    }
}
