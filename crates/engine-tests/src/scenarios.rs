#[cfg(test)]
mod tests {
    use crate::{
        EventLog, TestTarget, catalogue, open_repository, sample_tables, settings, step_rows,
        tracker,
    };
    use async_trait::async_trait;
    use connectors::{
        source::{BookGenre, MemorySource},
        target::MemoryTarget,
    };
    use engine_core::{
        cache::ReferenceCache,
        connectors::destination::WriteMode,
        error::StateStoreError,
        listener::StepListener,
    };
    use engine_processing::step::StepContext;
    use engine_runtime::{
        execution::MigrationSteps,
        flow::FlowController,
    };
    use model::{
        execution::{
            job::{JobParameters, JobStatus},
            step::{StepExecution, StepName, StepStatus},
        },
        records::document::{
            AUTHORS, BOOKS, COMMENTS, GENRES, TargetAuthor, TargetBook, TargetComment,
            TargetGenre,
        },
    };
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn sample_catalogue_is_denormalized() {
        let dir = tempdir().unwrap();
        let target = Arc::new(MemoryTarget::new());
        let tracker = tracker(
            open_repository(dir.path()),
            sample_tables(),
            target.clone(),
            settings(10, WriteMode::Insert),
        );

        let exec = tracker.start(JobParameters::new()).await.unwrap();

        assert_eq!(exec.status, JobStatus::Completed);
        let book: TargetBook = target.find("1").await.unwrap();
        assert_eq!(
            book,
            TargetBook {
                id: "1".into(),
                title: "B1".into(),
                author: TargetAuthor { id: "1".into(), full_name: "A1".into() },
                genres: vec![
                    TargetGenre { id: "1".into(), name: "G1".into() },
                    TargetGenre { id: "2".into(), name: "G2".into() },
                ],
            }
        );
        let comment: TargetComment = target.find("1").await.unwrap();
        assert_eq!(
            comment,
            TargetComment { id: "1".into(), text: "C1".into(), book_id: "1".into() }
        );
        assert_eq!(target.count(AUTHORS).await, 2);
        assert_eq!(target.count(GENRES).await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn every_source_row_lands_under_its_stringified_id() {
        let dir = tempdir().unwrap();
        let tables = catalogue(6, 5, 23, 2);
        let target = Arc::new(MemoryTarget::new());
        let tracker = tracker(
            open_repository(dir.path()),
            tables.clone(),
            target.clone(),
            settings(4, WriteMode::Insert),
        );

        let exec = tracker.start(JobParameters::new()).await.unwrap();
        assert_eq!(exec.status, JobStatus::Completed);

        for author in &tables.authors {
            let doc: TargetAuthor = target.find(&author.id.to_string()).await.unwrap();
            assert_eq!(doc.full_name, author.full_name);
        }
        for book in &tables.books {
            let doc: TargetBook = target.find(&book.id.to_string()).await.unwrap();
            assert_eq!(doc.title, book.title);
            assert_eq!(doc.author.id, book.author_id.to_string());

            let mut expected: Vec<i64> = tables
                .books_genres
                .iter()
                .filter(|link| link.book_id == book.id)
                .map(|link| link.genre_id)
                .collect();
            expected.sort();
            expected.dedup();
            let actual: Vec<i64> = doc.genres.iter().map(|g| g.id.parse().unwrap()).collect();
            assert_eq!(actual, expected);
        }
        for comment in &tables.comments {
            let doc: TargetComment = target.find(&comment.id.to_string()).await.unwrap();
            assert_eq!(doc.book_id, comment.book_id.to_string());
        }
        assert_eq!(step_rows(&exec, StepName::Comment), 46);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn writer_receives_ceil_n_over_c_batches() {
        let dir = tempdir().unwrap();
        let target = Arc::new(MemoryTarget::new());
        let tracker = tracker(
            open_repository(dir.path()),
            catalogue(3, 4, 40, 0),
            target.clone(),
            settings(3, WriteMode::Insert),
        );

        tracker.start(JobParameters::new()).await.unwrap();

        let mut expected = vec![3; 13];
        expected.push(1);
        assert_eq!(target.batch_sizes(BOOKS).await, expected);
        assert_eq!(target.batch_sizes(AUTHORS).await, vec![3]);
        assert_eq!(target.batch_sizes(GENRES).await, vec![3, 1]);
        assert!(target.batch_sizes(COMMENTS).await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dependent_writes_follow_upstream_completion() {
        let dir = tempdir().unwrap();
        let log = EventLog::default();
        let target = Arc::new(TestTarget::new(Arc::new(MemoryTarget::new()), log.clone()));
        let tracker = tracker(
            open_repository(dir.path()),
            catalogue(20, 8, 20, 1),
            target,
            settings(2, WriteMode::Insert),
        )
        .with_listener(Arc::new(log.clone()));

        let exec = tracker.start(JobParameters::new()).await.unwrap();
        assert_eq!(exec.status, JobStatus::Completed);

        let author_done = log.first("completed:author").unwrap();
        let genre_done = log.first("completed:genre").unwrap();
        let first_book_write = log.first("write:books").unwrap();
        assert!(first_book_write > author_done);
        assert!(first_book_write > genre_done);

        let book_done = log.first("completed:book").unwrap();
        assert!(log.last("write:books").unwrap() < book_done);
        assert!(log.first("write:comments").unwrap() > book_done);
        assert!(log.first("start:cleanup").unwrap() > log.first("completed:comment").unwrap());
    }

    /// Checks the cache right when the genre step reports completion.
    struct CacheProbe {
        cache: ReferenceCache<TargetGenre>,
        seen: Mutex<Option<Vec<i64>>>,
    }

    #[async_trait]
    impl StepListener for CacheProbe {
        async fn after_step(&self, step: &StepExecution) -> Result<(), StateStoreError> {
            if step.step == StepName::Genre && step.status == StepStatus::Completed {
                let ids = (1..=20).filter(|id| self.cache.contains(*id)).collect();
                *self.seen.lock().unwrap() = Some(ids);
            }
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cache_holds_every_genre_once_genre_step_completes() {
        let steps = MigrationSteps::new(
            Arc::new(MemorySource::new(catalogue(4, 7, 10, 0))),
            Arc::new(MemoryTarget::new()),
            WriteMode::Insert,
        );
        let cache = steps.genre_cache();
        let probe = Arc::new(CacheProbe {
            cache: cache.clone(),
            seen: Mutex::new(None),
        });

        let ctx = StepContext::new(3, CancellationToken::new(), vec![probe.clone()]);
        let result = FlowController::new(ctx).run_flow(&steps).await;

        assert_eq!(result.status, JobStatus::Completed);
        assert_eq!(
            probe.seen.lock().unwrap().clone(),
            Some((1..=7).collect::<Vec<i64>>())
        );
        assert!(cache.is_sealed());
        // Cleanup ran last.
        assert!(cache.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unknown_genre_fails_the_book_step() {
        let dir = tempdir().unwrap();
        let mut tables = sample_tables();
        tables.books_genres.push(BookGenre { book_id: 1, genre_id: 99 });
        let target = Arc::new(MemoryTarget::new());
        let tracker = tracker(
            open_repository(dir.path()),
            tables,
            target.clone(),
            settings(10, WriteMode::Insert),
        );

        let exec = tracker.start(JobParameters::new()).await.unwrap();

        assert_eq!(exec.status, JobStatus::Failed);
        assert_eq!(exec.failed_step, Some(StepName::Book));
        assert!(exec.failure.as_deref().unwrap().contains("key 99"));
        assert_eq!(target.count(BOOKS).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn book_without_author_row_fails_the_job_at_book() {
        let dir = tempdir().unwrap();
        let mut tables = catalogue(3, 2, 5, 1);
        tables.books[3].author_id = 99;
        let target = Arc::new(MemoryTarget::new());
        let tracker = tracker(
            open_repository(dir.path()),
            tables,
            target.clone(),
            settings(2, WriteMode::Insert),
        );

        let exec = tracker.start(JobParameters::new()).await.unwrap();

        assert_eq!(exec.status, JobStatus::Failed);
        assert_eq!(exec.failed_step, Some(StepName::Book));
        let failure = exec.failure.as_deref().unwrap();
        assert!(failure.contains("Extraction failed"));
        assert!(failure.contains("book row 4"));

        assert_eq!(target.count(AUTHORS).await, 3);
        assert_eq!(target.count(GENRES).await, 2);
        assert_eq!(target.count(BOOKS).await, 2);
        assert_eq!(target.count(COMMENTS).await, 0);
        assert_eq!(step_rows(&exec, StepName::Book), 2);
        assert_eq!(exec.step_status(StepName::Comment), StepStatus::Pending);
    }

    #[traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn book_writer_failing_on_second_chunk() {
        let dir = tempdir().unwrap();
        let memory = Arc::new(MemoryTarget::new());
        let target =
            Arc::new(TestTarget::new(memory.clone(), EventLog::default()).failing(BOOKS, 2));
        let tables = catalogue(5, 4, 7, 1);
        let tracker = tracker(
            open_repository(dir.path()),
            tables,
            target,
            settings(3, WriteMode::Insert),
        );

        let exec = tracker.start(JobParameters::new()).await.unwrap();

        assert_eq!(exec.status, JobStatus::Failed);
        assert_eq!(exec.failed_step, Some(StepName::Book));
        assert_eq!(memory.count(AUTHORS).await, 5);
        assert_eq!(memory.count(GENRES).await, 4);
        assert_eq!(memory.count(BOOKS).await, 3);
        assert_eq!(memory.count(COMMENTS).await, 0);

        assert_eq!(exec.step_status(StepName::Author), StepStatus::Completed);
        assert_eq!(exec.step_status(StepName::Genre), StepStatus::Completed);
        assert_eq!(exec.step_status(StepName::Book), StepStatus::Failed);
        assert_eq!(exec.step_status(StepName::Comment), StepStatus::Pending);
        assert_eq!(exec.step_status(StepName::Cleanup), StepStatus::Pending);
        assert_eq!(step_rows(&exec, StepName::Book), 3);

        assert!(logs_contain("Flow failed"));
    }
}
