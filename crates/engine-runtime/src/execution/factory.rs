use crate::flow::controller::StepProvider;
use engine_core::{
    cache::ReferenceCache,
    connectors::{
        destination::{DocumentWriter, TargetStore, WriteMode},
        source::SourceStore,
    },
};
use engine_processing::{
    error::StepError,
    step::{ChunkStep, CleanupStep, Step},
    transform::{AuthorProcessor, BookProcessor, CommentProcessor, GenreProcessor},
};
use futures::FutureExt;
use model::{
    execution::step::StepName,
    records::document::{Document, TargetAuthor, TargetBook, TargetComment, TargetGenre},
};
use std::sync::Arc;

/// Wires the four entity steps and the cleanup tasklet of one run to a
/// source, a target and the run's genre cache.
pub struct MigrationSteps {
    source: Arc<dyn SourceStore>,
    target: Arc<dyn TargetStore>,
    write_mode: WriteMode,
    genres: ReferenceCache<TargetGenre>,
}

impl MigrationSteps {
    pub fn new(
        source: Arc<dyn SourceStore>,
        target: Arc<dyn TargetStore>,
        write_mode: WriteMode,
    ) -> Self {
        MigrationSteps {
            source,
            target,
            write_mode,
            genres: ReferenceCache::new(),
        }
    }

    /// The run's genre cache.
    pub fn genre_cache(&self) -> ReferenceCache<TargetGenre> {
        self.genres.clone()
    }

    fn writer<T>(&self) -> Box<DocumentWriter<T>>
    where
        T: Document,
    {
        Box::new(DocumentWriter::new(self.target.clone(), self.write_mode))
    }
}

impl StepProvider for MigrationSteps {
    fn build(&self, step: StepName) -> Result<Box<dyn Step>, StepError> {
        let source = self.source.clone();

        let step: Box<dyn Step> = match step {
            StepName::Author => Box::new(ChunkStep::new(
                step,
                Box::new(move || async move { source.authors().await }.boxed()),
                Box::new(AuthorProcessor),
                self.writer::<TargetAuthor>(),
            )),
            StepName::Genre => Box::new(ChunkStep::new(
                step,
                Box::new(move || async move { source.genres().await }.boxed()),
                Box::new(GenreProcessor::new(self.genres.populator()?)),
                self.writer::<TargetGenre>(),
            )),
            StepName::Book => Box::new(ChunkStep::new(
                step,
                Box::new(move || async move { source.books().await }.boxed()),
                Box::new(BookProcessor::new(self.genres.reader()?)),
                self.writer::<TargetBook>(),
            )),
            StepName::Comment => Box::new(ChunkStep::new(
                step,
                Box::new(move || async move { source.comments().await }.boxed()),
                Box::new(CommentProcessor),
                self.writer::<TargetComment>(),
            )),
            StepName::Cleanup => Box::new(CleanupStep::new(self.genres.clone())),
        };
        Ok(step)
    }

    fn branches_joined(&self) {
        self.genres.seal();
    }
}
