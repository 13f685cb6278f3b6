use crate::error::ExtractionError;
use async_trait::async_trait;
use model::records::source::{Author, BookRow, Comment, Genre};

/// Lazy, forward-only stream of source rows in ascending key order.
///
/// Extractors are single use: a step asks its [`SourceStore`] for a fresh
/// one on every run.
#[async_trait]
pub trait Extractor<S>: Send {
    /// Next row, or `None` once the source is exhausted.
    async fn next(&mut self) -> Result<Option<S>, ExtractionError>;
}

pub type BoxExtractor<S> = Box<dyn Extractor<S>>;

/// Read-only access to the relational source, one extractor per entity.
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn authors(&self) -> Result<BoxExtractor<Author>, ExtractionError>;

    async fn genres(&self) -> Result<BoxExtractor<Genre>, ExtractionError>;

    /// Books joined with their author row and genre membership.
    async fn books(&self) -> Result<BoxExtractor<BookRow>, ExtractionError>;

    async fn comments(&self) -> Result<BoxExtractor<Comment>, ExtractionError>;

    /// Human readable description used in logs.
    fn describe(&self) -> String;
}

/// Extractor over rows already held in memory.
pub struct VecExtractor<S> {
    rows: std::vec::IntoIter<S>,
}

impl<S> VecExtractor<S> {
    pub fn new(rows: Vec<S>) -> Self {
        VecExtractor {
            rows: rows.into_iter(),
        }
    }
}

#[async_trait]
impl<S: Send> Extractor<S> for VecExtractor<S> {
    async fn next(&mut self) -> Result<Option<S>, ExtractionError> {
        Ok(self.rows.next())
    }
}
