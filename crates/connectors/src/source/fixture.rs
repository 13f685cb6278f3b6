use crate::{
    error::ConnectorError,
    source::memory::{MemorySource, SourceTables},
};
use async_trait::async_trait;
use engine_core::{
    connectors::source::{BoxExtractor, SourceStore},
    error::ExtractionError,
};
use model::records::source::{Author, BookRow, Comment, Genre};
use std::path::{Path, PathBuf};
use tracing::info;

/// Source tables loaded from a JSON file.
///
/// ```json
/// { "authors": [{"id": 1, "full_name": "A1"}],
///   "genres": [{"id": 1, "name": "G1"}],
///   "books": [{"id": 1, "title": "B1", "author_id": 1}],
///   "books_genres": [{"book_id": 1, "genre_id": 1}],
///   "comments": [{"id": 1, "text": "C1", "book_id": 1}] }
/// ```
pub struct FixtureSource {
    path: PathBuf,
    inner: MemorySource,
}

impl FixtureSource {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConnectorError> {
        let path = path.as_ref().to_path_buf();
        let raw = tokio::fs::read_to_string(&path).await?;
        let tables: SourceTables = serde_json::from_str(&raw)?;
        info!(
            path = %path.display(),
            authors = tables.authors.len(),
            genres = tables.genres.len(),
            books = tables.books.len(),
            comments = tables.comments.len(),
            "Loaded source fixture"
        );
        Ok(FixtureSource {
            path,
            inner: MemorySource::new(tables),
        })
    }
}

#[async_trait]
impl SourceStore for FixtureSource {
    async fn authors(&self) -> Result<BoxExtractor<Author>, ExtractionError> {
        self.inner.authors().await
    }

    async fn genres(&self) -> Result<BoxExtractor<Genre>, ExtractionError> {
        self.inner.genres().await
    }

    async fn books(&self) -> Result<BoxExtractor<BookRow>, ExtractionError> {
        self.inner.books().await
    }

    async fn comments(&self) -> Result<BoxExtractor<Comment>, ExtractionError> {
        self.inner.comments().await
    }

    fn describe(&self) -> String {
        format!("fixture {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn loads_tables_and_join_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"authors":[{{"id":1,"full_name":"A1"}}],
                "genres":[{{"id":5,"name":"G5"}}],
                "books":[{{"id":1,"title":"B1","author_id":1}}],
                "books_genres":[{{"book_id":1,"genre_id":5}}]}}"#
        )
        .unwrap();

        let source = FixtureSource::load(file.path()).await.unwrap();
        let row = source.books().await.unwrap().next().await.unwrap().unwrap();
        assert!(row.book.genre_ids.contains(&5));
        assert!(source.comments().await.unwrap().next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2").unwrap();
        let err = FixtureSource::load(file.path()).await.err().unwrap();
        assert!(matches!(err, ConnectorError::Fixture(_)));
    }
}
