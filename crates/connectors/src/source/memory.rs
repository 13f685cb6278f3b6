use async_trait::async_trait;
use engine_core::{
    connectors::source::{BoxExtractor, Extractor, SourceStore, VecExtractor},
    error::ExtractionError,
};
use model::records::source::{Author, Book, BookRow, Comment, Genre, SourceRow};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};

/// Row of the `books_genres` join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookGenre {
    pub book_id: i64,
    pub genre_id: i64,
}

/// The relational source as plain tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceTables {
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub books: Vec<Book>,
    #[serde(default)]
    pub books_genres: Vec<BookGenre>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Source store backed by in-process tables.
///
/// Every table is sorted by primary key on construction and the
/// `books_genres` rows are folded into `Book::genre_ids`.
#[derive(Debug, Clone)]
pub struct MemorySource {
    authors: Arc<Vec<Author>>,
    genres: Arc<Vec<Genre>>,
    books: Arc<Vec<Book>>,
    comments: Arc<Vec<Comment>>,
}

impl MemorySource {
    pub fn new(tables: SourceTables) -> Self {
        let SourceTables {
            mut authors,
            mut genres,
            mut books,
            books_genres,
            mut comments,
        } = tables;

        for link in books_genres {
            if let Some(book) = books.iter_mut().find(|b| b.id == link.book_id) {
                book.genre_ids.insert(link.genre_id);
            }
        }

        sort_by_key(&mut authors);
        sort_by_key(&mut genres);
        sort_by_key(&mut books);
        sort_by_key(&mut comments);

        MemorySource {
            authors: Arc::new(authors),
            genres: Arc::new(genres),
            books: Arc::new(books),
            comments: Arc::new(comments),
        }
    }
}

fn sort_by_key<R: SourceRow>(rows: &mut [R]) {
    rows.sort_by_key(|r| r.key());
}

#[async_trait]
impl SourceStore for MemorySource {
    async fn authors(&self) -> Result<BoxExtractor<Author>, ExtractionError> {
        Ok(Box::new(VecExtractor::new(self.authors.as_ref().clone())))
    }

    async fn genres(&self) -> Result<BoxExtractor<Genre>, ExtractionError> {
        Ok(Box::new(VecExtractor::new(self.genres.as_ref().clone())))
    }

    async fn books(&self) -> Result<BoxExtractor<BookRow>, ExtractionError> {
        let authors = self
            .authors
            .iter()
            .map(|a| (a.id, a.clone()))
            .collect::<HashMap<_, _>>();
        Ok(Box::new(BookJoinExtractor {
            books: self.books.as_ref().clone().into_iter(),
            authors,
        }))
    }

    async fn comments(&self) -> Result<BoxExtractor<Comment>, ExtractionError> {
        Ok(Box::new(VecExtractor::new(self.comments.as_ref().clone())))
    }

    fn describe(&self) -> String {
        format!(
            "memory source ({} authors, {} genres, {} books, {} comments)",
            self.authors.len(),
            self.genres.len(),
            self.books.len(),
            self.comments.len()
        )
    }
}

/// Joins each book with its author row, like the SQL reader does.
struct BookJoinExtractor {
    books: std::vec::IntoIter<Book>,
    authors: HashMap<i64, Author>,
}

#[async_trait]
impl Extractor<BookRow> for BookJoinExtractor {
    async fn next(&mut self) -> Result<Option<BookRow>, ExtractionError> {
        let Some(book) = self.books.next() else {
            return Ok(None);
        };
        let author = self.authors.get(&book.author_id).cloned().ok_or_else(|| {
            ExtractionError::Malformed {
                entity: "book".to_string(),
                key: book.id.to_string(),
                reason: format!("author {} does not exist", book.author_id),
            }
        })?;
        Ok(Some(BookRow { book, author }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn tables() -> SourceTables {
        SourceTables {
            authors: vec![
                Author { id: 2, full_name: "A2".into() },
                Author { id: 1, full_name: "A1".into() },
            ],
            genres: vec![Genre { id: 1, name: "G1".into() }],
            books: vec![Book {
                id: 1,
                title: "B1".into(),
                author_id: 2,
                genre_ids: BTreeSet::new(),
            }],
            books_genres: vec![
                BookGenre { book_id: 1, genre_id: 3 },
                BookGenre { book_id: 1, genre_id: 1 },
            ],
            comments: vec![],
        }
    }

    #[tokio::test]
    async fn authors_come_out_in_key_order() {
        let source = MemorySource::new(tables());
        let mut ex = source.authors().await.unwrap();
        assert_eq!(ex.next().await.unwrap().map(|a| a.id), Some(1));
        assert_eq!(ex.next().await.unwrap().map(|a| a.id), Some(2));
        assert!(ex.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn books_are_joined_with_author_and_genres() {
        let source = MemorySource::new(tables());
        let row = source.books().await.unwrap().next().await.unwrap().unwrap();
        assert_eq!(row.author.full_name, "A2");
        assert_eq!(row.book.genre_ids.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn book_without_author_is_malformed() {
        let mut t = tables();
        t.books[0].author_id = 99;
        let source = MemorySource::new(t);
        let err = source.books().await.unwrap().next().await.unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed { ref key, .. } if key == "1"));
    }
}
