use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Rows as they are read from the relational source.
///
/// Every row type exposes its primary key through [`SourceRow::key`] so that
/// extractors can enforce ascending key order.
pub trait SourceRow: Send + Sync + 'static {
    fn key(&self) -> i64;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// A book row together with its genre membership from the join table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author_id: i64,
    #[serde(default)]
    pub genre_ids: BTreeSet<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub book_id: i64,
}

/// What the book extractor yields: the book joined with its author row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRow {
    pub book: Book,
    pub author: Author,
}

impl SourceRow for Author {
    fn key(&self) -> i64 {
        self.id
    }
}

impl SourceRow for Genre {
    fn key(&self) -> i64 {
        self.id
    }
}

impl SourceRow for Book {
    fn key(&self) -> i64 {
        self.id
    }
}

impl SourceRow for BookRow {
    fn key(&self) -> i64 {
        self.book.id
    }
}

impl SourceRow for Comment {
    fn key(&self) -> i64 {
        self.id
    }
}
