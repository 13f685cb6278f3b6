//! Row transforms from relational rows to target documents.
//!
//! Ids are carried over as their decimal string form so that embedded
//! copies and references resolve without a mapping table.

pub mod author;
pub mod book;
pub mod comment;
pub mod genre;

pub use author::AuthorProcessor;
pub use book::BookProcessor;
pub use comment::CommentProcessor;
pub use genre::GenreProcessor;
