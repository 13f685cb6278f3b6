use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub const AUTHORS: &str = "authors";
pub const GENRES: &str = "genres";
pub const BOOKS: &str = "books";
pub const COMMENTS: &str = "comments";

/// A denormalized document stored in a named target collection.
///
/// `id` is always the stringified source primary key.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetAuthor {
    pub id: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetGenre {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetBook {
    pub id: String,
    pub title: String,
    pub author: TargetAuthor,
    pub genres: Vec<TargetGenre>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetComment {
    pub id: String,
    pub text: String,
    pub book_id: String,
}

impl Document for TargetAuthor {
    const COLLECTION: &'static str = AUTHORS;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Document for TargetGenre {
    const COLLECTION: &'static str = GENRES;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Document for TargetBook {
    const COLLECTION: &'static str = BOOKS;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Document for TargetComment {
    const COLLECTION: &'static str = COMMENTS;

    fn id(&self) -> &str {
        &self.id
    }
}
