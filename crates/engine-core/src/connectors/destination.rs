use crate::error::WriteError;
use async_trait::async_trait;
use model::records::document::Document;
use serde::{Deserialize, Serialize};
use std::{fmt, marker::PhantomData, str::FromStr, sync::Arc};

/// How a target store treats a document whose id already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteMode {
    /// Reject the whole batch on an existing id.
    #[default]
    Insert,
    /// Replace existing documents by id.
    Upsert,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Insert => "insert",
            WriteMode::Upsert => "upsert",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "insert" => Ok(WriteMode::Insert),
            "upsert" => Ok(WriteMode::Upsert),
            other => Err(format!("Unknown write mode: {other}")),
        }
    }
}

/// Batch-insert interface of the document store.
///
/// A batch is atomic: either every document is stored or none is.
#[async_trait]
pub trait TargetStore: Send + Sync {
    async fn insert_batch(
        &self,
        collection: &str,
        docs: Vec<(String, serde_json::Value)>,
        mode: WriteMode,
    ) -> Result<(), WriteError>;

    fn describe(&self) -> String;
}

/// Persists one chunk of documents as a single atomic batch.
#[async_trait]
pub trait Writer<T: Send + Sync>: Send + Sync {
    fn collection(&self) -> &str;

    async fn write(&self, chunk: &[T]) -> Result<(), WriteError>;
}

/// Typed writer for any [`Document`] over a [`TargetStore`].
pub struct DocumentWriter<T> {
    store: Arc<dyn TargetStore>,
    mode: WriteMode,
    _doc: PhantomData<fn() -> T>,
}

impl<T: Document> DocumentWriter<T> {
    pub fn new(store: Arc<dyn TargetStore>, mode: WriteMode) -> Self {
        DocumentWriter {
            store,
            mode,
            _doc: PhantomData,
        }
    }

    fn encode(chunk: &[T]) -> Result<Vec<(String, serde_json::Value)>, WriteError> {
        chunk
            .iter()
            .map(|doc| {
                serde_json::to_value(doc)
                    .map(|value| (doc.id().to_string(), value))
                    .map_err(|e| WriteError::Serialize(e.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl<T: Document> Writer<T> for DocumentWriter<T> {
    fn collection(&self) -> &str {
        T::COLLECTION
    }

    async fn write(&self, chunk: &[T]) -> Result<(), WriteError> {
        let docs = Self::encode(chunk)?;
        self.store.insert_batch(T::COLLECTION, docs, self.mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::records::document::TargetGenre;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct CapturingStore {
        seen: Mutex<Vec<(String, Vec<String>, WriteMode)>>,
    }

    #[async_trait]
    impl TargetStore for CapturingStore {
        async fn insert_batch(
            &self,
            collection: &str,
            docs: Vec<(String, serde_json::Value)>,
            mode: WriteMode,
        ) -> Result<(), WriteError> {
            let ids = docs.into_iter().map(|(id, _)| id).collect();
            self.seen.lock().await.push((collection.to_string(), ids, mode));
            Ok(())
        }

        fn describe(&self) -> String {
            "capturing".into()
        }
    }

    #[tokio::test]
    async fn document_writer_targets_the_document_collection() {
        let store = Arc::new(CapturingStore::default());
        let writer: DocumentWriter<TargetGenre> =
            DocumentWriter::new(store.clone(), WriteMode::Upsert);

        let chunk = vec![
            TargetGenre {
                id: "1".into(),
                name: "G1".into(),
            },
            TargetGenre {
                id: "2".into(),
                name: "G2".into(),
            },
        ];
        writer.write(&chunk).await.unwrap();

        let seen = store.seen.lock().await;
        assert_eq!(writer.collection(), "genres");
        assert_eq!(seen[0].0, "genres");
        assert_eq!(seen[0].1, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(seen[0].2, WriteMode::Upsert);
    }

    #[test]
    fn parses_write_mode() {
        assert_eq!("UPSERT".parse::<WriteMode>(), Ok(WriteMode::Upsert));
        assert!("merge".parse::<WriteMode>().is_err());
    }
}
