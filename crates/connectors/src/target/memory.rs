use crate::target::check_batch_ids;
use async_trait::async_trait;
use engine_core::{
    connectors::destination::{TargetStore, WriteMode},
    error::WriteError,
};
use model::records::document::Document;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// One committed batch, in commit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRecord {
    pub collection: String,
    pub ids: Vec<String>,
}

#[derive(Default)]
struct State {
    collections: HashMap<String, Vec<(String, Value)>>,
    batches: Vec<BatchRecord>,
}

/// In-memory document store that also keeps a log of committed batches.
#[derive(Default)]
pub struct MemoryTarget {
    state: Mutex<State>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents of a collection in insertion order.
    pub async fn documents(&self, collection: &str) -> Vec<Value> {
        let state = self.state.lock().await;
        state
            .collections
            .get(collection)
            .map(|docs| docs.iter().map(|(_, doc)| doc.clone()).collect())
            .unwrap_or_default()
    }

    pub async fn count(&self, collection: &str) -> usize {
        let state = self.state.lock().await;
        state.collections.get(collection).map_or(0, Vec::len)
    }

    /// Typed lookup by document id.
    pub async fn find<T: Document>(&self, id: &str) -> Option<T> {
        let state = self.state.lock().await;
        state
            .collections
            .get(T::COLLECTION)?
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .and_then(|(_, doc)| serde_json::from_value(doc.clone()).ok())
    }

    pub async fn batches(&self) -> Vec<BatchRecord> {
        self.state.lock().await.batches.clone()
    }

    /// Sizes of the batches committed to `collection`, in order.
    pub async fn batch_sizes(&self, collection: &str) -> Vec<usize> {
        let state = self.state.lock().await;
        state
            .batches
            .iter()
            .filter(|b| b.collection == collection)
            .map(|b| b.ids.len())
            .collect()
    }
}

#[async_trait]
impl TargetStore for MemoryTarget {
    async fn insert_batch(
        &self,
        collection: &str,
        docs: Vec<(String, Value)>,
        mode: WriteMode,
    ) -> Result<(), WriteError> {
        check_batch_ids(collection, &docs, mode)?;

        let mut state = self.state.lock().await;
        let existing = state.collections.entry(collection.to_string()).or_default();

        if mode == WriteMode::Insert {
            if let Some((id, _)) = docs
                .iter()
                .find(|(id, _)| existing.iter().any(|(doc_id, _)| doc_id == id))
            {
                return Err(WriteError::Duplicate {
                    collection: collection.to_string(),
                    id: id.clone(),
                });
            }
        }

        let ids: Vec<String> = docs.iter().map(|(id, _)| id.clone()).collect();
        for (id, doc) in docs {
            match existing.iter_mut().find(|(doc_id, _)| *doc_id == id) {
                Some(slot) => slot.1 = doc,
                None => existing.push((id, doc)),
            }
        }

        state.batches.push(BatchRecord {
            collection: collection.to_string(),
            ids,
        });
        Ok(())
    }

    fn describe(&self) -> String {
        "memory target".to_string()
    }
}
