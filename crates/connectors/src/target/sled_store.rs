use crate::{error::ConnectorError, target::check_batch_ids};
use async_trait::async_trait;
use engine_core::{
    connectors::destination::{TargetStore, WriteMode},
    error::WriteError,
};
use model::records::document::Document;
use serde_json::Value;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;
use tracing::debug;

/// Document store on an embedded sled database: one tree per collection,
/// documents stored as JSON under their id.
#[derive(Clone)]
pub struct SledTarget {
    db: sled::Db,
}

impl SledTarget {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConnectorError> {
        let db = sled::open(path)?;
        Ok(SledTarget { db })
    }

    pub fn count(&self, collection: &str) -> Result<usize, ConnectorError> {
        Ok(self.db.open_tree(collection)?.len())
    }

    pub fn find<T: Document>(&self, id: &str) -> Result<Option<T>, ConnectorError> {
        let tree = self.db.open_tree(T::COLLECTION)?;
        match tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl TargetStore for SledTarget {
    async fn insert_batch(
        &self,
        collection: &str,
        docs: Vec<(String, Value)>,
        mode: WriteMode,
    ) -> Result<(), WriteError> {
        check_batch_ids(collection, &docs, mode)?;

        let mut encoded = Vec::with_capacity(docs.len());
        for (id, doc) in &docs {
            let bytes = serde_json::to_vec(doc).map_err(|e| WriteError::Serialize(e.to_string()))?;
            encoded.push((id.as_str(), bytes));
        }

        let tree = self.db.open_tree(collection).map_err(ConnectorError::from)?;
        tree.transaction(|tx| {
            for (id, bytes) in &encoded {
                if mode == WriteMode::Insert && tx.get(id.as_bytes())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(WriteError::Duplicate {
                        collection: collection.to_string(),
                        id: id.to_string(),
                    }));
                }
                tx.insert(id.as_bytes(), bytes.as_slice())?;
            }
            Ok(())
        })
        .map_err(|e| match e {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => WriteError::Io(err.to_string()),
        })?;

        tree.flush_async()
            .await
            .map_err(|e| WriteError::Io(e.to_string()))?;

        debug!(collection, docs = encoded.len(), "Committed batch to sled");
        Ok(())
    }

    fn describe(&self) -> String {
        "sled target".to_string()
    }
}
