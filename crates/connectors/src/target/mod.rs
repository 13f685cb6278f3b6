pub mod memory;
pub mod sled_store;

pub use memory::{BatchRecord, MemoryTarget};
pub use sled_store::SledTarget;

use engine_core::{connectors::destination::WriteMode, error::WriteError};
use std::collections::HashSet;

/// In insert mode an id may appear only once per batch.
pub(crate) fn check_batch_ids(
    collection: &str,
    docs: &[(String, serde_json::Value)],
    mode: WriteMode,
) -> Result<(), WriteError> {
    if mode == WriteMode::Upsert {
        return Ok(());
    }
    let mut seen = HashSet::with_capacity(docs.len());
    for (id, _) in docs {
        if !seen.insert(id.as_str()) {
            return Err(WriteError::Duplicate {
                collection: collection.to_string(),
                id: id.clone(),
            });
        }
    }
    Ok(())
}
