use thiserror::Error;

/// The source could not produce the next row.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Source I/O error: {0}")]
    Io(String),

    #[error("Malformed {entity} row {key}: {reason}")]
    Malformed {
        entity: String,
        key: String,
        reason: String,
    },

    #[error("Source rows out of key order: {next} after {prev}")]
    OutOfOrder { prev: i64, next: i64 },
}

/// A processor could not transform a row.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Reference cache has no entry for key {key}")]
    MissingKey { key: i64 },

    #[error("Reference cache error: {0}")]
    Cache(#[from] CacheError),
}

/// The target store did not commit a batch. Nothing of the batch is kept.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WriteError {
    #[error("Target rejected batch for '{collection}': {reason}")]
    Rejected { collection: String, reason: String },

    #[error("Duplicate document '{id}' in '{collection}'")]
    Duplicate { collection: String, id: String },

    #[error("Failed to serialize document: {0}")]
    Serialize(String),

    #[error("Target I/O error: {0}")]
    Io(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    #[error("Reference cache is sealed; no more entries may be added")]
    Sealed,

    #[error("Reference cache is still being populated")]
    NotSealed,
}

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("State storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Failed to (de)serialize state record: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Corrupt state key: {0}")]
    CorruptKey(String),

    #[error("Job execution {0} not found")]
    NotFound(u64),
}
