use std::path::PathBuf;

use taskd_types::{RecordId, ValidationError};

/// Errors from record store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The referenced record does not exist in the collection.
    #[error("record {id} not found in collection `{collection}`")]
    NotFound { collection: String, id: RecordId },

    /// A caller-supplied id is already taken in the collection.
    #[error("record {id} already exists in collection `{collection}`")]
    DuplicateId { collection: String, id: RecordId },

    /// The record or patch failed validation before touching the store.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The durable write failed; in-memory state was rolled back.
    #[error("snapshot not persisted to {}: {reason}", path.display())]
    NotPersistable { path: PathBuf, reason: String },

    /// The durable snapshot could not be read back at startup.
    #[error("corrupt snapshot at {}: {reason}", path.display())]
    CorruptState { path: PathBuf, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &RecordId) -> Self {
        Self::NotFound {
            collection: collection.to_owned(),
            id: id.clone(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
