use std::io;

use taskd_store::StoreError;
use taskd_types::ValidationError;

/// Errors that terminate an ingest run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A data row failed validation; nothing after it was read.
    #[error("invalid row at line {line}: {source}")]
    InvalidRow {
        line: u64,
        #[source]
        source: ValidationError,
    },

    /// Reading the source failed (I/O error or non UTF-8 input).
    #[error("source error: {0}")]
    Source(#[from] io::Error),

    /// The store refused a row (e.g. the snapshot could not be persisted).
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl IngestError {
    pub fn is_invalid_row(&self) -> bool {
        matches!(self, Self::InvalidRow { .. })
    }
}

/// Convenience alias used throughout the ingest crate.
pub type Result<T> = std::result::Result<T, IngestError>;
