use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use taskd_ingest::{IngestError, JobFailure};
use taskd_store::StoreError;
use taskd_types::ValidationError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("ingest job failed: {0:?}")]
    IngestFailed(JobFailure),

    #[error("ingest job not found: {0}")]
    JobNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Store(e) => store_status(e),
            Self::Ingest(IngestError::InvalidRow { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Ingest(IngestError::Store(e)) => store_status(e),
            Self::IngestFailed(JobFailure::InvalidRow { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::JobNotFound(_) => StatusCode::NOT_FOUND,
            Self::Ingest(_)
            | Self::IngestFailed(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::DuplicateId { .. } => StatusCode::CONFLICT,
        StoreError::NotPersistable { .. } | StoreError::CorruptState { .. } | StoreError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        status.into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
