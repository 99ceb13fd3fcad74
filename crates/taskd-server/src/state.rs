use std::sync::Arc;

use taskd_ingest::{IngestJobs, IngestPipeline};
use taskd_store::{Store, StoreError};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Shared application state handed to every handler.
///
/// The store is constructed once at startup and injected here; handlers
/// never reach for a global.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub jobs: IngestJobs,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(store: Arc<Store>, config: ServerConfig) -> Self {
        let pipeline = IngestPipeline::new(Arc::clone(&store), config.task_collection.clone());
        Self {
            store,
            jobs: IngestJobs::new(pipeline),
            config: Arc::new(config),
        }
    }

    /// Collection the task endpoints operate on.
    pub fn collection(&self) -> &str {
        &self.config.task_collection
    }

    /// Run a store mutation against the task collection on the blocking
    /// pool, since every mutation writes and syncs the snapshot.
    pub async fn mutate<T, F>(&self, op: F) -> ServerResult<T>
    where
        F: FnOnce(&Store, &str) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let collection = self.config.task_collection.clone();
        let result = tokio::task::spawn_blocking(move || op(&store, &collection))
            .await
            .map_err(|e| ServerError::Internal(format!("store task aborted: {e}")))?;
        Ok(result?)
    }
}
