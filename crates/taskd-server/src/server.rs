use std::sync::Arc;

use tokio::net::TcpListener;

use taskd_store::Store;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// taskd HTTP server.
pub struct TaskServer {
    state: AppState,
}

impl TaskServer {
    /// Open the store configured by `config` and build the server.
    ///
    /// Fails fast if the snapshot exists but is corrupt.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let store = Store::open_file(&config.data_path, config.collection_names())?;
        Ok(Self::with_store(Arc::new(store), config))
    }

    /// Build the server around an already opened store.
    pub fn with_store(store: Arc<Store>, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(store, config),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests until ctrl-c.
    pub async fn serve(self) -> ServerResult<()> {
        let addr = self.state.config.bind_addr;
        let app = build_router(self.state);
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("taskd server listening on {}", addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
