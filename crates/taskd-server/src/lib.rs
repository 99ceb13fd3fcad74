//! HTTP server for taskd.
//!
//! Exposes the task store over a small REST API and runs CSV imports as
//! tracked ingest jobs.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::TaskServer;
pub use state::AppState;
