use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all taskd endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/tasks", get(handler::list_tasks).post(handler::create_task))
        .route("/tasks/csv", post(handler::import_csv))
        .route("/tasks/csv/jobs", get(handler::list_imports))
        .route("/tasks/csv/jobs/:job_id", get(handler::import_status))
        .route(
            "/tasks/:id",
            get(handler::get_task)
                .put(handler::update_task)
                .delete(handler::delete_task),
        )
        .route("/tasks/:id/complete", patch(handler::complete_task))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}
