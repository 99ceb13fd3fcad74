use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use taskd_ingest::{JobId, JobState, JobStatus};
use taskd_store::Filter;
use taskd_types::{NewTask, RecordId, Task, TaskPatch, ValidationError};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Body of `POST /tasks` and `PUT /tasks/:id`.
///
/// Fields are optional here so a missing field surfaces as a validation
/// failure (422) rather than a JSON rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskBody {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl TaskBody {
    fn required(self) -> Result<(String, String), ValidationError> {
        let title = non_blank("title", self.title)?;
        let description = non_blank("description", self.description)?;
        Ok((title, description))
    }
}

fn non_blank(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ValidationError::empty(field)),
    }
}

/// A body that is absent, malformed, or carries unknown fields.
fn body_or_invalid(body: Option<Json<TaskBody>>) -> Result<TaskBody, ValidationError> {
    body.map(|Json(body)| body)
        .ok_or(ValidationError::empty("body"))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportParams {
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Info handler.
pub async fn info_handler() -> Json<serde_json::Value> {
    Json(json!({
        "name": "taskd",
        "version": env!("CARGO_PKG_VERSION"),
        "snapshot_version": taskd_store::SNAPSHOT_VERSION,
    }))
}

/// `GET /tasks?search=<term>`
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Vec<Task>> {
    let filter = params
        .search
        .filter(|term| !term.is_empty())
        .map(|term| Filter::search(&term));
    Json(state.store.select(state.collection(), filter.as_ref()))
}

/// `GET /tasks/:id`
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Task>> {
    let id = RecordId::parse(id)?;
    Ok(Json(state.store.get(state.collection(), &id)?))
}

/// `POST /tasks`
pub async fn create_task(
    State(state): State<AppState>,
    body: Option<Json<TaskBody>>,
) -> ServerResult<Response> {
    let (title, description) = body_or_invalid(body)?.required()?;
    let draft = NewTask::new(title, description);
    let task = state
        .mutate(move |store, collection| store.insert(collection, draft))
        .await?;
    tracing::info!(id = %task.id, "task created");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/tasks/{}", task.id))],
    )
        .into_response())
}

/// `PUT /tasks/:id`
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<TaskBody>>,
) -> ServerResult<StatusCode> {
    let id = RecordId::parse(id)?;
    let (title, description) = body_or_invalid(body)?.required()?;
    let patch = TaskPatch::new().title(title).description(description);
    state
        .mutate(move |store, collection| store.update(collection, &id, patch))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PATCH /tasks/:id/complete`
pub async fn complete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    let id = RecordId::parse(id)?;
    state
        .mutate(move |store, collection| store.update(collection, &id, TaskPatch::complete()))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /tasks/:id`
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    let id = RecordId::parse(id)?;
    state
        .mutate(move |store, collection| store.delete(collection, &id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /tasks/csv`
///
/// By default the job is accepted and runs in the background; poll the
/// `Location` for its outcome. With `?wait=true` the import runs inline
/// and the response reflects how it ended.
pub async fn import_csv(
    State(state): State<AppState>,
    Query(params): Query<ImportParams>,
) -> ServerResult<Response> {
    let source = state.config.csv_path.clone();

    if params.wait {
        let status = state.jobs.run(source).await;
        return match status.state {
            JobState::Failed { failure, .. } => Err(ServerError::IngestFailed(failure)),
            _ => Ok((StatusCode::CREATED, Json(status)).into_response()),
        };
    }

    let id = state.jobs.submit(source);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/tasks/csv/jobs/{id}"))],
        Json(json!({ "job_id": id })),
    )
        .into_response())
}

/// `GET /tasks/csv/jobs/:job_id`
pub async fn import_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ServerResult<Json<JobStatus>> {
    JobId::parse(&job_id)
        .and_then(|id| state.jobs.status(&id))
        .map(Json)
        .ok_or(ServerError::JobNotFound(job_id))
}

/// `GET /tasks/csv/jobs`
pub async fn list_imports(State(state): State<AppState>) -> Json<Vec<JobStatus>> {
    Json(state.jobs.list())
}
