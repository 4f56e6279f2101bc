use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use todo_store::TodoStore;
use todo_types::{sort_by_id, Project, Todo};

use crate::error::ApiError;
use crate::payload::{Payload, ProjectPayload, TodoPayload};

/// The store every handler talks to.
pub type SharedStore = Arc<dyn TodoStore>;

type ApiResult<T> = Result<T, ApiError>;

/// Reads report a missing id as 404.
fn absent(err: todo_store::StoreError) -> ApiError {
    ApiError::from_store(err, StatusCode::NOT_FOUND)
}

/// Mutations of a missing id are the caller's mistake: 400.
fn rejected(err: todo_store::StoreError) -> ApiError {
    ApiError::from_store(err, StatusCode::BAD_REQUEST)
}

fn created(body: String) -> Response {
    (StatusCode::CREATED, body).into_response()
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: String,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn health(State(store): State<SharedStore>) -> (StatusCode, Json<HealthResponse>) {
    let backend = store.backend().to_string();
    let version = env!("CARGO_PKG_VERSION");
    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                backend,
                version,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                    backend,
                    version,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Todos
// ---------------------------------------------------------------------------

pub async fn list_todos(State(store): State<SharedStore>) -> ApiResult<Json<Vec<Todo>>> {
    let mut todos = store.get_all_todos().await.map_err(absent)?;
    sort_by_id(&mut todos, |t| t.id.as_str());
    Ok(Json(todos))
}

pub async fn get_todo(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> ApiResult<Json<Todo>> {
    Ok(Json(store.get_todo(&id).await.map_err(absent)?))
}

/// `POST /todo`: the owning project comes from the body's `projectId`.
pub async fn create_todo(
    State(store): State<SharedStore>,
    Payload(payload): Payload<TodoPayload>,
) -> ApiResult<Response> {
    let project_id = payload
        .project_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("projectId is required"))?;
    let draft = payload.into_draft()?;
    let name = draft.name.clone();
    let id = store
        .create_todo(&project_id, draft)
        .await
        .map_err(absent)?;
    tracing::debug!(%id, project = %project_id, "todo created");
    Ok(created(format!("{id} Successfully created todo: {name}")))
}

/// `POST /todo/{id}`: create at a chosen id, never overwriting.
pub async fn create_todo_with_id(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    Payload(payload): Payload<TodoPayload>,
) -> ApiResult<Response> {
    let draft = payload.into_draft()?;
    let name = draft.name.clone();
    store
        .create_todo_with_id(&id, draft)
        .await
        .map_err(rejected)?;
    tracing::debug!(%id, "todo created at chosen id");
    Ok(created(format!("{id} Successfully created todo: {name}")))
}

pub async fn update_todo(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    Payload(payload): Payload<TodoPayload>,
) -> ApiResult<String> {
    let draft = payload.into_draft()?;
    store.update_todo(&id, draft).await.map_err(rejected)?;
    Ok(format!("Successfully updated todo ID {id}"))
}

pub async fn delete_todo(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> ApiResult<String> {
    let count = store.delete_todo(&id).await.map_err(rejected)?;
    Ok(format!("Number of todos deleted: {count}"))
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

pub async fn list_projects(State(store): State<SharedStore>) -> ApiResult<Json<Vec<Project>>> {
    let mut projects = store.get_all_projects().await.map_err(absent)?;
    sort_by_id(&mut projects, |p| p.id.as_str());
    Ok(Json(projects))
}

pub async fn get_project(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> ApiResult<Json<Project>> {
    Ok(Json(store.get_project(&id).await.map_err(absent)?))
}

pub async fn create_project(
    State(store): State<SharedStore>,
    Payload(payload): Payload<ProjectPayload>,
) -> ApiResult<Response> {
    let (name, todos) = payload.into_parts()?;
    let id = store
        .create_project(&name, todos)
        .await
        .map_err(rejected)?;
    tracing::debug!(%id, %name, "project created");
    Ok(created(format!("{id} Successfully created project: {name}")))
}

/// `POST /proj/{id}`: add a todo to an existing project.
pub async fn create_project_todo(
    State(store): State<SharedStore>,
    Path(project_id): Path<String>,
    Payload(payload): Payload<TodoPayload>,
) -> ApiResult<Response> {
    let draft = payload.into_draft()?;
    let name = draft.name.clone();
    let id = store
        .create_todo(&project_id, draft)
        .await
        .map_err(absent)?;
    tracing::debug!(%id, project = %project_id, "todo created");
    Ok(created(format!("{id} Successfully created todo: {name}")))
}

pub async fn rename_project(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    Payload(payload): Payload<ProjectPayload>,
) -> ApiResult<String> {
    let (name, _) = payload.into_parts()?;
    store.rename_project(&id, &name).await.map_err(rejected)?;
    Ok(format!("Successfully renamed project ID {id} to {name}"))
}

pub async fn delete_project(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> ApiResult<String> {
    let count = store.delete_project(&id).await.map_err(rejected)?;
    Ok(format!("Number of projects deleted: {count}"))
}
