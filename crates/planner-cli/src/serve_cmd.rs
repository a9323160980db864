//! `planner serve`: the HTTP tool server.
//!
//! Every tool is a `POST /tools/<name>` taking a JSON body. The caller's
//! session is taken from the `user-id` and `session-id` headers.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use planner_core::{ErrorKind, PlanError, SessionKey, SessionManager, TaskStore};
use planner_store::FileStore;

use crate::config::PlannerConfig;

pub const USER_HEADER: &str = "user-id";
pub const SESSION_HEADER: &str = "session-id";

const TOOLS: [&str; 6] = [
    "add_task",
    "add_subtask",
    "get_tasks",
    "get_task",
    "update_task_state",
    "delete_task",
];

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

pub struct AppState {
    pub name: String,
    pub sessions: SessionManager<Arc<dyn TaskStore>>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(name: impl Into<String>, store: Arc<dyn TaskStore>) -> SharedState {
        Arc::new(Self {
            name: name.into(),
            sessions: SessionManager::new(store),
        })
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: ErrorKind::InvalidInput,
            message: msg.into(),
        }
    }
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        let kind = err.kind();
        let status = match kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidInput | ErrorKind::InvalidState => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if kind == ErrorKind::Storage {
            tracing::error!("storage failure: {err:#}");
        }
        Self {
            status,
            kind,
            message: format!("{err:#}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({
            "error": { "kind": self.kind, "message": self.message }
        });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Caller identity
// ---------------------------------------------------------------------------

/// The session named by the request's `user-id` / `session-id` headers.
pub struct Caller(pub SessionKey);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = required_header(&parts.headers, USER_HEADER)?;
        let session = required_header(&parts.headers, SESSION_HEADER)?;
        Ok(Self(SessionKey::new(user, session)?))
    }
}

fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::bad_request(format!("missing required header `{name}`")))
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AddTaskRequest {
    pub description: String,
    #[serde(default)]
    pub parent_task_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddSubtaskRequest {
    pub parent_task_id: String,
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct GetTasksRequest {
    #[serde(default)]
    pub state_filter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TaskIdRequest {
    pub task_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStateRequest {
    pub task_id: String,
    pub state: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/tools/add_task", post(add_task))
        .route("/tools/add_subtask", post(add_subtask))
        .route("/tools/get_tasks", post(get_tasks))
        .route("/tools/get_task", post(get_task))
        .route("/tools/update_task_state", post(update_task_state))
        .route("/tools/delete_task", post(delete_task))
        .route("/tasks", get(render_tasks))
        .route("/tasks/tree", get(task_tree))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(config: &PlannerConfig) -> Result<()> {
    let store = FileStore::open(config.store_config.clone()).await?;
    let state = AppState::new(&config.server.name, Arc::new(store));
    let app = build_router(state);

    let server = &config.server;
    let listener = tokio::net::TcpListener::bind((server.host.as_str(), server.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", server.host, server.port))?;
    let addr = listener.local_addr()?;
    tracing::info!(
        name = %server.name,
        data_dir = %config.store_config.data_dir.display(),
        "planner serve listening on http://{addr}"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("planner serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index(State(state): State<SharedState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": state.name,
        "tools": TOOLS,
        "resources": ["/tasks", "/tasks/tree"],
    }))
}

async fn add_task(
    State(state): State<SharedState>,
    Caller(key): Caller,
    Json(req): Json<AddTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    let task = match req.parent_task_id.as_deref() {
        Some(parent) => {
            state
                .sessions
                .add_subtask(&key, parent, &req.description)
                .await?
        }
        None => state.sessions.add_task(&key, &req.description).await?,
    };
    Ok((StatusCode::CREATED, Json(task)))
}

async fn add_subtask(
    State(state): State<SharedState>,
    Caller(key): Caller,
    Json(req): Json<AddSubtaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    let task = state
        .sessions
        .add_subtask(&key, &req.parent_task_id, &req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_tasks(
    State(state): State<SharedState>,
    Caller(key): Caller,
    Json(req): Json<GetTasksRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tasks = state
        .sessions
        .get_tasks(&key, req.state_filter.as_deref())
        .await?;
    Ok(Json(serde_json::json!({ "tasks": tasks })))
}

async fn get_task(
    State(state): State<SharedState>,
    Caller(key): Caller,
    Json(req): Json<TaskIdRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.sessions.get_task(&key, &req.task_id).await?))
}

async fn update_task_state(
    State(state): State<SharedState>,
    Caller(key): Caller,
    Json(req): Json<UpdateStateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let task = state
        .sessions
        .update_task_state(&key, &req.task_id, &req.state)
        .await?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<SharedState>,
    Caller(key): Caller,
    Json(req): Json<TaskIdRequest>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = state.sessions.delete_task(&key, &req.task_id).await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

async fn render_tasks(
    State(state): State<SharedState>,
    Caller(key): Caller,
) -> Result<impl IntoResponse, AppError> {
    let markdown = state.sessions.render(&key).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        markdown,
    ))
}

async fn task_tree(
    State(state): State<SharedState>,
    Caller(key): Caller,
) -> Result<impl IntoResponse, AppError> {
    let tree = state.sessions.tree(&key).await?;
    Ok(Json(serde_json::json!({ "tasks": tree })))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
