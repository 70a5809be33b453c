//! HTTP route handlers for the Weekly Pomodoros server.
//!
//! This module provides the HTTP API endpoints:
//!
//! - `GET /api/todos` - List the todo collection
//! - `POST /api/todos` - Create a todo
//! - `PUT /api/todos` - Partially update a todo by id
//! - `DELETE /api/todos?id=...` - Delete a todo by id
//! - `GET /health` - Health check endpoint
//!
//! # Architecture
//!
//! Handlers hold no todo state of their own. Each one extracts the request's
//! cookies, opens a [`TodoStore`] over them, performs a single operation and
//! returns the updated jar so the new collection travels back as
//! `Set-Cookie`.
//!
//! # Example
//!
//! ```rust,no_run
//! use pomodoros_server::config::Config;
//! use pomodoros_server::routes::{create_router, AppState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = AppState::new(Config::default());
//!     let app = create_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Local, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::Config;
use crate::cookie::CookieBlob;
use crate::error::{Result, ServerError};
use crate::store::TodoStore;
use crate::types::{is_past_day, NewTodo, Todo, UpdateRequest};

/// Path of the todo collection resource.
pub const TODOS_PATH: &str = "/api/todos";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<Config>,

    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Creates a new application state with the given configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    fn open_store(&self, jar: CookieJar) -> TodoStore<CookieBlob> {
        TodoStore::with_ttl(
            CookieBlob::new(jar),
            Duration::days(i64::from(self.config.todo_ttl_days)),
        )
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("start_time", &self.start_time)
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Creates the application router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route(
            TODOS_PATH,
            get(list_todos)
                .post(create_todo)
                .put(update_todo)
                .delete(delete_todo),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .route("/health", get(get_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// /api/todos
// ============================================================================

/// Query parameters for `DELETE /api/todos`.
#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub id: Option<String>,
}

/// GET /api/todos - Returns the full collection.
///
/// A missing or malformed cookie yields `[]`. Reads never rewrite the
/// cookie, so its expiry is not extended.
async fn list_todos(State(state): State<AppState>, jar: CookieJar) -> Json<Vec<Todo>> {
    let todos = state.open_store(jar).list();
    debug!(count = todos.len(), "Listing todos");
    Json(todos)
}

/// POST /api/todos - Appends a todo and returns it with `201 Created`.
async fn create_todo(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(input): Json<NewTodo>,
) -> Result<(StatusCode, CookieJar, Json<Todo>)> {
    if state.config.enforce_date_guard {
        if input.date.is_empty() {
            return Err(ServerError::validation("date is required"));
        }
        if is_past_day(&input.date, today()) {
            return Err(ServerError::validation("date is in the past"));
        }
    }

    let mut store = state.open_store(jar);
    let todo = store.create(input, Utc::now())?;

    info!(id = %todo.id, date = %todo.date, "Todo created");
    Ok((StatusCode::CREATED, store.into_handle().into_jar(), Json(todo)))
}

/// PUT /api/todos - Merges the provided fields into the todo with `id`.
///
/// # Responses
///
/// - `200 OK` - The updated record
/// - `404 Not Found` - No todo has this id
async fn update_todo(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<UpdateRequest>,
) -> Result<(CookieJar, Json<Todo>)> {
    let Some(id) = request.id else {
        return Err(ServerError::NotFound(String::new()));
    };

    let mut store = state.open_store(jar);
    if state.config.enforce_date_guard {
        reject_past_target(&store, &id, "past todos cannot be modified")?;
    }

    let todo = store.update(&id, &request.patch, Utc::now())?;

    info!(id = %todo.id, "Todo updated");
    Ok((store.into_handle().into_jar(), Json(todo)))
}

/// DELETE /api/todos?id=... - Removes the todo with `id` and returns it.
///
/// A request without an `id` parameter matches nothing and yields 404.
async fn delete_todo(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<DeleteParams>,
) -> Result<(CookieJar, Json<Todo>)> {
    let Some(id) = params.id else {
        return Err(ServerError::NotFound(String::new()));
    };

    let mut store = state.open_store(jar);
    if state.config.enforce_date_guard {
        reject_past_target(&store, &id, "past todos cannot be deleted")?;
    }

    let todo = store.delete(&id, Utc::now())?;

    info!(id = %todo.id, "Todo deleted");
    Ok((store.into_handle().into_jar(), Json(todo)))
}

fn reject_past_target(store: &TodoStore<CookieBlob>, id: &str, message: &str) -> Result<()> {
    match store.find(id) {
        Some(todo) if is_past_day(&todo.date, today()) => Err(ServerError::validation(message)),
        _ => Ok(()),
    }
}

fn today() -> chrono::NaiveDate {
    Local::now().date_naive()
}

// ============================================================================
// GET /health - Health Check
// ============================================================================

/// Response body for health check endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Server status (always "ok" if responding).
    pub status: String,

    /// Server uptime in seconds.
    pub uptime_seconds: u64,
}

/// GET /health - Health check endpoint.
async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Tests
// ============================================================================
