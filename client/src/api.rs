//! HTTP client for the todo gateway.
//!
//! Each method maps to one verb on `/api/todos`. The underlying
//! `reqwest` client uses the shared [`CookieJar`] as its cookie provider, so
//! the `todos` cookie the server sets is stored and sent back like a browser
//! would. Requests are not retried and carry no timeout.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pomodoros_client::api::TodoApi;
//! use pomodoros_client::jar::CookieJar;
//! use pomodoros_client::types::NewTodo;
//!
//! #[tokio::main]
//! async fn main() {
//!     let jar = Arc::new(CookieJar::in_memory());
//!     let api = TodoApi::new("http://127.0.0.1:3000", jar).unwrap();
//!
//!     let todo = api.create(&NewTodo::new("write report", "2024-01-10")).await.unwrap();
//!     println!("created {}", todo.id);
//! }
//! ```

use std::sync::Arc;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::jar::CookieJar;
use crate::types::{NewTodo, Todo, TodoPatch};

/// Errors returned by gateway calls.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered 404 for an update or delete.
    #[error("todo not found: {id}")]
    NotFound { id: String },

    /// The gateway answered with another non-success status.
    #[error("server error: {status} - {message}")]
    Server { status: u16, message: String },
}

/// Error body sent by the gateway.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    id: &'a str,
    #[serde(flatten)]
    patch: &'a TodoPatch,
}

/// Client for `/api/todos`.
#[derive(Debug, Clone)]
pub struct TodoApi {
    client: Client,
    todos_url: String,
}

impl TodoApi {
    /// Creates a client for the gateway at `server_url` that keeps its
    /// cookies in `jar`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the HTTP client cannot be built.
    pub fn new(server_url: &str, jar: Arc<CookieJar>) -> Result<Self, ApiError> {
        let client = Client::builder().cookie_provider(jar).build()?;

        Ok(Self {
            client,
            todos_url: format!("{}/api/todos", server_url.trim_end_matches('/')),
        })
    }

    /// LIST: the whole collection.
    pub async fn list(&self) -> Result<Vec<Todo>, ApiError> {
        let response = self.client.get(&self.todos_url).send().await?;
        let todos: Vec<Todo> = read_json(response, None).await?;
        debug!(count = todos.len(), "Fetched todos");
        Ok(todos)
    }

    /// CREATE: appends a todo and returns it with its assigned id.
    pub async fn create(&self, todo: &NewTodo) -> Result<Todo, ApiError> {
        let response = self.client.post(&self.todos_url).json(todo).send().await?;
        read_json(response, None).await
    }

    /// UPDATE: merges `patch` into the todo with `id`.
    pub async fn update(&self, id: &str, patch: &TodoPatch) -> Result<Todo, ApiError> {
        let response = self
            .client
            .put(&self.todos_url)
            .json(&UpdateBody { id, patch })
            .send()
            .await?;
        read_json(response, Some(id)).await
    }

    /// DELETE: removes the todo with `id` and returns it.
    pub async fn delete(&self, id: &str) -> Result<Todo, ApiError> {
        let response = self
            .client
            .delete(&self.todos_url)
            .query(&[("id", id)])
            .send()
            .await?;
        read_json(response, Some(id)).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, id: Option<&str>) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    if let (StatusCode::NOT_FOUND, Some(id)) = (status, id) {
        return Err(ApiError::NotFound { id: id.to_string() });
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);

    Err(ApiError::Server {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_body_flattens_patch() {
        let patch = TodoPatch {
            content: Some("new".to_string()),
            ..TodoPatch::default()
        };
        let json = serde_json::to_value(UpdateBody { id: "7", patch: &patch }).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "7", "content": "new" }));
    }

    #[test]
    fn todos_url_ignores_trailing_slash() {
        let api = TodoApi::new("http://localhost:3000/", Arc::new(CookieJar::in_memory())).unwrap();
        assert_eq!(api.todos_url, "http://localhost:3000/api/todos");
    }

    #[test]
    fn error_display() {
        let err = ApiError::Server {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "server error: 503 - unavailable");
    }
}
