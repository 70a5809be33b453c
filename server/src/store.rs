//! Todo store over an opaque persisted blob.
//!
//! The canonical todo collection lives in a single string value (in
//! production, the `todos` cookie). [`TodoStore`] reads that value, applies
//! one operation, and writes the entire collection back with a fresh expiry.
//!
//! # Persistence Handle
//!
//! The store never touches cookies directly; it goes through a
//! [`BlobHandle`]. The HTTP gateway uses a request-scoped
//! [`CookieBlob`](crate::cookie::CookieBlob), tests use [`MemoryBlob`].
//! Swapping in a transactional backend only requires another handle.
//!
//! # Concurrency
//!
//! There is no locking. Each operation is read-modify-write against the
//! handle it was given, and in the gateway that handle is a snapshot of the
//! cookie sent with the request. Two concurrent mutations from the same
//! client both start from the same snapshot; whichever response the client
//! applies last wins and the other mutation is silently lost.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use pomodoros_server::store::{MemoryBlob, TodoStore};
//! use pomodoros_server::types::NewTodo;
//!
//! let mut store = TodoStore::new(MemoryBlob::default());
//! let todo = store
//!     .create(
//!         NewTodo {
//!             content: "write report".to_string(),
//!             date: "2024-01-10".to_string(),
//!             completed: false,
//!         },
//!         Utc::now(),
//!     )
//!     .expect("encoding never fails for plain records");
//!
//! assert_eq!(store.list(), vec![todo]);
//! ```

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{NewTodo, Todo, TodoPatch};

/// Default lifetime of the persisted collection, refreshed on every write.
pub const DEFAULT_TTL_DAYS: u32 = 7;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with the requested id exists in the collection.
    #[error("todo not found: {0}")]
    NotFound(String),

    /// The collection could not be serialized.
    #[error("failed to encode todo collection: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A persistence handle holding one opaque string value with an expiry.
pub trait BlobHandle {
    /// Returns the stored value, or `None` if nothing is stored.
    fn read(&self) -> Option<String>;

    /// Replaces the stored value, expiring at `expires_at`.
    fn write(&mut self, value: String, expires_at: DateTime<Utc>);
}

/// In-memory [`BlobHandle`].
///
/// Cloning takes a snapshot, which is how two overlapping requests see the
/// same cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryBlob {
    value: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl MemoryBlob {
    /// Creates a handle already holding `value`.
    #[must_use]
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            expires_at: None,
        }
    }

    /// Expiry set by the last write, if any.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

impl BlobHandle for MemoryBlob {
    fn read(&self) -> Option<String> {
        self.value.clone()
    }

    fn write(&mut self, value: String, expires_at: DateTime<Utc>) {
        self.value = Some(value);
        self.expires_at = Some(expires_at);
    }
}

/// Decodes a persisted collection.
///
/// An absent value is an empty collection. A value that does not parse as a
/// list of todos is logged and also treated as empty; it never fails the
/// request.
#[must_use]
pub fn decode_collection(raw: Option<&str>) -> Vec<Todo> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    match serde_json::from_str(raw) {
        Ok(todos) => todos,
        Err(err) => {
            warn!(error = %err, len = raw.len(), "Discarding malformed todo collection");
            Vec::new()
        }
    }
}

/// Encodes a collection for persistence.
///
/// # Errors
///
/// Returns the serializer error; plain records never produce one.
pub fn encode_collection(todos: &[Todo]) -> Result<String, serde_json::Error> {
    serde_json::to_string(todos)
}

/// The todo collection over a [`BlobHandle`].
#[derive(Debug)]
pub struct TodoStore<H> {
    handle: H,
    ttl: Duration,
}

impl<H: BlobHandle> TodoStore<H> {
    /// Creates a store with the default seven-day expiry.
    #[must_use]
    pub fn new(handle: H) -> Self {
        Self::with_ttl(handle, Duration::days(i64::from(DEFAULT_TTL_DAYS)))
    }

    /// Creates a store whose writes expire `ttl` after the write instant.
    #[must_use]
    pub fn with_ttl(handle: H, ttl: Duration) -> Self {
        Self { handle, ttl }
    }

    /// Returns every record in stored order.
    #[must_use]
    pub fn list(&self) -> Vec<Todo> {
        decode_collection(self.handle.read().as_deref())
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<Todo> {
        self.list().into_iter().find(|todo| todo.id == id)
    }

    /// Appends a new record, assigning its `id` and `createdAt` from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Encode`] if the collection cannot be serialized.
    pub fn create(&mut self, input: NewTodo, now: DateTime<Utc>) -> Result<Todo, StoreError> {
        let mut todos = self.list();
        let todo = Todo::create(input, now);
        todos.push(todo.clone());
        self.save(&todos, now)?;

        debug!(id = %todo.id, total = todos.len(), "Todo created");
        Ok(todo)
    }

    /// Merges `patch` into the record with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no record has `id`.
    pub fn update(
        &mut self,
        id: &str,
        patch: &TodoPatch,
        now: DateTime<Utc>,
    ) -> Result<Todo, StoreError> {
        let mut todos = self.list();
        let todo = todos
            .iter_mut()
            .find(|todo| todo.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        patch.apply_to(todo);
        let updated = todo.clone();
        self.save(&todos, now)?;

        debug!(id = %id, "Todo updated");
        Ok(updated)
    }

    /// Removes the record with `id` and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no record has `id`.
    pub fn delete(&mut self, id: &str, now: DateTime<Utc>) -> Result<Todo, StoreError> {
        let mut todos = self.list();
        let index = todos
            .iter()
            .position(|todo| todo.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let removed = todos.remove(index);
        self.save(&todos, now)?;

        debug!(id = %id, remaining = todos.len(), "Todo deleted");
        Ok(removed)
    }

    /// Consumes the store, returning the handle with any pending writes.
    #[must_use]
    pub fn into_handle(self) -> H {
        self.handle
    }

    fn save(&mut self, todos: &[Todo], now: DateTime<Utc>) -> Result<(), StoreError> {
        let encoded = encode_collection(todos)?;
        self.handle.write(encoded, now + self.ttl);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokio_test::{assert_err, assert_ok};

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, secs).unwrap()
    }

    fn new_todo(content: &str) -> NewTodo {
        NewTodo {
            content: content.to_string(),
            date: "2024-01-10".to_string(),
            completed: false,
        }
    }

    #[test]
    fn list_is_empty_when_nothing_stored() {
        let store = TodoStore::new(MemoryBlob::default());
        assert!(store.list().is_empty());
    }

    #[test]
    fn list_fails_open_on_malformed_value() {
        let store = TodoStore::new(MemoryBlob::with_value("{not json"));
        assert!(store.list().is_empty());

        let store = TodoStore::new(MemoryBlob::with_value(r#"{"id":"1"}"#));
        assert!(store.list().is_empty());
    }

    #[test]
    fn create_appends_with_unique_id() {
        let mut store = TodoStore::new(MemoryBlob::default());
        let first = store.create(new_todo("one"), at(0)).unwrap();
        let before = store.list();

        let second = store.create(new_todo("two"), at(1)).unwrap();
        let after = store.list();

        assert_eq!(after.len(), before.len() + 1);
        assert_ne!(first.id, second.id);
        assert_eq!(after.last(), Some(&second));
    }

    #[test]
    fn create_preserves_insertion_order() {
        let mut store = TodoStore::new(MemoryBlob::default());
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            store.create(new_todo(name), at(i as u32)).unwrap();
        }

        let contents: Vec<_> = store.list().into_iter().map(|t| t.content).collect();
        assert_eq!(contents, vec!["a", "b", "c"]);
    }

    #[test]
    fn create_within_same_millisecond_collides() {
        let mut store = TodoStore::new(MemoryBlob::default());
        let first = store.create(new_todo("one"), at(0)).unwrap();
        let second = store.create(new_todo("two"), at(0)).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn update_completed_leaves_other_fields_unchanged() {
        let mut store = TodoStore::new(MemoryBlob::default());
        let created = store.create(new_todo("one"), at(0)).unwrap();

        let patch = TodoPatch {
            completed: Some(true),
            ..TodoPatch::default()
        };
        store.update(&created.id, &patch, at(5)).unwrap();

        let stored = store.find(&created.id).unwrap();
        assert!(stored.completed);
        assert_eq!(stored.content, created.content);
        assert_eq!(stored.date, created.date);
        assert_eq!(stored.created_at, created.created_at);
    }

    #[test]
    fn update_missing_id_is_not_found() {
        let mut store = TodoStore::new(MemoryBlob::default());
        let result = store.update("missing", &TodoPatch::default(), at(0));
        assert!(matches!(result, Err(StoreError::NotFound(id)) if id == "missing"));
    }

    #[test]
    fn delete_removes_then_reports_not_found() {
        let mut store = TodoStore::new(MemoryBlob::default());
        let keep = store.create(new_todo("keep"), at(0)).unwrap();
        let gone = store.create(new_todo("gone"), at(1)).unwrap();

        let removed = assert_ok!(store.delete(&gone.id, at(2)));
        assert_eq!(removed, gone);
        assert_eq!(store.list(), vec![keep]);

        let again = assert_err!(store.delete(&gone.id, at(3)));
        assert!(matches!(again, StoreError::NotFound(_)));
    }

    #[test]
    fn every_write_refreshes_expiry_from_write_instant() {
        let mut store = TodoStore::new(MemoryBlob::default());
        let created = store.create(new_todo("one"), at(0)).unwrap();
        let patch = TodoPatch {
            content: Some("changed".to_string()),
            ..TodoPatch::default()
        };
        store.update(&created.id, &patch, at(30)).unwrap();

        let handle = store.into_handle();
        assert_eq!(handle.expires_at(), Some(at(30) + Duration::days(7)));
    }

    #[test]
    fn reads_do_not_touch_expiry() {
        let store = TodoStore::new(MemoryBlob::with_value("[]"));
        let _ = store.list();
        let _ = store.find("x");
        assert_eq!(store.into_handle().expires_at(), None);
    }

    #[test]
    fn custom_ttl_is_applied() {
        let mut store = TodoStore::with_ttl(MemoryBlob::default(), Duration::days(1));
        store.create(new_todo("one"), at(0)).unwrap();
        assert_eq!(
            store.into_handle().expires_at(),
            Some(at(0) + Duration::days(1))
        );
    }

    #[test]
    fn encode_decode_round_trip_preserves_order() {
        let mut store = TodoStore::new(MemoryBlob::default());
        store.create(new_todo("a"), at(0)).unwrap();
        store.create(new_todo("b"), at(1)).unwrap();
        let todos = store.list();

        let encoded = encode_collection(&todos).unwrap();
        assert_eq!(decode_collection(Some(&encoded)), todos);
    }

    #[test]
    fn overlapping_updates_from_same_snapshot_keep_only_the_later_write() {
        let mut seed = TodoStore::new(MemoryBlob::default());
        let todo = seed.create(new_todo("shared"), at(0)).unwrap();
        let snapshot = seed.into_handle();

        // Both requests read the pre-mutation cookie.
        let mut first = TodoStore::new(snapshot.clone());
        let mut second = TodoStore::new(snapshot);

        let rename = TodoPatch {
            content: Some("renamed".to_string()),
            ..TodoPatch::default()
        };
        let complete = TodoPatch {
            completed: Some(true),
            ..TodoPatch::default()
        };
        first.update(&todo.id, &rename, at(1)).unwrap();
        second.update(&todo.id, &complete, at(2)).unwrap();

        // The client keeps whichever Set-Cookie arrived last.
        let persisted = TodoStore::new(second.into_handle()).find(&todo.id).unwrap();
        assert!(persisted.completed);
        assert_eq!(persisted.content, "shared");
    }
}
