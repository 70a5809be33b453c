//! Client cache and sync layer for the todo list.
//!
//! [`TodoCache`] holds the last list fetched from the gateway. It is seeded
//! from the `todos` cookie already in the jar, so a front-end has something
//! to draw before the first request, and a fetched list is reused until it
//! is older than the freshness window.
//!
//! Mutations are not optimistic. A successful add/update/delete invalidates
//! the cached list and refetches it; until that refetch lands,
//! [`TodoCache::cached`] still shows the pre-mutation list. Failures are
//! reported as a message string through [`TodoCache::error_message`], and
//! nothing is rolled back because nothing was applied locally.
//!
//! The calendar-day guard runs before any request:
//! - add needs a date, and that date must not be before today
//! - update and delete are refused for todos dated before today

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::TodoApi;
use crate::clock::Clock;
use crate::error::{ClientError, GuardViolation, Mutation};
use crate::jar::CookieJar;
use crate::types::{decode_todos, parse_day, NewTodo, Todo, TodoPatch};

/// Cookie the gateway stores the collection in.
pub const TODOS_COOKIE: &str = "todos";

/// Result of an add, update or delete as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The gateway accepted the mutation and returned this record.
    Applied(Todo),
    /// A local guard refused the mutation; no request was sent.
    Rejected(GuardViolation),
    /// The request failed. See [`TodoCache::error_message`].
    Failed,
    /// The target id is not in the cached list, so nothing was done.
    Ignored,
}

/// Cached todo list with guarded mutations.
pub struct TodoCache {
    api: TodoApi,
    clock: Arc<dyn Clock>,
    stale_after: Duration,
    todos: Vec<Todo>,
    /// `None` when the list has never been fetched or was invalidated.
    fetched_at: Option<Instant>,
    error_message: Option<String>,
    last_error: Option<ClientError>,
}

impl TodoCache {
    /// Creates an empty cache; the first [`todos`](Self::todos) call fetches.
    pub fn new(api: TodoApi, clock: Arc<dyn Clock>, stale_after: Duration) -> Self {
        Self {
            api,
            clock,
            stale_after,
            todos: Vec::new(),
            fetched_at: None,
            error_message: None,
            last_error: None,
        }
    }

    /// Creates a cache seeded with `todos`, counted as fetched just now.
    pub fn with_snapshot(
        api: TodoApi,
        clock: Arc<dyn Clock>,
        stale_after: Duration,
        todos: Vec<Todo>,
    ) -> Self {
        Self {
            todos,
            fetched_at: Some(Instant::now()),
            ..Self::new(api, clock, stale_after)
        }
    }

    /// Creates a cache seeded from the `todos` cookie in `jar`.
    ///
    /// A missing or malformed cookie seeds an empty list.
    pub fn from_jar(
        api: TodoApi,
        jar: &CookieJar,
        clock: Arc<dyn Clock>,
        stale_after: Duration,
    ) -> Self {
        let seed = decode_todos(jar.get(TODOS_COOKIE).as_deref());
        debug!(count = seed.len(), "Seeding todo cache from cookie jar");
        Self::with_snapshot(api, clock, stale_after, seed)
    }

    /// The list as currently cached, without fetching.
    #[must_use]
    pub fn cached(&self) -> &[Todo] {
        &self.todos
    }

    /// Whether the cached list can be served without a fetch.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.fetched_at
            .is_some_and(|at| at.elapsed() < self.stale_after)
    }

    /// Marks the cached list stale. The data is kept until a refetch
    /// replaces it.
    pub fn invalidate(&mut self) {
        self.fetched_at = None;
    }

    /// Fetches the list unconditionally.
    ///
    /// On failure the previous list is kept and the error is returned.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let todos = self.api.list().await?;
        self.todos = todos;
        self.fetched_at = Some(Instant::now());
        Ok(())
    }

    /// Returns the list, fetching first if it is stale or missing.
    ///
    /// A failed fetch is logged and the previous list is returned.
    pub async fn todos(&mut self) -> &[Todo] {
        if !self.is_fresh() {
            if let Err(err) = self.refresh().await {
                warn!(error = %err, "Failed to fetch todos, serving cached list");
                self.last_error = Some(err);
            }
        }
        &self.todos
    }

    /// Message for the most recent failed or rejected mutation, cleared by
    /// the next successful one.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Typed cause behind [`error_message`](Self::error_message).
    #[must_use]
    pub fn last_error(&self) -> Option<&ClientError> {
        self.last_error.as_ref()
    }

    /// Adds a todo after checking its date.
    pub async fn add(&mut self, todo: NewTodo) -> MutationOutcome {
        if todo.date.is_empty() {
            return self.reject(GuardViolation::MissingDate);
        }
        if self.is_past(&todo.date) {
            return self.reject(GuardViolation::PastDate);
        }

        let result = self.api.create(&todo).await;
        self.settle(Mutation::Add, result).await
    }

    /// Applies `patch` to the cached todo with `id`.
    pub async fn update(&mut self, id: &str, patch: TodoPatch) -> MutationOutcome {
        let Some(target) = self.todos.iter().find(|t| t.id == id) else {
            debug!(id, "Update target not in cache");
            return MutationOutcome::Ignored;
        };
        if self.is_past(&target.date) {
            return self.reject(GuardViolation::PastTodoModified);
        }

        let result = self.api.update(id, &patch).await;
        self.settle(Mutation::Update, result).await
    }

    /// Deletes the cached todo with `id`.
    pub async fn delete(&mut self, id: &str) -> MutationOutcome {
        let Some(target) = self.todos.iter().find(|t| t.id == id) else {
            debug!(id, "Delete target not in cache");
            return MutationOutcome::Ignored;
        };
        if self.is_past(&target.date) {
            return self.reject(GuardViolation::PastTodoDeleted);
        }

        let result = self.api.delete(id).await;
        self.settle(Mutation::Delete, result).await
    }

    /// Unparseable dates are not considered past.
    fn is_past(&self, date: &str) -> bool {
        parse_day(date).is_some_and(|day| day < self.clock.today())
    }

    fn reject(&mut self, violation: GuardViolation) -> MutationOutcome {
        debug!(reason = %violation, "Mutation rejected by date guard");
        self.error_message = Some(violation.message().to_string());
        self.last_error = Some(ClientError::ValidationRejected(violation));
        MutationOutcome::Rejected(violation)
    }

    async fn settle(
        &mut self,
        mutation: Mutation,
        result: Result<Todo, crate::api::ApiError>,
    ) -> MutationOutcome {
        match result {
            Ok(todo) => {
                info!(id = %todo.id, ?mutation, "Mutation applied");
                self.error_message = None;
                self.last_error = None;
                self.invalidate();
                if let Err(err) = self.refresh().await {
                    warn!(error = %err, "Refetch after mutation failed");
                }
                MutationOutcome::Applied(todo)
            }
            Err(err) => {
                let err = ClientError::from(err);
                warn!(error = %err, ?mutation, "Mutation failed");
                self.error_message = Some(mutation.failure_message().to_string());
                self.last_error = Some(err);
                MutationOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;

    fn cache_with(todos: Vec<Todo>) -> TodoCache {
        // Port 9 (discard) is never listened on in tests, so any request fails.
        let api = TodoApi::new("http://127.0.0.1:9", Arc::new(CookieJar::in_memory())).unwrap();
        let clock = FixedClock::new(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        TodoCache::with_snapshot(api, Arc::new(clock), Duration::from_secs(3600), todos)
    }

    fn todo(id: &str, date: &str) -> Todo {
        Todo {
            id: id.to_string(),
            content: "c".to_string(),
            date: date.to_string(),
            completed: false,
            created_at: String::new(),
        }
    }

    #[tokio::test]
    async fn add_without_date_is_rejected() {
        let mut cache = cache_with(vec![]);

        let outcome = cache.add(NewTodo::new("x", "")).await;

        assert_eq!(outcome, MutationOutcome::Rejected(GuardViolation::MissingDate));
        assert_eq!(cache.error_message(), Some("Please select a date!"));
    }

    #[tokio::test]
    async fn add_with_past_date_is_rejected() {
        let mut cache = cache_with(vec![]);

        let outcome = cache.add(NewTodo::new("x", "2024-01-09")).await;

        assert_eq!(outcome, MutationOutcome::Rejected(GuardViolation::PastDate));
        assert!(matches!(
            cache.last_error(),
            Some(ClientError::ValidationRejected(GuardViolation::PastDate))
        ));
    }

    #[tokio::test]
    async fn past_todos_cannot_be_changed() {
        let mut cache = cache_with(vec![todo("1", "2024-01-09")]);

        let outcome = cache.update("1", TodoPatch::completed(true)).await;
        assert_eq!(outcome, MutationOutcome::Rejected(GuardViolation::PastTodoModified));
        assert_eq!(cache.error_message(), Some("Cannot modify past todos!"));

        let outcome = cache.delete("1").await;
        assert_eq!(outcome, MutationOutcome::Rejected(GuardViolation::PastTodoDeleted));
        assert_eq!(cache.error_message(), Some("Cannot delete past todos!"));
    }

    #[tokio::test]
    async fn unknown_ids_are_ignored() {
        let mut cache = cache_with(vec![todo("1", "2024-01-10")]);

        assert_eq!(cache.update("2", TodoPatch::completed(true)).await, MutationOutcome::Ignored);
        assert_eq!(cache.delete("2").await, MutationOutcome::Ignored);
        assert!(cache.error_message().is_none());
    }

    #[tokio::test]
    async fn transport_failure_sets_generic_message() {
        let mut cache = cache_with(vec![todo("1", "2024-01-10")]);

        let outcome = cache.delete("1").await;

        assert_eq!(outcome, MutationOutcome::Failed);
        assert_eq!(cache.error_message(), Some("Failed to delete todo."));
        assert!(matches!(cache.last_error(), Some(ClientError::Transport(_))));
        assert_eq!(cache.cached().len(), 1);
    }

    #[tokio::test]
    async fn seeded_snapshot_is_fresh() {
        let mut cache = cache_with(vec![todo("1", "2024-01-10")]);
        assert!(cache.is_fresh());

        // Served from the seed; the unreachable gateway is never contacted.
        assert_eq!(cache.todos().await.len(), 1);
        assert!(cache.last_error().is_none());

        cache.invalidate();
        assert!(!cache.is_fresh());
        assert_eq!(cache.cached().len(), 1);
    }

    #[tokio::test]
    async fn seed_from_jar_decodes_cookie() {
        let jar = CookieJar::in_memory();
        jar.set(TODOS_COOKIE, r#"[{"id":"1","date":"2024-01-10"}]"#, chrono::Duration::days(7))
            .unwrap();
        let api = TodoApi::new("http://127.0.0.1:9", Arc::new(CookieJar::in_memory())).unwrap();
        let clock = Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()));

        let cache = TodoCache::from_jar(api, &jar, clock, Duration::from_secs(3600));

        assert_eq!(cache.cached().len(), 1);
        assert_eq!(cache.cached()[0].id, "1");
    }
}
