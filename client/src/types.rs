//! Todo wire types and presentation helpers.
//!
//! The records mirror the gateway's JSON (`camelCase` keys). The helpers at
//! the bottom are what a front-end needs to lay out the list and the timer:
//! splitting todos into the today and weekly buckets, and formatting the
//! countdown.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Calendar date format used in the `date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A dated task as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub created_at: String,
}

impl Todo {
    /// Parsed calendar day, if `date` is well formed.
    #[must_use]
    pub fn day(&self) -> Option<NaiveDate> {
        parse_day(&self.date)
    }

    /// `date` rendered as month/day, e.g. `1/9`. Falls back to the raw
    /// string when it does not parse.
    #[must_use]
    pub fn month_day(&self) -> String {
        self.day()
            .map(|d| d.format("%-m/%-d").to_string())
            .unwrap_or_else(|| self.date.clone())
    }
}

/// Body of a CREATE request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTodo {
    pub content: String,
    pub date: String,
    pub completed: bool,
}

impl NewTodo {
    /// An incomplete todo for `date`.
    pub fn new(content: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            date: date.into(),
            completed: false,
        }
    }
}

/// Fields of an UPDATE request. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }
}

/// Parses a `YYYY-MM-DD` string.
#[must_use]
pub fn parse_day(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).ok()
}

/// Decodes a JSON todo collection, treating anything malformed as empty.
pub fn decode_todos(raw: Option<&str>) -> Vec<Todo> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    match serde_json::from_str(raw) {
        Ok(todos) => todos,
        Err(err) => {
            warn!(error = %err, "Discarding malformed todo snapshot");
            Vec::new()
        }
    }
}

// ============================================================================
// Presentation helpers
// ============================================================================

/// Todos split by day, each bucket in stored order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoBuckets {
    /// Todos dated today.
    pub today: Vec<Todo>,
    /// Every other todo, past and future.
    pub weekly: Vec<Todo>,
}

impl TodoBuckets {
    /// Splits `todos` on an exact `date == today` match.
    #[must_use]
    pub fn split(todos: &[Todo], today: NaiveDate) -> Self {
        let today_str = today.format(DATE_FORMAT).to_string();
        let (today, weekly) = todos.iter().cloned().partition(|t| t.date == today_str);
        Self { today, weekly }
    }
}

/// Formats a countdown as `m:ss`.
#[must_use]
pub fn format_remaining(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(id: &str, date: &str) -> Todo {
        Todo {
            id: id.to_string(),
            content: format!("task {id}"),
            date: date.to_string(),
            completed: false,
            created_at: String::new(),
        }
    }

    fn day(s: &str) -> NaiveDate {
        parse_day(s).unwrap()
    }

    #[test]
    fn todo_uses_camel_case_keys() {
        let json = r#"{"id":"1","content":"c","date":"2024-01-10","completed":true,"createdAt":"2024-01-10T09:00:00.000Z"}"#;
        let todo: Todo = serde_json::from_str(json).unwrap();
        assert_eq!(todo.created_at, "2024-01-10T09:00:00.000Z");
        assert!(serde_json::to_string(&todo).unwrap().contains("createdAt"));
    }

    #[test]
    fn patch_omits_unset_fields() {
        let json = serde_json::to_string(&TodoPatch::completed(true)).unwrap();
        assert_eq!(json, r#"{"completed":true}"#);
    }

    #[test]
    fn decode_todos_fails_open() {
        assert!(decode_todos(None).is_empty());
        assert!(decode_todos(Some("nope")).is_empty());
        assert!(decode_todos(Some(r#"{"id":"1"}"#)).is_empty());
        assert_eq!(decode_todos(Some(r#"[{"id":"1"}]"#)).len(), 1);
    }

    #[test]
    fn buckets_split_on_today_and_keep_order() {
        let todos = vec![
            todo("1", "2024-01-09"),
            todo("2", "2024-01-10"),
            todo("3", "2024-01-12"),
            todo("4", "2024-01-10"),
        ];

        let buckets = TodoBuckets::split(&todos, day("2024-01-10"));

        let ids = |v: &[Todo]| v.iter().map(|t| t.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&buckets.today), ["2", "4"]);
        assert_eq!(ids(&buckets.weekly), ["1", "3"]);
    }

    #[test]
    fn month_day_formatting() {
        assert_eq!(todo("1", "2024-01-09").month_day(), "1/9");
        assert_eq!(todo("1", "2024-12-25").month_day(), "12/25");
        assert_eq!(todo("1", "soon").month_day(), "soon");
    }

    #[test]
    fn remaining_is_zero_padded() {
        assert_eq!(format_remaining(1200), "20:00");
        assert_eq!(format_remaining(700), "11:40");
        assert_eq!(format_remaining(65), "1:05");
        assert_eq!(format_remaining(0), "0:00");
    }
}
