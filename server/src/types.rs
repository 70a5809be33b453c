//! Todo record types shared by the store and the HTTP gateway.
//!
//! The wire and cookie representation is the same JSON shape:
//!
//! ```json
//! {
//!   "id": "1704877200000",
//!   "content": "write report",
//!   "date": "2024-01-10",
//!   "completed": false,
//!   "createdAt": "2024-01-10T09:00:00.000Z"
//! }
//! ```
//!
//! No schema validation is applied to `content` or `date`; whatever the
//! client sends is stored verbatim.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

/// Calendar date format used by the `date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single dated task with completion status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Unique identifier, the creation instant in epoch milliseconds.
    pub id: String,

    #[serde(default)]
    pub content: String,

    /// ISO calendar date (`YYYY-MM-DD`) deciding the today/weekly bucket.
    #[serde(default)]
    pub date: String,

    #[serde(default)]
    pub completed: bool,

    /// Creation instant as an ISO-8601 timestamp.
    #[serde(default)]
    pub created_at: String,
}

impl Todo {
    /// Builds a new record from client input, assigning `id` and `createdAt`
    /// from `now`.
    ///
    /// Two records created within the same millisecond share an id.
    #[must_use]
    pub fn create(input: NewTodo, now: DateTime<Utc>) -> Self {
        Self {
            id: id_from_instant(now),
            content: input.content,
            date: input.date,
            completed: input.completed,
            created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Returns the parsed calendar date, if `date` is well formed.
    #[must_use]
    pub fn day(&self) -> Option<NaiveDate> {
        parse_day(&self.date)
    }
}

/// Request body for creating a todo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTodo {
    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub date: String,

    #[serde(default)]
    pub completed: bool,
}

/// Partial update; fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    /// Shallow-merges the provided fields into `todo`.
    pub fn apply_to(&self, todo: &mut Todo) {
        if let Some(content) = &self.content {
            todo.content.clone_from(content);
        }
        if let Some(date) = &self.date {
            todo.date.clone_from(date);
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
    }
}

/// Request body for `PUT /api/todos`: the target id plus the changed fields.
///
/// Ids are compared as strings. A missing id, or one sent as a number or any
/// other non-string JSON value, matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    #[serde(default, deserialize_with = "string_id")]
    pub id: Option<String>,

    #[serde(flatten)]
    pub patch: TodoPatch,
}

fn string_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Other(IgnoredAny),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => Some(id),
        RawId::Other(_) => None,
    })
}

/// Parses a `YYYY-MM-DD` calendar date, ignoring surrounding whitespace.
#[must_use]
pub fn parse_day(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).ok()
}

/// Returns `true` if `date` falls strictly before `today`.
///
/// Unparseable dates are never considered past.
#[must_use]
pub fn is_past_day(date: &str, today: NaiveDate) -> bool {
    parse_day(date).is_some_and(|day| day < today)
}

fn id_from_instant(now: DateTime<Utc>) -> String {
    now.timestamp_millis().to_string()
}
