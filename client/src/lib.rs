//! Weekly Pomodoros client.
//!
//! This crate holds everything on the user's side of the gateway:
//!
//! - [`jar`]: persistent cookie storage, shared with the HTTP client
//! - [`api`]: calls to the `/api/todos` gateway
//! - [`cache`]: the cached todo list, its freshness window and the
//!   calendar-day guard that runs before every mutation
//! - [`timer`]: the Pomodoro session state machine
//! - [`service`]: the one-second ticker that drives the timer
//! - [`harvest`]: the per-day count of completed sessions
//! - [`types`]: todo records and presentation helpers
//!
//! The `pomodoros` binary is a thin terminal front-end over these modules.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod harvest;
pub mod jar;
pub mod service;
pub mod timer;
pub mod types;

pub use api::{ApiError, TodoApi};
pub use cache::{MutationOutcome, TodoCache};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::{ClientError, GuardViolation};
pub use harvest::HarvestCounter;
pub use jar::{CookieJar, JarError};
pub use service::{TimerService, TimerSnapshot};
pub use timer::{PomodoroTimer, SessionLength, TickOutcome, TimerState};
pub use types::{format_remaining, NewTodo, Todo, TodoBuckets, TodoPatch};
