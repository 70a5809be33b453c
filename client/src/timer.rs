//! Pomodoro session state machine.
//!
//! [`PomodoroTimer`] is pure: it never spawns or sleeps. Something else
//! calls [`tick`](PomodoroTimer::tick) once per second while the timer is
//! [`TimerState::Running`]; see [`crate::service::TimerService`].
//!
//! ```text
//!            select(d)                 pause
//!   Idle ───────────────▶ Idle ─start─▶ Running ─────▶ Paused
//!    ▲                                 │   ▲            │
//!    │         tick reaches 0          │   └─resume─────┘
//!    └─────────────────────────────────┘
//! ```
//!
//! The state is never persisted; a new timer always starts idle.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Selectable session lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionLength {
    Twenty,
    Thirty,
    Sixty,
}

impl SessionLength {
    pub const ALL: [Self; 3] = [Self::Twenty, Self::Thirty, Self::Sixty];

    #[must_use]
    pub fn minutes(self) -> u32 {
        match self {
            Self::Twenty => 20,
            Self::Thirty => 30,
            Self::Sixty => 60,
        }
    }

    #[must_use]
    pub fn seconds(self) -> u32 {
        self.minutes() * 60
    }
}

impl TryFrom<u32> for SessionLength {
    type Error = u32;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        match minutes {
            20 => Ok(Self::Twenty),
            30 => Ok(Self::Thirty),
            60 => Ok(Self::Sixty),
            other => Err(other),
        }
    }
}

impl fmt::Display for SessionLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.minutes())
    }
}

/// Observable timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer is not running; nothing changed.
    Ignored,
    /// One second elapsed; this many remain.
    Counting(u32),
    /// The session finished and the timer folded back to idle.
    Completed,
}

/// Countdown for one Pomodoro session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomodoroTimer {
    selected: Option<SessionLength>,
    remaining_secs: u32,
    running: bool,
    paused: bool,
}

impl PomodoroTimer {
    /// An idle timer with nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> TimerState {
        match (self.running, self.paused) {
            (true, false) => TimerState::Running,
            (_, true) => TimerState::Paused,
            (false, false) => TimerState::Idle,
        }
    }

    #[must_use]
    pub fn selected(&self) -> Option<SessionLength> {
        self.selected
    }

    /// Selected minutes, `0` when nothing is selected.
    #[must_use]
    pub fn selected_minutes(&self) -> u32 {
        self.selected.map_or(0, SessionLength::minutes)
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Picks the session length. Only allowed while idle.
    pub fn select(&mut self, length: SessionLength) -> bool {
        if self.state() != TimerState::Idle {
            debug!(state = ?self.state(), "Ignoring duration change outside Idle");
            return false;
        }
        self.selected = Some(length);
        true
    }

    /// Starts a new session from idle, or continues a paused one.
    ///
    /// From idle the countdown is reset to the selected length; without a
    /// selection nothing happens. From paused the frozen remaining time is
    /// kept. Returns whether the timer is now running as a result of this
    /// call.
    pub fn start(&mut self) -> bool {
        match self.state() {
            TimerState::Running => false,
            TimerState::Paused => {
                self.running = true;
                self.paused = false;
                true
            }
            TimerState::Idle => {
                let Some(length) = self.selected else {
                    return false;
                };
                self.remaining_secs = length.seconds();
                self.running = true;
                self.paused = false;
                true
            }
        }
    }

    /// Continues a paused session.
    pub fn resume(&mut self) -> bool {
        self.state() == TimerState::Paused && self.start()
    }

    /// Freezes a running session.
    pub fn pause(&mut self) -> bool {
        if self.state() != TimerState::Running {
            return false;
        }
        self.paused = true;
        true
    }

    /// Abandons any session in progress and returns to idle. The selected
    /// length is kept.
    pub fn reset(&mut self) {
        self.running = false;
        self.paused = false;
        self.remaining_secs = 0;
    }

    /// Advances the countdown by one second.
    ///
    /// Reaching zero completes the session: the flags are cleared, the
    /// remaining time is zero and [`TickOutcome::Completed`] is returned so
    /// the caller can record the harvest.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state() != TimerState::Running {
            return TickOutcome::Ignored;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.reset();
            return TickOutcome::Completed;
        }
        TickOutcome::Counting(self.remaining_secs)
    }
}
