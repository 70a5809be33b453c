//! Timer service: drives a [`PomodoroTimer`] with a one-second ticker.
//!
//! The ticker is a spawned task owned by the service. It is started when the
//! timer enters `Running` and aborted, under the same lock as the state
//! change, on pause, on completion and when the service is dropped. Every
//! ticker carries the epoch it was started in; a tick from an older epoch,
//! or one that arrives while the timer is not running, is discarded, so no
//! tick can land after a pause has been observed.
//!
//! Completion increments the [`HarvestCounter`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pomodoros_client::clock::SystemClock;
//! use pomodoros_client::harvest::HarvestCounter;
//! use pomodoros_client::jar::CookieJar;
//! use pomodoros_client::service::TimerService;
//! use pomodoros_client::timer::SessionLength;
//!
//! #[tokio::main]
//! async fn main() {
//!     let jar = Arc::new(CookieJar::in_memory());
//!     let harvest = HarvestCounter::load(jar, Arc::new(SystemClock)).unwrap();
//!     let service = TimerService::new(harvest);
//!
//!     service.select(SessionLength::Twenty);
//!     service.start();
//!
//!     let mut updates = service.subscribe();
//!     while updates.changed().await.is_ok() {
//!         println!("{}", updates.borrow().remaining_secs);
//!     }
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::harvest::HarvestCounter;
use crate::timer::{PomodoroTimer, SessionLength, TickOutcome, TimerState};

/// Interval between ticks.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Point-in-time view published to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub selected: Option<SessionLength>,
    pub remaining_secs: u32,
    pub harvest: u32,
    /// Sessions completed since the service was created.
    pub completed_sessions: u32,
}

struct Inner {
    timer: PomodoroTimer,
    harvest: HarvestCounter,
    ticker: Option<JoinHandle<()>>,
    epoch: u64,
    completed_sessions: u32,
    updates: watch::Sender<TimerSnapshot>,
}

impl Inner {
    fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.timer.state(),
            selected: self.timer.selected(),
            remaining_secs: self.timer.remaining_secs(),
            harvest: self.harvest.count(),
            completed_sessions: self.completed_sessions,
        }
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot());
    }

    /// Aborts the current ticker and invalidates its epoch.
    fn stop_ticker(&mut self) {
        self.epoch += 1;
        if let Some(handle) = self.ticker.take() {
            handle.abort();
            trace!(epoch = self.epoch, "Ticker stopped");
        }
    }

    /// Applies one tick. Returns `false` when the ticker should exit.
    fn apply_tick(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch || self.timer.state() != TimerState::Running {
            trace!(epoch, current = self.epoch, "Discarding stale tick");
            return false;
        }

        match self.timer.tick() {
            TickOutcome::Ignored => false,
            TickOutcome::Counting(_) => {
                self.publish();
                true
            }
            TickOutcome::Completed => {
                self.completed_sessions += 1;
                if let Err(err) = self.harvest.increment() {
                    warn!(error = %err, "Failed to persist harvest count");
                }
                info!(harvest = self.harvest.count(), "Pomodoro session completed");
                // Exit instead of aborting: this runs on the ticker task.
                self.epoch += 1;
                self.ticker = None;
                self.publish();
                false
            }
        }
    }
}

/// Owns the timer, the harvest counter and the ticker task.
pub struct TimerService {
    inner: Arc<Mutex<Inner>>,
}

impl TimerService {
    /// Creates an idle service.
    pub fn new(harvest: HarvestCounter) -> Self {
        let timer = PomodoroTimer::new();
        let (updates, _) = watch::channel(TimerSnapshot {
            state: timer.state(),
            selected: None,
            remaining_secs: 0,
            harvest: harvest.count(),
            completed_sessions: 0,
        });

        Self {
            inner: Arc::new(Mutex::new(Inner {
                timer,
                harvest,
                ticker: None,
                epoch: 0,
                completed_sessions: 0,
                updates,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Receives a snapshot after every state change and tick.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.lock().updates.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> TimerSnapshot {
        self.lock().snapshot()
    }

    /// Picks the session length; only allowed while idle.
    pub fn select(&self, length: SessionLength) -> bool {
        let mut inner = self.lock();
        let changed = inner.timer.select(length);
        if changed {
            inner.publish();
        }
        changed
    }

    /// Starts or continues a session and spawns the ticker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut inner = self.lock();
        if !inner.timer.start() {
            return false;
        }
        self.spawn_ticker(&mut inner);
        true
    }

    /// Continues a paused session. Does nothing unless paused.
    pub fn resume(&self) -> bool {
        let mut inner = self.lock();
        if !inner.timer.resume() {
            return false;
        }
        self.spawn_ticker(&mut inner);
        true
    }

    /// Replaces the ticker with one bound to a fresh epoch. Called with the
    /// state lock held, right after entering `Running`.
    fn spawn_ticker(&self, inner: &mut Inner) {
        inner.stop_ticker();
        let epoch = inner.epoch;
        inner.ticker = Some(tokio::spawn(run_ticker(Arc::downgrade(&self.inner), epoch)));
        debug!(epoch, remaining = inner.timer.remaining_secs(), "Timer running");
        inner.publish();
    }

    /// Freezes the session. The ticker is aborted before the lock is
    /// released.
    pub fn pause(&self) -> bool {
        let mut inner = self.lock();
        if !inner.timer.pause() {
            return false;
        }
        inner.stop_ticker();
        debug!(remaining = inner.timer.remaining_secs(), "Timer paused");
        inner.publish();
        true
    }

    /// Abandons the session without counting it.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.stop_ticker();
        inner.timer.reset();
        inner.publish();
    }

    /// Re-checks the harvest day, resetting the count after midnight.
    /// Publishes only when the count changed.
    pub fn refresh_day(&self) {
        let mut inner = self.lock();
        let before = (inner.harvest.date(), inner.harvest.count());
        if let Err(err) = inner.harvest.refresh() {
            warn!(error = %err, "Failed to persist harvest reset");
        }
        if (inner.harvest.date(), inner.harvest.count()) != before {
            inner.publish();
        }
    }

    #[must_use]
    pub fn tomatoes(&self) -> String {
        self.lock().harvest.tomatoes()
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.lock().stop_ticker();
    }
}

async fn run_ticker(inner: Weak<Mutex<Inner>>, epoch: u64) {
    let mut ticker = interval(TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let Some(shared) = inner.upgrade() else {
            break;
        };
        let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.apply_tick(epoch) {
            break;
        }
    }
}
