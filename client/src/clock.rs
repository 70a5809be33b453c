//! Source of the current calendar day.
//!
//! The date guard and the harvest rollover both compare against "today" in
//! local time. They read it through [`Clock`] so tests can pin or advance
//! the day.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Local, NaiveDate};

/// Provides the current local calendar day.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A settable day, shared between clones.
#[derive(Debug, Clone)]
pub struct FixedClock {
    day: Arc<Mutex<NaiveDate>>,
}

impl FixedClock {
    #[must_use]
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day: Arc::new(Mutex::new(day)),
        }
    }

    /// Moves every clone of this clock to `day`.
    pub fn set(&self, day: NaiveDate) {
        *self.day.lock().unwrap_or_else(PoisonError::into_inner) = day;
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.day.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_shared_between_clones() {
        let clock = FixedClock::new(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        let other = clock.clone();

        other.set(NaiveDate::from_ymd_opt(2024, 1, 11).unwrap());

        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 11).unwrap());
    }
}
