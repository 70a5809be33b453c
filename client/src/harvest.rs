//! Daily harvest counter.
//!
//! Counts completed Pomodoro sessions for the current local day in the
//! `tomatoDate` / `tomatoCount` cookie pair, each written with a one-day
//! expiry. A stored count is only trusted when `tomatoDate` is today;
//! otherwise the counter resets to zero and rewrites both cookies.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::jar::{CookieJar, JarError};
use crate::types::{parse_day, DATE_FORMAT};

pub const TOMATO_DATE_COOKIE: &str = "tomatoDate";
pub const TOMATO_COUNT_COOKIE: &str = "tomatoCount";

/// Lifetime of the harvest cookies after each write.
pub fn harvest_ttl() -> Duration {
    Duration::days(1)
}

/// Per-day count of completed sessions.
pub struct HarvestCounter {
    jar: Arc<CookieJar>,
    clock: Arc<dyn Clock>,
    date: NaiveDate,
    count: u32,
}

impl HarvestCounter {
    /// Loads today's count from `jar`, resetting it if the stored day is
    /// not today or the count is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if a reset cannot be written to the jar.
    pub fn load(jar: Arc<CookieJar>, clock: Arc<dyn Clock>) -> Result<Self, JarError> {
        let today = clock.today();
        let mut counter = Self {
            jar,
            clock,
            date: today,
            count: 0,
        };
        counter.sync_day(today)?;
        Ok(counter)
    }

    /// Re-checks the day and resets if it has changed since the last check.
    ///
    /// # Errors
    ///
    /// Returns an error if a reset cannot be written to the jar.
    pub fn refresh(&mut self) -> Result<(), JarError> {
        let today = self.clock.today();
        if today != self.date {
            self.sync_day(today)?;
        }
        Ok(())
    }

    /// Records one completed session and persists the new count.
    ///
    /// # Errors
    ///
    /// Returns an error if the day rollover or the count cannot be written
    /// to the jar. The in-memory count is incremented regardless.
    pub fn increment(&mut self) -> Result<u32, JarError> {
        let rollover = self.refresh();
        self.count += 1;
        info!(count = self.count, date = %self.date, "Pomodoro harvested");
        let persisted = self
            .jar
            .set(TOMATO_COUNT_COOKIE, self.count.to_string(), harvest_ttl());
        rollover.and(persisted).map(|()| self.count)
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Day the count belongs to.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// One tomato per completed session.
    #[must_use]
    pub fn tomatoes(&self) -> String {
        "🍅".repeat(self.count as usize)
    }

    fn sync_day(&mut self, today: NaiveDate) -> Result<(), JarError> {
        self.date = today;

        let stored_day = self.jar.get(TOMATO_DATE_COOKIE).as_deref().and_then(parse_day);
        let stored_count = self
            .jar
            .get(TOMATO_COUNT_COOKIE)
            .and_then(|v| v.trim().parse::<u32>().ok());

        if let (Some(day), Some(count)) = (stored_day, stored_count) {
            if day == today {
                debug!(count, "Loaded today's harvest");
                self.count = count;
                return Ok(());
            }
        }

        debug!(?stored_day, %today, "Resetting harvest for new day");
        self.count = 0;
        self.jar.set(
            TOMATO_DATE_COOKIE,
            today.format(DATE_FORMAT).to_string(),
            harvest_ttl(),
        )?;
        self.jar.set(TOMATO_COUNT_COOKIE, "0", harvest_ttl())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use tokio_test::{assert_err, assert_ok};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seeded_jar(date: &str, count: &str) -> Arc<CookieJar> {
        let jar = CookieJar::in_memory();
        jar.set(TOMATO_DATE_COOKIE, date, harvest_ttl()).unwrap();
        jar.set(TOMATO_COUNT_COOKIE, count, harvest_ttl()).unwrap();
        Arc::new(jar)
    }

    #[test]
    fn empty_jar_starts_at_zero_and_writes_both_cookies() {
        let jar = Arc::new(CookieJar::in_memory());
        let clock = Arc::new(FixedClock::new(day(2024, 1, 10)));

        let counter = HarvestCounter::load(jar.clone(), clock).unwrap();

        assert_eq!(counter.count(), 0);
        assert_eq!(jar.get(TOMATO_DATE_COOKIE).as_deref(), Some("2024-01-10"));
        assert_eq!(jar.get(TOMATO_COUNT_COOKIE).as_deref(), Some("0"));
    }

    #[test]
    fn same_day_count_is_loaded() {
        let jar = seeded_jar("2024-01-10", "4");
        let clock = Arc::new(FixedClock::new(day(2024, 1, 10)));

        let counter = HarvestCounter::load(jar, clock).unwrap();

        assert_eq!(counter.count(), 4);
        assert_eq!(counter.tomatoes(), "🍅🍅🍅🍅");
    }

    #[test]
    fn yesterday_count_is_reset() {
        let jar = seeded_jar("2024-01-09", "7");
        let clock = Arc::new(FixedClock::new(day(2024, 1, 10)));

        let counter = HarvestCounter::load(jar.clone(), clock).unwrap();

        assert_eq!(counter.count(), 0);
        assert_eq!(jar.get(TOMATO_DATE_COOKIE).as_deref(), Some("2024-01-10"));
        assert_eq!(jar.get(TOMATO_COUNT_COOKIE).as_deref(), Some("0"));
    }

    #[test]
    fn unparseable_count_is_reset() {
        let jar = seeded_jar("2024-01-10", "many");
        let clock = Arc::new(FixedClock::new(day(2024, 1, 10)));

        let counter = HarvestCounter::load(jar, clock).unwrap();
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn increment_persists() {
        let jar = Arc::new(CookieJar::in_memory());
        let clock = Arc::new(FixedClock::new(day(2024, 1, 10)));
        let mut counter = HarvestCounter::load(jar.clone(), clock.clone()).unwrap();

        assert_eq!(assert_ok!(counter.increment()), 1);
        assert_eq!(assert_ok!(counter.increment()), 2);
        assert_eq!(jar.get(TOMATO_COUNT_COOKIE).as_deref(), Some("2"));

        let reloaded = HarvestCounter::load(jar, clock).unwrap();
        assert_eq!(reloaded.count(), 2);
    }

    #[test]
    fn day_change_resets_before_increment() {
        let jar = Arc::new(CookieJar::in_memory());
        let clock = FixedClock::new(day(2024, 1, 10));
        let mut counter = HarvestCounter::load(jar.clone(), Arc::new(clock.clone())).unwrap();
        counter.increment().unwrap();
        counter.increment().unwrap();

        clock.set(day(2024, 1, 11));
        assert_eq!(counter.increment().unwrap(), 1);
        assert_eq!(counter.date(), day(2024, 1, 11));
        assert_eq!(jar.get(TOMATO_DATE_COOKIE).as_deref(), Some("2024-01-11"));
    }

    #[test]
    fn failed_rollover_write_still_counts_in_memory() {
        let dir = tempfile::TempDir::new().unwrap();
        let data_dir = dir.path().join("data");
        let jar = Arc::new(CookieJar::open(data_dir.join("cookies.json")).unwrap());
        let clock = FixedClock::new(day(2024, 1, 10));
        let mut counter = HarvestCounter::load(jar, Arc::new(clock.clone())).unwrap();

        // Make the data directory unwritable by replacing it with a file.
        std::fs::remove_dir_all(&data_dir).unwrap();
        std::fs::write(&data_dir, "").unwrap();

        clock.set(day(2024, 1, 11));
        assert_err!(counter.increment());
        assert_eq!(counter.count(), 1);
        assert_eq!(counter.date(), day(2024, 1, 11));
    }

    #[test]
    fn no_tomatoes_when_zero() {
        let counter =
            HarvestCounter::load(Arc::new(CookieJar::in_memory()), Arc::new(FixedClock::new(day(2024, 1, 10))))
                .unwrap();
        assert_eq!(counter.tomatoes(), "");
    }
}
