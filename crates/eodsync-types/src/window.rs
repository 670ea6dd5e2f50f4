//! Fetch window computation.

use chrono::{Days, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::WindowError;

/// First calendar day the history table may cover when the store is empty.
pub const DEFAULT_EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(2000, 1, 1) {
    Some(date) => date,
    None => panic!("invalid epoch"),
};

/// Determines where a run's window ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Incremental update: the window ends today (exclusive).
    #[default]
    Daily,
    /// Historical load: the window ends yesterday (exclusive), in case the
    /// latest close is not published yet.
    Bulk,
}

impl RunMode {
    /// Returns the exclusive end of the window for a run on `today`.
    #[must_use]
    pub fn window_end(self, today: NaiveDate) -> NaiveDate {
        match self {
            Self::Daily => today,
            Self::Bulk => today.pred_opt().unwrap_or(today),
        }
    }

    /// Returns the mode as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Bulk => "bulk",
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Half-open range of calendar days `[start, end)` requested by one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchWindow {
    /// First day requested (inclusive).
    pub start: NaiveDate,
    /// Day after the last day requested (exclusive).
    pub end: NaiveDate,
}

impl FetchWindow {
    /// Creates a window, validating that it contains at least one day.
    ///
    /// # Errors
    ///
    /// Returns an error if `start >= end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        if start >= end {
            return Err(WindowError::Empty { start, end });
        }
        Ok(Self { start, end })
    }

    /// Computes the window for a run.
    ///
    /// The window starts the day after `last_persisted` (or at `epoch` when
    /// the store holds no rows) and ends per `mode`. Returns `None` when
    /// there is nothing to fetch.
    #[must_use]
    pub fn compute(
        last_persisted: Option<NaiveDate>,
        today: NaiveDate,
        mode: RunMode,
        epoch: NaiveDate,
    ) -> Option<Self> {
        let start = match last_persisted {
            Some(last) => last.checked_add_days(Days::new(1))?,
            None => epoch,
        };
        Self::new(start, mode.window_end(today)).ok()
    }

    /// Returns the number of calendar days in the window.
    #[must_use]
    pub fn total_days(&self) -> usize {
        (self.end - self.start).num_days() as usize
    }

    /// Returns every calendar day in the window, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(|d| *d < self.end)
    }

    /// Returns true if the window contains the given date.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Unix timestamp of midnight UTC at the window start.
    #[must_use]
    pub fn start_timestamp(&self) -> i64 {
        midnight_utc(self.start)
    }

    /// Unix timestamp of midnight UTC at the window end.
    #[must_use]
    pub fn end_timestamp(&self) -> i64 {
        midnight_utc(self.end)
    }
}

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

impl std::fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_after_last_persisted() {
        let window =
            FetchWindow::compute(Some(date(2023, 6, 1)), date(2023, 6, 5), RunMode::Daily, DEFAULT_EPOCH)
                .unwrap();

        assert_eq!(window.start, date(2023, 6, 2));
        assert_eq!(window.end, date(2023, 6, 5));
        assert_eq!(window.total_days(), 3);
    }

    #[test]
    fn test_window_empty_when_current() {
        let today = date(2023, 6, 5);
        assert!(FetchWindow::compute(Some(today), today, RunMode::Daily, DEFAULT_EPOCH).is_none());

        let yesterday = date(2023, 6, 4);
        assert!(FetchWindow::compute(Some(yesterday), today, RunMode::Daily, DEFAULT_EPOCH).is_none());
    }

    #[test]
    fn test_window_from_epoch() {
        let window = FetchWindow::compute(None, date(2000, 1, 10), RunMode::Bulk, DEFAULT_EPOCH).unwrap();

        assert_eq!(window.start, DEFAULT_EPOCH);
        assert_eq!(window.end, date(2000, 1, 9));
    }

    #[test]
    fn test_days_half_open() {
        let window = FetchWindow::new(date(2024, 2, 27), date(2024, 3, 2)).unwrap();
        let days: Vec<_> = window.days().collect();

        assert_eq!(
            days,
            vec![date(2024, 2, 27), date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1)]
        );
        assert!(!window.contains(date(2024, 3, 2)));
    }

    #[test]
    fn test_timestamps() {
        let window = FetchWindow::new(date(2000, 1, 1), date(2023, 10, 16)).unwrap();

        assert_eq!(window.start_timestamp(), 946_684_800);
        assert_eq!(window.end_timestamp(), 1_697_414_400);
    }

    #[test]
    fn test_new_rejects_inverted() {
        let result = FetchWindow::new(date(2024, 1, 2), date(2024, 1, 1));
        assert!(matches!(result, Err(WindowError::Empty { .. })));
    }
}
