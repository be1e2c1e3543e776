//! Time windows and the incremental window plan

use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Wire format for run dates, filenames, and normalized timestamps
/// (UTC, millisecond precision).
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A half-open `[start, end)` date range
///
/// Consecutive windows of a plan share a boundary instant; the half-open
/// contract is what prevents a record landing in two windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Inclusive lower bound
    pub start: DateTime<Utc>,
    /// Exclusive upper bound
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a new window
    ///
    /// # Panics
    /// Panics if `start >= end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start < end, "Window start must precede its end");
        Self { start, end }
    }

    /// Check whether an instant falls inside the window
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// Window length
    pub fn length(&self) -> Duration {
        self.end - self.start
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// Lazy sequence of disjoint windows covering `[from, to]`
///
/// The plan emits `[cursor, cursor + range)` and advances `cursor` to the
/// emitted end while `cursor <= to`. It is finite and not restartable: each
/// window's start is the previous window's end. The final window's end may
/// exceed `to`. An inverted range (`from > to`) yields an empty plan, which
/// is not an error.
#[derive(Debug, Clone)]
pub struct WindowPlan {
    cursor: DateTime<Utc>,
    finish: DateTime<Utc>,
    range: Duration,
}

impl WindowPlan {
    /// Create a plan over `[from, to]` with windows of `range_days` days
    ///
    /// # Panics
    /// Panics if `range_days` is zero
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>, range_days: u32) -> Self {
        assert!(range_days >= 1, "Window range must be at least one day");
        Self {
            cursor: from,
            finish: to,
            range: Duration::days(i64::from(range_days)),
        }
    }

    /// Number of windows the plan will emit
    pub fn remaining(&self) -> usize {
        if self.cursor > self.finish {
            return 0;
        }
        let span = (self.finish - self.cursor).num_milliseconds();
        let step = self.range.num_milliseconds();
        (span / step) as usize + 1
    }
}

impl Iterator for WindowPlan {
    type Item = TimeWindow;

    fn next(&mut self) -> Option<TimeWindow> {
        if self.cursor > self.finish {
            return None;
        }
        let start = self.cursor;
        let end = start + self.range;
        self.cursor = end;
        Some(TimeWindow { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_window_contains_is_half_open() {
        let w = TimeWindow::new(date(2024, 1, 1), date(2024, 1, 2));
        assert!(w.contains(date(2024, 1, 1)));
        assert!(!w.contains(date(2024, 1, 2)));
    }

    #[test]
    #[should_panic]
    fn test_inverted_window_panics() {
        TimeWindow::new(date(2024, 1, 2), date(2024, 1, 1));
    }

    #[test]
    fn test_three_day_run_yields_three_windows() {
        let windows: Vec<TimeWindow> =
            WindowPlan::new(date(2024, 1, 1), date(2024, 1, 3), 1).collect();

        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0], TimeWindow::new(date(2024, 1, 1), date(2024, 1, 2)));
        assert_eq!(windows[1], TimeWindow::new(date(2024, 1, 2), date(2024, 1, 3)));
        assert_eq!(windows[2], TimeWindow::new(date(2024, 1, 3), date(2024, 1, 4)));
    }

    #[test]
    fn test_equal_bounds_yield_single_window() {
        let windows: Vec<TimeWindow> =
            WindowPlan::new(date(2024, 6, 1), date(2024, 6, 1), 7).collect();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].end, date(2024, 6, 8));
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let mut plan = WindowPlan::new(date(2024, 1, 3), date(2024, 1, 1), 1);
        assert_eq!(plan.remaining(), 0);
        assert!(plan.next().is_none());
    }

    #[test]
    fn test_final_window_may_overshoot_finish() {
        let windows: Vec<TimeWindow> =
            WindowPlan::new(date(2024, 1, 1), date(2024, 1, 4), 3).collect();

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].start, date(2024, 1, 4));
        assert_eq!(windows[1].end, date(2024, 1, 7));
    }

    #[test]
    fn test_remaining_matches_iteration() {
        let plan = WindowPlan::new(date(2024, 1, 1), date(2024, 2, 15), 7);
        assert_eq!(plan.remaining(), plan.clone().count());
    }
}
