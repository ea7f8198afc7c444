//! Time types for the availability engine.
//!
//! This module provides [`TimeSpan`] for representing busy and free
//! intervals (a plain (start, end) pair with no identity beyond its
//! bounds), and [`CalendarWindow`] for the rolling bound within which
//! recurrence expansion, aggregation, and inversion operate.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A time span, `start <= end`, in UTC.
///
/// Used both as the unit of busy time (an event reduced to its bounds)
/// and as the unit of free time (an inverter output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpan {
    /// Start of the span (inclusive).
    pub start: DateTime<Utc>,
    /// End of the span (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeSpan {
    /// Creates a new time span.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeSpan start must be <= end");
        Self { start, end }
    }

    /// Returns the duration of this span.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns true if the span covers no time at all.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Checks if a datetime falls within this span.
    ///
    /// Uses half-open interval semantics: `[start, end)`.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }

    /// Checks if this span overlaps another.
    ///
    /// Spans that merely abut (one's end equals the other's start) do
    /// not overlap.
    pub fn overlaps(&self, other: &TimeSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// The bound within which the engine computes.
///
/// Derived from "now" plus a configured lookahead; recurrence expansion
/// and interval inversion never look outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (inclusive for occurrence starts).
    pub end: DateTime<Utc>,
}

impl CalendarWindow {
    /// Creates a new window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "CalendarWindow start must be <= end");
        Self { start, end }
    }

    /// Creates the rolling window: midnight of "today" in the given
    /// zone, extending `lookahead_days` into the future.
    ///
    /// Midnight is resolved in the zone (so the window boundary tracks
    /// local days, not UTC days) and then converted back to UTC. On the
    /// rare ambiguous local midnight the earlier instant is used.
    pub fn from_midnight(now: DateTime<Utc>, tz: &Tz, lookahead_days: i64) -> Self {
        let local_today = now.with_timezone(tz).date_naive();
        let midnight = local_today.and_time(NaiveTime::MIN);
        let start = tz
            .from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            // A zone skipping midnight entirely; fall back to the raw instant.
            .unwrap_or(now);
        Self::new(start, start + Duration::days(lookahead_days))
    }

    /// Returns the duration of this window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if a datetime falls within the window, both bounds
    /// inclusive (recurrence occurrence starts on either boundary are
    /// kept).
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt <= self.end
    }

    /// Returns the whole window as a single span.
    pub fn as_span(&self) -> TimeSpan {
        TimeSpan::new(self.start, self.end)
    }
}
