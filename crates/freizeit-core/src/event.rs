//! Event types for the availability engine.
//!
//! This module provides:
//! - [`EventTime`]: an event boundary, either a concrete instant or an
//!   all-day date
//! - [`CalendarEvent`]: the normalized event value object flowing
//!   through the pipeline
//! - [`EventIdentity`]: the (start, end, summary) triple used for
//!   incremental deduplication

use std::cmp::Ordering;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::TimeSpan;

/// A boundary of a calendar event.
///
/// Timed boundaries are stored as UTC instants once normalized; the
/// all-day variant carries only a date, marking the event as
/// date-granular ("full-day").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific instant, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day date (no time-of-day).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates a timed boundary from a UTC instant.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates an all-day boundary from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns true if this is an all-day boundary.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the instant if this is a timed boundary.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            Self::AllDay(_) => None,
        }
    }

    /// Converts to a UTC instant for ordering purposes.
    ///
    /// All-day boundaries compare at midnight UTC of their date.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => date.and_time(NaiveTime::MIN).and_utc(),
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

/// The identity triple of an event.
///
/// Two events are duplicates iff their start, end, and summary are all
/// equal; every other field (uid, color, category) is ignored for
/// incremental merging.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventIdentity {
    pub start: EventTime,
    pub end: EventTime,
    pub summary: Option<String>,
}

/// A normalized calendar event.
///
/// Created either by parsing a source feed or synthesized by the engine
/// (free-time slots, sleep periods, status intervals). Expanded
/// recurrence occurrences are independent values: they copy the
/// template's fields but never retain the rule itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Unique identifier.
    pub uid: String,
    /// The event label (SUMMARY).
    pub summary: Option<String>,
    /// When the event starts.
    pub start: EventTime,
    /// When the event ends.
    pub end: EventTime,
    /// Free-text category/description annotation.
    pub category: Option<String>,
    /// Color tag (e.g. `#FFC0CB`).
    pub color: Option<String>,
    /// Marks the event as non-blocking/advisory (TRANSP:TRANSPARENT).
    pub transparent: bool,
    /// Creation timestamp (DTSTAMP).
    pub created: Option<DateTime<Utc>>,
}

impl CalendarEvent {
    /// Creates an event with the given uid and bounds.
    pub fn new(uid: impl Into<String>, start: EventTime, end: EventTime) -> Self {
        Self {
            uid: uid.into(),
            summary: None,
            start,
            end,
            category: None,
            color: None,
            transparent: false,
            created: None,
        }
    }

    /// Creates a timed event covering the given span.
    pub fn timed(uid: impl Into<String>, span: TimeSpan) -> Self {
        Self::new(
            uid,
            EventTime::from_utc(span.start),
            EventTime::from_utc(span.end),
        )
    }

    /// Synthesizes a new engine-owned event for a span, minting a fresh
    /// uid and creation timestamp.
    pub fn synthesized(summary: impl Into<String>, span: TimeSpan) -> Self {
        let mut event = Self::timed(Uuid::new_v4().to_string(), span);
        event.summary = Some(summary.into());
        event.created = Some(Utc::now());
        event
    }

    /// Returns true if this is a full-day event.
    ///
    /// Full-day events are excluded from busy/free computation.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Returns the span of a timed event, or `None` for full-day
    /// events.
    pub fn span(&self) -> Option<TimeSpan> {
        match (self.start.as_datetime(), self.end.as_datetime()) {
            (Some(start), Some(end)) if start <= end => Some(TimeSpan::new(start, end)),
            _ => None,
        }
    }

    /// Returns the event's duration.
    ///
    /// All-day boundaries count as midnight UTC.
    pub fn duration(&self) -> Duration {
        self.end.to_utc_datetime() - self.start.to_utc_datetime()
    }

    /// Returns the (start, end, summary) dedup triple.
    pub fn identity(&self) -> EventIdentity {
        EventIdentity {
            start: self.start,
            end: self.end,
            summary: self.summary.clone(),
        }
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to set the category annotation.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Builder method to set the color tag.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Builder method to mark the event transparent (non-blocking).
    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    /// Builder method to set the creation timestamp.
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }
}
