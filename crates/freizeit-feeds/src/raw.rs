//! Raw event type from calendar feeds.
//!
//! This module defines [`RawFeedEvent`], a representation of event data
//! as it comes out of an ICS feed, before timezone promotion and
//! recurrence expansion.
//!
//! Unlike the normalized [`CalendarEvent`](freizeit_core::CalendarEvent),
//! a raw event keeps the distinction between UTC, zoned, and floating
//! times, because floating times still need the configured default zone
//! applied to them.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// The time specification for a raw feed event.
///
/// ICS feeds express times in four forms:
/// - UTC instants (`DTSTART:20250303T090000Z`)
/// - zoned local times (`DTSTART;TZID=Europe/Berlin:20250303T100000`)
/// - floating local times with no zone at all
/// - bare dates for all-day events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum RawFeedTime {
    /// A specific instant in UTC.
    Utc(DateTime<Utc>),
    /// A local time in a named IANA zone.
    Zoned {
        date_time: NaiveDateTime,
        tzid: String,
    },
    /// A local time with no zone attached.
    Floating(NaiveDateTime),
    /// An all-day event date.
    Date(NaiveDate),
}

impl RawFeedTime {
    /// Creates a raw time from a UTC instant.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::Utc(dt)
    }

    /// Creates a zoned raw time.
    pub fn zoned(date_time: NaiveDateTime, tzid: impl Into<String>) -> Self {
        Self::Zoned {
            date_time,
            tzid: tzid.into(),
        }
    }

    /// Creates a floating raw time.
    pub fn floating(date_time: NaiveDateTime) -> Self {
        Self::Floating(date_time)
    }

    /// Creates an all-day raw time.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::Date(date)
    }

    /// Returns true if this is an all-day time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Returns true if this time has no zone attached.
    pub fn is_floating(&self) -> bool {
        matches!(self, Self::Floating(_))
    }
}

/// A raw calendar event from an ICS feed.
///
/// Carries every field the engine cares about; recurrence rules are
/// kept as raw RRULE text and expanded during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFeedEvent {
    /// Unique identifier from the feed.
    pub uid: String,

    /// When the event starts.
    pub start: RawFeedTime,

    /// When the event ends.
    pub end: RawFeedTime,

    /// The event title/summary.
    pub summary: Option<String>,

    /// The event description.
    pub description: Option<String>,

    /// The feed this event came from.
    pub source_id: String,

    /// Raw RRULE text, if the event recurs.
    pub rrule: Option<String>,

    /// When the event record was created (DTSTAMP).
    pub created: Option<DateTime<Utc>>,
}

impl RawFeedEvent {
    /// Creates a new raw event with the minimum required fields.
    pub fn new(
        uid: impl Into<String>,
        start: RawFeedTime,
        end: RawFeedTime,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            start,
            end,
            source_id: source_id.into(),
            summary: None,
            description: None,
            rrule: None,
            created: None,
        }
    }

    /// Returns true if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Returns true if this event carries a recurrence rule.
    pub fn is_recurring(&self) -> bool {
        self.rrule.is_some()
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the recurrence rule.
    pub fn with_rrule(mut self, rrule: impl Into<String>) -> Self {
        self.rrule = Some(rrule.into());
        self
    }

    /// Builder method to set the creation timestamp.
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }
}
