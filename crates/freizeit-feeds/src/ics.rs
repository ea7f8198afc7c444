//! ICS/iCalendar feed parsing.
//!
//! This module parses iCalendar (RFC 5545) data into [`RawFeedEvent`]s,
//! preserving the time form (UTC, zoned, floating, date) of each
//! boundary so that normalization can apply the default zone where
//! needed. VTIMEZONE components are captured verbatim so the publisher
//! can carry them into the output artifact.

use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event,
};
use tracing::{debug, warn};

use crate::error::{FeedError, FeedResult};
use crate::raw::{RawFeedEvent, RawFeedTime};

/// The result of parsing one ICS feed.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    /// The events found in the feed.
    pub events: Vec<RawFeedEvent>,
    /// VTIMEZONE components captured for re-emission.
    pub timezones: Vec<CalendarComponent>,
}

/// Parses ICS content into raw events and captured timezones.
///
/// Events missing a UID or DTSTART are skipped with a warning; an
/// unparsable feed as a whole is a [`FeedError::parse`] so the caller
/// can isolate the broken source.
pub fn parse_feed(ics: &str, source_id: &str) -> FeedResult<ParsedFeed> {
    let calendar: Calendar = ics
        .parse()
        .map_err(|e: String| FeedError::parse(e).with_source_id(source_id))?;

    let mut events = Vec::new();
    let mut timezones = Vec::new();

    for component in calendar.iter() {
        match component {
            CalendarComponent::Event(event) => {
                if let Some(raw) = parse_event(event, source_id) {
                    events.push(raw);
                }
            }
            CalendarComponent::Other(other) if other.component_kind() == "VTIMEZONE" => {
                timezones.push(component.clone());
            }
            _ => {}
        }
    }

    debug!(
        source = source_id,
        events = events.len(),
        timezones = timezones.len(),
        "parsed feed"
    );
    Ok(ParsedFeed { events, timezones })
}

/// Parses a single VEVENT component into a raw event.
fn parse_event(event: &Event, source_id: &str) -> Option<RawFeedEvent> {
    let Some(uid) = event.get_uid() else {
        warn!(source = source_id, "skipping event without UID");
        return None;
    };
    let Some(start_dt) = event.get_start() else {
        warn!(source = source_id, uid, "skipping event without DTSTART");
        return None;
    };
    // A VEVENT without DTEND is instantaneous.
    let end_dt = event.get_end().unwrap_or_else(|| start_dt.clone());

    let start = convert_date_time(start_dt);
    let end = convert_date_time(end_dt);

    let mut raw = RawFeedEvent::new(uid, start, end, source_id);

    if let Some(summary) = event.get_summary() {
        raw = raw.with_summary(summary);
    }
    if let Some(description) = event.get_description() {
        raw = raw.with_description(description);
    }
    if let Some(rrule) = event.property_value("RRULE") {
        raw = raw.with_rrule(rrule);
    }
    if let Some(created) = event.get_timestamp() {
        raw = raw.with_created(created);
    }

    Some(raw)
}

/// Converts icalendar's DatePerhapsTime to RawFeedTime, keeping the
/// time form intact.
fn convert_date_time(dt: DatePerhapsTime) -> RawFeedTime {
    match dt {
        DatePerhapsTime::Date(date) => RawFeedTime::from_date(date),
        DatePerhapsTime::DateTime(cdt) => match cdt {
            CalendarDateTime::Utc(dt) => RawFeedTime::from_utc(dt),
            CalendarDateTime::Floating(naive) => RawFeedTime::floating(naive),
            CalendarDateTime::WithTimezone { date_time, tzid } => {
                RawFeedTime::zoned(date_time, tzid)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn sample_ics() -> &'static str {
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Test//Test//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:utc-event@example.com\r\n\
         DTSTAMP:20250301T120000Z\r\n\
         DTSTART:20250303T090000Z\r\n\
         DTEND:20250303T100000Z\r\n\
         SUMMARY:Team Meeting\r\n\
         DESCRIPTION:Weekly sync meeting\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR"
    }

    fn zoned_ics() -> &'static str {
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         BEGIN:VTIMEZONE\r\n\
         TZID:Europe/Berlin\r\n\
         BEGIN:STANDARD\r\n\
         DTSTART:19701025T030000\r\n\
         TZOFFSETFROM:+0200\r\n\
         TZOFFSETTO:+0100\r\n\
         TZNAME:CET\r\n\
         END:STANDARD\r\n\
         END:VTIMEZONE\r\n\
         BEGIN:VEVENT\r\n\
         UID:zoned-event@example.com\r\n\
         DTSTART;TZID=Europe/Berlin:20250303T100000\r\n\
         DTEND;TZID=Europe/Berlin:20250303T113000\r\n\
         SUMMARY:Workshop\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR"
    }

    fn recurring_ics() -> &'static str {
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         BEGIN:VEVENT\r\n\
         UID:weekly@example.com\r\n\
         DTSTART:20250303T090000Z\r\n\
         DTEND:20250303T100000Z\r\n\
         RRULE:FREQ=WEEKLY;UNTIL=20250331T090000Z\r\n\
         SUMMARY:Standup\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR"
    }

    fn all_day_ics() -> &'static str {
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         BEGIN:VEVENT\r\n\
         UID:all-day@example.com\r\n\
         DTSTART;VALUE=DATE:20250310\r\n\
         DTEND;VALUE=DATE:20250311\r\n\
         SUMMARY:Public Holiday\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR"
    }

    #[test]
    fn parses_utc_event() {
        let feed = parse_feed(sample_ics(), "test-feed").unwrap();
        assert_eq!(feed.events.len(), 1);

        let event = &feed.events[0];
        assert_eq!(event.uid, "utc-event@example.com");
        assert_eq!(event.summary, Some("Team Meeting".to_string()));
        assert_eq!(event.source_id, "test-feed");
        assert_eq!(
            event.start,
            RawFeedTime::from_utc("2025-03-03T09:00:00Z".parse().unwrap())
        );
        assert!(event.created.is_some());
    }

    #[test]
    fn preserves_zoned_times_and_captures_vtimezone() {
        let feed = parse_feed(zoned_ics(), "test-feed").unwrap();
        assert_eq!(feed.events.len(), 1);
        assert_eq!(feed.timezones.len(), 1);

        let event = &feed.events[0];
        let expected: NaiveDateTime = "2025-03-03T10:00:00".parse().unwrap();
        assert_eq!(event.start, RawFeedTime::zoned(expected, "Europe/Berlin"));
    }

    #[test]
    fn keeps_rrule_text() {
        let feed = parse_feed(recurring_ics(), "test-feed").unwrap();
        let event = &feed.events[0];
        assert!(event.is_recurring());
        assert_eq!(
            event.rrule.as_deref(),
            Some("FREQ=WEEKLY;UNTIL=20250331T090000Z")
        );
    }

    #[test]
    fn parses_all_day_event() {
        let feed = parse_feed(all_day_ics(), "test-feed").unwrap();
        let event = &feed.events[0];
        assert!(event.is_all_day());
        assert_eq!(
            event.start,
            RawFeedTime::from_date(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
        );
    }

    #[test]
    fn missing_dtend_falls_back_to_dtstart() {
        let ics = "BEGIN:VCALENDAR\r\n\
                   VERSION:2.0\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:no-end@example.com\r\n\
                   DTSTART:20250303T090000Z\r\n\
                   SUMMARY:Reminder\r\n\
                   END:VEVENT\r\n\
                   END:VCALENDAR";
        let feed = parse_feed(ics, "test-feed").unwrap();
        let event = &feed.events[0];
        assert_eq!(event.start, event.end);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let result = parse_feed("this is not a calendar", "bad-feed");
        assert!(result.is_err());
    }
}
