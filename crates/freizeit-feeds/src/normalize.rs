//! Normalization: timezone promotion and recurrence expansion.
//!
//! Raw feed events leave this module as [`CalendarEvent`]s with every
//! timed boundary re-expressed as a UTC instant:
//! - zoned times are resolved through their IANA zone
//! - floating times get the configured default zone
//! - naive RRULE UNTIL values get the default zone too, before the
//!   rule is handed to the expander
//! - recurring events are expanded into independent occurrences inside
//!   the computation window, each with a deterministic uid
//!
//! All-day events pass through as date-granular values untouched.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use rrule::RRuleSet;
use tracing::{debug, warn};

use freizeit_core::{CalendarEvent, CalendarWindow, EventTime, TimeSpan};

use crate::error::{FeedError, FeedResult};
use crate::raw::{RawFeedEvent, RawFeedTime};

/// Hard cap on occurrences per rule, against pathological inputs.
const MAX_OCCURRENCES: u16 = 1000;

/// Regex matching a naive UNTIL value (no trailing Z) inside an RRULE.
static NAIVE_UNTIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"UNTIL=(\d{8}T\d{6})(;|$)").expect("Invalid UNTIL regex"));

/// Expands a recurrence rule into occurrence starts inside a window.
///
/// The seam exists so pipeline tests can substitute a fixed expansion.
pub trait RecurrenceExpander {
    /// Returns the occurrence starts of `rule`, anchored at the local
    /// `dtstart` in `tz`, that fall inside `window` (bounds inclusive).
    fn expand(
        &self,
        rule: &str,
        tz: Tz,
        dtstart: NaiveDateTime,
        window: &CalendarWindow,
    ) -> FeedResult<Vec<DateTime<Utc>>>;
}

/// RRULE-crate-backed expander.
#[derive(Debug, Default)]
pub struct RruleExpander;

impl RecurrenceExpander for RruleExpander {
    fn expand(
        &self,
        rule: &str,
        tz: Tz,
        dtstart: NaiveDateTime,
        window: &CalendarWindow,
    ) -> FeedResult<Vec<DateTime<Utc>>> {
        let ical = format!(
            "DTSTART;TZID={}:{}\nRRULE:{}",
            tz.name(),
            dtstart.format("%Y%m%dT%H%M%S"),
            rule
        );
        let set: RRuleSet = ical
            .parse()
            .map_err(|e: rrule::RRuleError| FeedError::parse(e.to_string()))?;

        let set = set
            .after(window.start.with_timezone(&rrule::Tz::UTC))
            .before(window.end.with_timezone(&rrule::Tz::UTC));

        let result = set.all(MAX_OCCURRENCES);
        if result.limited {
            warn!(rule, "recurrence expansion hit the occurrence cap");
        }

        Ok(result
            .dates
            .into_iter()
            .map(|dt| dt.with_timezone(&Utc))
            // The window is inclusive on both bounds; re-check rather
            // than trusting the rrule cursor's edge behavior.
            .filter(|dt| window.contains(*dt))
            .collect())
    }
}

/// Normalizes raw feed events against a default zone and window.
pub struct Normalizer<E> {
    default_tz: Tz,
    expander: E,
}

impl Normalizer<RruleExpander> {
    /// Creates a normalizer with the standard RRULE expander.
    pub fn new(default_tz: Tz) -> Self {
        Self::with_expander(default_tz, RruleExpander)
    }
}

impl<E: RecurrenceExpander> Normalizer<E> {
    /// Creates a normalizer with a custom expander.
    pub fn with_expander(default_tz: Tz, expander: E) -> Self {
        Self {
            default_tz,
            expander,
        }
    }

    /// Normalizes a batch of raw events.
    ///
    /// Events that cannot be normalized (unknown TZID, nonsensical
    /// bounds, broken rules) are skipped with a warning; one bad event
    /// never poisons the batch.
    pub fn normalize_all(
        &self,
        raw_events: Vec<RawFeedEvent>,
        window: &CalendarWindow,
    ) -> Vec<CalendarEvent> {
        let mut events = Vec::new();
        for raw in raw_events {
            match self.normalize(raw, window) {
                Ok(mut normalized) => events.append(&mut normalized),
                Err(error) => {
                    warn!(error = %error, "skipping event that failed to normalize");
                }
            }
        }
        events
    }

    /// Normalizes one raw event, expanding recurrences.
    ///
    /// Returns one event for non-recurring input and zero or more
    /// occurrence events for recurring input.
    pub fn normalize(
        &self,
        raw: RawFeedEvent,
        window: &CalendarWindow,
    ) -> FeedResult<Vec<CalendarEvent>> {
        // All-day events stay date-granular and never recur here.
        if let (RawFeedTime::Date(start), RawFeedTime::Date(end)) = (&raw.start, &raw.end) {
            let event = self.build_event(
                raw.uid.clone(),
                EventTime::from_date(*start),
                EventTime::from_date(*end),
                &raw,
            );
            return Ok(vec![event]);
        }

        let start = self.promote(&raw.start)?;
        let end = self.promote(&raw.end)?;
        if end < start {
            return Err(FeedError::parse(format!(
                "event {} ends before it starts",
                raw.uid
            ))
            .with_source_id(raw.source_id.clone()));
        }
        let duration = end - start;

        let Some(rule) = raw.rrule.clone() else {
            let event = self.build_event(
                raw.uid.clone(),
                EventTime::from_utc(start),
                EventTime::from_utc(end),
                &raw,
            );
            return Ok(vec![event]);
        };

        // Recurring: anchor the rule at the original local time so DST
        // transitions shift occurrences the way the source zone does.
        let (tz, local_start) = self.local_anchor(&raw.start, start);
        let rule = self.promote_naive_until(&rule)?;
        let starts = self.expander.expand(&rule, tz, local_start, window)?;
        debug!(
            uid = raw.uid,
            occurrences = starts.len(),
            "expanded recurring event"
        );

        Ok(starts
            .into_iter()
            .map(|occurrence_start| {
                // Deterministic per-occurrence uid keeps repeated runs
                // and merge dedup stable.
                let uid = format!("{}/{}", raw.uid, occurrence_start.timestamp());
                self.build_event(
                    uid,
                    EventTime::from_utc(occurrence_start),
                    EventTime::from_utc(occurrence_start + duration),
                    &raw,
                )
            })
            .collect())
    }

    /// Re-expresses a raw time as a UTC instant.
    pub fn promote(&self, time: &RawFeedTime) -> FeedResult<DateTime<Utc>> {
        match time {
            RawFeedTime::Utc(dt) => Ok(*dt),
            RawFeedTime::Zoned { date_time, tzid } => {
                let tz: Tz = tzid
                    .parse()
                    .map_err(|_| FeedError::parse(format!("unknown timezone {tzid}")))?;
                resolve_local(&tz, date_time)
            }
            RawFeedTime::Floating(date_time) => resolve_local(&self.default_tz, date_time),
            RawFeedTime::Date(_) => Err(FeedError::internal(
                "all-day time cannot be promoted to an instant",
            )),
        }
    }

    /// Rewrites naive UNTIL values in an RRULE to UTC, interpreting
    /// them in the default zone.
    pub fn promote_naive_until(&self, rule: &str) -> FeedResult<String> {
        let Some(caps) = NAIVE_UNTIL_REGEX.captures(rule) else {
            return Ok(rule.to_string());
        };
        let raw_until = &caps[1];
        let naive = NaiveDateTime::parse_from_str(raw_until, "%Y%m%dT%H%M%S")
            .map_err(|e| FeedError::parse(format!("bad UNTIL value {raw_until}: {e}")))?;
        let utc_until = resolve_local(&self.default_tz, &naive)?;
        let replacement = format!("UNTIL={}{}", utc_until.format("%Y%m%dT%H%M%SZ"), &caps[2]);
        Ok(NAIVE_UNTIL_REGEX.replace(rule, replacement.as_str()).into_owned())
    }

    /// Returns the zone and local wall time a recurrence is anchored at.
    fn local_anchor(&self, time: &RawFeedTime, fallback_utc: DateTime<Utc>) -> (Tz, NaiveDateTime) {
        match time {
            RawFeedTime::Zoned { date_time, tzid } => match tzid.parse::<Tz>() {
                Ok(tz) => (tz, *date_time),
                Err(_) => (chrono_tz::UTC, fallback_utc.naive_utc()),
            },
            RawFeedTime::Floating(date_time) => (self.default_tz, *date_time),
            _ => (chrono_tz::UTC, fallback_utc.naive_utc()),
        }
    }

    fn build_event(
        &self,
        uid: String,
        start: EventTime,
        end: EventTime,
        raw: &RawFeedEvent,
    ) -> CalendarEvent {
        let mut event = CalendarEvent::new(uid, start, end);
        event.summary = raw.summary.clone();
        event.category = raw.description.clone();
        event.created = raw.created;
        event
    }
}

/// Resolves a local wall time in a zone to UTC.
///
/// On an ambiguous local time (DST fall-back) the earlier instant wins;
/// a local time skipped by DST is an error.
fn resolve_local(tz: &Tz, naive: &NaiveDateTime) -> FeedResult<DateTime<Utc>> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| FeedError::parse(format!("local time {naive} does not exist in {tz}")))
}

/// Synthesizes nightly sleep spans over the window.
///
/// For every local date the window touches, a busy span from
/// `sleep_start` the previous evening to `wake_end` that morning is
/// produced, expressed in UTC. The night into the window's first day is
/// included, so the early hours of "today" never show up as free time.
/// These spans only feed the inverter; they are never published.
pub fn sleep_spans(
    window: &CalendarWindow,
    tz: &Tz,
    sleep_start: chrono::NaiveTime,
    wake_end: chrono::NaiveTime,
) -> Vec<TimeSpan> {
    let mut spans = Vec::new();
    let mut date = window.start.with_timezone(tz).date_naive();
    let last = window.end.with_timezone(tz).date_naive();

    while date <= last {
        if let Some(prev) = date.pred_opt() {
            let start = tz.from_local_datetime(&prev.and_time(sleep_start)).earliest();
            let end = tz.from_local_datetime(&date.and_time(wake_end)).earliest();
            if let (Some(start), Some(end)) = (start, end) {
                let (start, end) = (start.with_timezone(&Utc), end.with_timezone(&Utc));
                if start < end {
                    spans.push(TimeSpan::new(start, end));
                }
            }
        }
        let Some(next) = date.succ_opt() else { break };
        date = next;
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn berlin() -> Tz {
        "Europe/Berlin".parse().unwrap()
    }

    fn march_window() -> CalendarWindow {
        CalendarWindow::new(utc(2025, 3, 1, 0, 0, 0), utc(2025, 3, 15, 0, 0, 0))
    }

    fn naive(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    mod promotion {
        use super::*;

        #[test]
        fn utc_passes_through() {
            let normalizer = Normalizer::new(berlin());
            let instant = utc(2025, 3, 3, 9, 0, 0);
            let promoted = normalizer.promote(&RawFeedTime::from_utc(instant)).unwrap();
            assert_eq!(promoted, instant);
        }

        #[test]
        fn zoned_resolves_through_iana() {
            let normalizer = Normalizer::new(berlin());
            // 10:00 Berlin in March (CET, UTC+1) is 09:00 UTC.
            let promoted = normalizer
                .promote(&RawFeedTime::zoned(naive("2025-03-03T10:00:00"), "Europe/Berlin"))
                .unwrap();
            assert_eq!(promoted, utc(2025, 3, 3, 9, 0, 0));
        }

        #[test]
        fn floating_gets_default_zone() {
            let normalizer = Normalizer::new(berlin());
            let promoted = normalizer
                .promote(&RawFeedTime::floating(naive("2025-03-03T10:00:00")))
                .unwrap();
            assert_eq!(promoted, utc(2025, 3, 3, 9, 0, 0));
        }

        #[test]
        fn unknown_tzid_is_an_error() {
            let normalizer = Normalizer::new(berlin());
            let result = normalizer
                .promote(&RawFeedTime::zoned(naive("2025-03-03T10:00:00"), "Mars/Olympus"));
            assert!(result.is_err());
        }

        #[test]
        fn naive_until_gets_default_zone() {
            let normalizer = Normalizer::new(berlin());
            let rule = normalizer
                .promote_naive_until("FREQ=WEEKLY;UNTIL=20250331T100000;BYDAY=MO")
                .unwrap();
            // 10:00 Berlin on March 31 (CEST, UTC+2) is 08:00 UTC.
            assert_eq!(rule, "FREQ=WEEKLY;UNTIL=20250331T080000Z;BYDAY=MO");
        }

        #[test]
        fn utc_until_is_untouched() {
            let normalizer = Normalizer::new(berlin());
            let rule = "FREQ=WEEKLY;UNTIL=20250331T080000Z";
            assert_eq!(normalizer.promote_naive_until(rule).unwrap(), rule);
        }
    }

    mod expansion {
        use super::*;

        struct FixedExpander(Vec<DateTime<Utc>>);

        impl RecurrenceExpander for FixedExpander {
            fn expand(
                &self,
                _rule: &str,
                _tz: Tz,
                _dtstart: NaiveDateTime,
                _window: &CalendarWindow,
            ) -> FeedResult<Vec<DateTime<Utc>>> {
                Ok(self.0.clone())
            }
        }

        fn raw_recurring() -> RawFeedEvent {
            RawFeedEvent::new(
                "weekly@example.com",
                RawFeedTime::from_utc(utc(2025, 3, 3, 9, 0, 0)),
                RawFeedTime::from_utc(utc(2025, 3, 3, 10, 0, 0)),
                "feed-1",
            )
            .with_summary("Standup")
            .with_rrule("FREQ=WEEKLY")
        }

        #[test]
        fn occurrences_copy_fields_and_get_deterministic_uids() {
            let starts = vec![utc(2025, 3, 3, 9, 0, 0), utc(2025, 3, 10, 9, 0, 0)];
            let normalizer = Normalizer::with_expander(berlin(), FixedExpander(starts.clone()));

            let events = normalizer.normalize(raw_recurring(), &march_window()).unwrap();
            assert_eq!(events.len(), 2);

            for (event, start) in events.iter().zip(&starts) {
                assert_eq!(event.uid, format!("weekly@example.com/{}", start.timestamp()));
                assert_eq!(event.summary.as_deref(), Some("Standup"));
                assert_eq!(event.start, EventTime::from_utc(*start));
                assert_eq!(
                    event.end,
                    EventTime::from_utc(*start + chrono::Duration::hours(1))
                );
            }
        }

        #[test]
        fn repeated_expansion_is_stable() {
            let starts = vec![utc(2025, 3, 3, 9, 0, 0)];
            let normalizer = Normalizer::with_expander(berlin(), FixedExpander(starts));
            let first = normalizer.normalize(raw_recurring(), &march_window()).unwrap();
            let second = normalizer.normalize(raw_recurring(), &march_window()).unwrap();
            assert_eq!(first, second);
        }

        #[test]
        fn rrule_expander_honors_until() {
            let normalizer = Normalizer::new(chrono_tz::UTC);
            let raw = RawFeedEvent::new(
                "daily@example.com",
                RawFeedTime::from_utc(utc(2025, 3, 3, 9, 0, 0)),
                RawFeedTime::from_utc(utc(2025, 3, 3, 10, 0, 0)),
                "feed-1",
            )
            .with_rrule("FREQ=DAILY;UNTIL=20250305T090000Z");

            let events = normalizer.normalize(raw, &march_window()).unwrap();
            let starts: Vec<_> = events
                .iter()
                .filter_map(|e| e.start.as_datetime())
                .collect();
            assert_eq!(
                starts,
                vec![
                    utc(2025, 3, 3, 9, 0, 0),
                    utc(2025, 3, 4, 9, 0, 0),
                    utc(2025, 3, 5, 9, 0, 0),
                ]
            );
        }

        #[test]
        fn rrule_expander_clips_unbounded_rules_to_window() {
            let normalizer = Normalizer::new(chrono_tz::UTC);
            let raw = RawFeedEvent::new(
                "forever@example.com",
                RawFeedTime::from_utc(utc(2025, 3, 3, 9, 0, 0)),
                RawFeedTime::from_utc(utc(2025, 3, 3, 10, 0, 0)),
                "feed-1",
            )
            .with_rrule("FREQ=DAILY");

            let events = normalizer.normalize(raw, &march_window()).unwrap();
            // March 3 through March 14, one per day inside the window.
            assert_eq!(events.len(), 12);
            for event in &events {
                let start = event.start.as_datetime().unwrap();
                assert!(march_window().contains(start));
            }
        }
    }

    mod pass_through {
        use super::*;

        #[test]
        fn non_recurring_event_passes_through() {
            let normalizer = Normalizer::new(berlin());
            let raw = RawFeedEvent::new(
                "single@example.com",
                RawFeedTime::zoned(naive("2025-03-03T10:00:00"), "Europe/Berlin"),
                RawFeedTime::zoned(naive("2025-03-03T11:30:00"), "Europe/Berlin"),
                "feed-1",
            )
            .with_summary("Dentist");

            let events = normalizer.normalize(raw, &march_window()).unwrap();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].uid, "single@example.com");
            assert_eq!(events[0].start, EventTime::from_utc(utc(2025, 3, 3, 9, 0, 0)));
            assert_eq!(events[0].end, EventTime::from_utc(utc(2025, 3, 3, 10, 30, 0)));
        }

        #[test]
        fn all_day_event_stays_date_granular() {
            let normalizer = Normalizer::new(berlin());
            let start = chrono::NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
            let end = chrono::NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
            let raw = RawFeedEvent::new(
                "holiday@example.com",
                RawFeedTime::from_date(start),
                RawFeedTime::from_date(end),
                "feed-1",
            );

            let events = normalizer.normalize(raw, &march_window()).unwrap();
            assert_eq!(events.len(), 1);
            assert!(events[0].is_all_day());
        }

        #[test]
        fn inverted_bounds_are_an_error() {
            let normalizer = Normalizer::new(berlin());
            let raw = RawFeedEvent::new(
                "backwards@example.com",
                RawFeedTime::from_utc(utc(2025, 3, 3, 10, 0, 0)),
                RawFeedTime::from_utc(utc(2025, 3, 3, 9, 0, 0)),
                "feed-1",
            );
            assert!(normalizer.normalize(raw, &march_window()).is_err());
        }

        #[test]
        fn normalize_all_skips_broken_events() {
            let normalizer = Normalizer::new(berlin());
            let good = RawFeedEvent::new(
                "good@example.com",
                RawFeedTime::from_utc(utc(2025, 3, 3, 9, 0, 0)),
                RawFeedTime::from_utc(utc(2025, 3, 3, 10, 0, 0)),
                "feed-1",
            );
            let bad = RawFeedEvent::new(
                "bad@example.com",
                RawFeedTime::zoned(naive("2025-03-03T10:00:00"), "Mars/Olympus"),
                RawFeedTime::zoned(naive("2025-03-03T11:00:00"), "Mars/Olympus"),
                "feed-1",
            );

            let events = normalizer.normalize_all(vec![good, bad], &march_window());
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].uid, "good@example.com");
        }
    }

    mod sleep {
        use super::*;

        #[test]
        fn one_span_per_night() {
            let window = CalendarWindow::new(utc(2025, 6, 9, 22, 0, 0), utc(2025, 6, 23, 22, 0, 0));
            let spans = sleep_spans(
                &window,
                &berlin(),
                NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            );

            // 14-day window starting at Berlin midnight June 10: one
            // night per local date the window touches.
            assert_eq!(spans.len(), 15);
            // First night leads into the first day: June 9 22:00 CEST
            // (20:00 UTC) to June 10 09:00 CEST (07:00 UTC).
            assert_eq!(spans[0].start, utc(2025, 6, 9, 20, 0, 0));
            assert_eq!(spans[0].end, utc(2025, 6, 10, 7, 0, 0));
        }

        #[test]
        fn first_morning_is_blocked() {
            let window = CalendarWindow::new(utc(2025, 6, 10, 0, 0, 0), utc(2025, 6, 24, 0, 0, 0));
            let spans = sleep_spans(
                &window,
                &chrono_tz::UTC,
                NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            );

            // 08:00 on the window's first day falls inside a sleep span.
            assert!(spans.iter().any(|s| s.contains(utc(2025, 6, 10, 8, 0, 0))));
        }

        #[test]
        fn spans_are_eleven_hours() {
            let window = march_window();
            let spans = sleep_spans(
                &window,
                &chrono_tz::UTC,
                NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            );
            for span in &spans {
                assert_eq!(span.duration(), chrono::Duration::hours(11));
            }
        }
    }
}
