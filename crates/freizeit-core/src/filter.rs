//! Event filters applied between inversion and publication.
//!
//! Two filters exist: a minimum-duration filter that drops slots too
//! short to be useful, and a keyword filter that retains only events
//! whose label mentions a configured marker.

use chrono::Duration;

use crate::event::CalendarEvent;
use crate::time::TimeSpan;

/// Keeps only spans at least `min` long.
///
/// A span exactly at the threshold is kept.
pub fn spans_with_min_duration(spans: Vec<TimeSpan>, min: Duration) -> Vec<TimeSpan> {
    spans.into_iter().filter(|s| s.duration() >= min).collect()
}

/// Keeps only events at least `min` long.
///
/// An event exactly at the threshold is kept. Full-day events compare
/// by their midnight-to-midnight duration.
pub fn events_with_min_duration(events: Vec<CalendarEvent>, min: Duration) -> Vec<CalendarEvent> {
    events.into_iter().filter(|e| e.duration() >= min).collect()
}

/// Keeps only events whose summary contains `keyword`, ignoring case.
/// Events without a summary are dropped.
pub fn events_with_keyword(events: Vec<CalendarEvent>, keyword: &str) -> Vec<CalendarEvent> {
    let keyword = keyword.to_lowercase();
    events
        .into_iter()
        .filter(|e| {
            e.summary
                .as_deref()
                .is_some_and(|summary| summary.to_lowercase().contains(&keyword))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn span(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> TimeSpan {
        TimeSpan::new(
            utc(2025, 3, 3, start_h, start_m, 0),
            utc(2025, 3, 3, end_h, end_m, 0),
        )
    }

    mod duration {
        use super::*;

        #[test]
        fn drops_short_spans() {
            let spans = vec![span(8, 0, 9, 0), span(10, 0, 12, 30), span(13, 0, 16, 0)];
            let kept = spans_with_min_duration(spans, Duration::minutes(150));
            assert_eq!(kept, vec![span(10, 0, 12, 30), span(13, 0, 16, 0)]);
        }

        #[test]
        fn threshold_is_inclusive() {
            let spans = vec![span(10, 0, 12, 30)];
            let kept = spans_with_min_duration(spans.clone(), Duration::minutes(150));
            assert_eq!(kept, spans);

            let kept = spans_with_min_duration(spans, Duration::minutes(151));
            assert!(kept.is_empty());
        }

        #[test]
        fn filters_events_too() {
            let long = CalendarEvent::timed("evt-1", span(9, 0, 12, 0));
            let short = CalendarEvent::timed("evt-2", span(13, 0, 13, 30));
            let kept = events_with_min_duration(vec![long.clone(), short], Duration::hours(1));
            assert_eq!(kept, vec![long]);
        }
    }

    mod keyword {
        use super::*;

        #[test]
        fn retains_matching_summaries() {
            let events = vec![
                CalendarEvent::timed("evt-1", span(9, 0, 10, 0)).with_summary("Conan: free"),
                CalendarEvent::timed("evt-2", span(10, 0, 11, 0)).with_summary("Dentist"),
                CalendarEvent::timed("evt-3", span(11, 0, 12, 0)).with_summary("Lunch with Conan"),
            ];
            let kept = events_with_keyword(events, "Conan");
            assert_eq!(kept.len(), 2);
            assert_eq!(kept[0].uid, "evt-1");
            assert_eq!(kept[1].uid, "evt-3");
        }

        #[test]
        fn match_ignores_case() {
            let events =
                vec![CalendarEvent::timed("evt-1", span(9, 0, 10, 0)).with_summary("CONAN day")];
            assert_eq!(events_with_keyword(events, "conan").len(), 1);
        }

        #[test]
        fn drops_events_without_summary() {
            let events = vec![CalendarEvent::timed("evt-1", span(9, 0, 10, 0))];
            assert!(events_with_keyword(events, "Conan").is_empty());
        }
    }
}
