//! Interval inversion: busy spans in, free spans out.
//!
//! The inverter takes a set of busy [`TimeSpan`]s and a
//! [`CalendarWindow`] and returns the gaps inside the window that no
//! busy span covers. Overlapping and unordered input is fine; the
//! result is always sorted, non-overlapping, and free of zero-length
//! spans.

use crate::event::CalendarEvent;
use crate::time::{CalendarWindow, TimeSpan};

/// Reduces timed events to their busy spans.
///
/// Full-day events carry no instant bounds and are skipped, as are
/// events whose span is empty.
pub fn busy_spans(events: &[CalendarEvent]) -> Vec<TimeSpan> {
    events
        .iter()
        .filter_map(CalendarEvent::span)
        .filter(|span| !span.is_empty())
        .collect()
}

/// Computes the free spans inside `window` not covered by `busy`.
///
/// Busy spans are clipped to the window first; spans entirely outside
/// it have no effect. Overlapping busy spans merge implicitly because
/// the sweep cursor only ever moves forward. Gaps of zero length
/// (abutting busy spans, or busy time flush against a window edge) are
/// never emitted.
pub fn free_spans(busy: &[TimeSpan], window: &CalendarWindow) -> Vec<TimeSpan> {
    let mut clipped: Vec<TimeSpan> = busy
        .iter()
        .filter(|span| span.start < window.end && span.end > window.start)
        .map(|span| {
            TimeSpan::new(span.start.max(window.start), span.end.min(window.end))
        })
        .collect();
    clipped.sort_by_key(|span| span.start);

    let mut free = Vec::new();
    let mut cursor = window.start;
    for span in &clipped {
        if span.start > cursor {
            free.push(TimeSpan::new(cursor, span.start));
        }
        cursor = cursor.max(span.end);
    }
    if cursor < window.end {
        free.push(TimeSpan::new(cursor, window.end));
    }
    free
}
