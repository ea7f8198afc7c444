//! Incremental merge with deduplication.
//!
//! Published artifacts are rebuilt on every run, but events already
//! present in the prior artifact must survive with their original uids
//! and timestamps. The merge keys on the (start, end, summary) identity
//! triple: an incoming event whose triple matches a prior event is a
//! duplicate and is discarded in favor of the prior one.

use std::collections::HashSet;

use tracing::debug;

use crate::event::CalendarEvent;

/// Merges freshly computed events into the prior artifact's events.
///
/// Prior events always win against incoming duplicates; duplicates
/// within `incoming` itself collapse to the first occurrence. The
/// result is sorted by start, then end.
pub fn merge_deduplicated(
    incoming: Vec<CalendarEvent>,
    prior: Vec<CalendarEvent>,
) -> Vec<CalendarEvent> {
    let mut seen: HashSet<_> = prior.iter().map(CalendarEvent::identity).collect();
    let mut merged = prior;

    let mut added = 0usize;
    for event in incoming {
        if seen.insert(event.identity()) {
            merged.push(event);
            added += 1;
        }
    }
    debug!(added, total = merged.len(), "merged incoming events");

    merged.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
    merged
}
