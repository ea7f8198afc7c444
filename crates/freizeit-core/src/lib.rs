//! Core types: time spans, events, interval algebra, filters, link lists

pub mod event;
pub mod filter;
pub mod invert;
pub mod links;
pub mod merge;
pub mod time;
pub mod tracing;

pub use event::{CalendarEvent, EventIdentity, EventTime};
pub use filter::{events_with_keyword, events_with_min_duration, spans_with_min_duration};
pub use invert::{busy_spans, free_spans};
pub use links::{LinkListError, parse_link_list, read_link_file};
pub use merge::merge_deduplicated;
pub use time::{CalendarWindow, TimeSpan};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
