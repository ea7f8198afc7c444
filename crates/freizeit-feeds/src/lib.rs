//! Feed ingestion: fetching, ICS and RSS parsing, normalization

pub mod error;
pub mod fetch;
pub mod ics;
pub mod normalize;
pub mod raw;
pub mod status;

pub use error::{FeedError, FeedErrorCode, FeedResult};
pub use fetch::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, FeedFetcher};
pub use ics::{ParsedFeed, parse_feed};
pub use normalize::{Normalizer, RecurrenceExpander, RruleExpander, sleep_spans};
pub use raw::{RawFeedEvent, RawFeedTime};
pub use status::{
    StatusInterval, StatusItem, StatusKind, StatusMarker, classify_markers, pair_intervals,
    parse_status_feed,
};
