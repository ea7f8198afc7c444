//! RSS status feed parsing and open/close pairing.
//!
//! The status feed is a plain RSS channel whose item titles carry
//! open/close markers (by default "OFFEN" and "GESCHLOSSEN") and whose
//! `pubDate` says when the transition happened. Parsing yields a marker
//! stream; pairing folds it into closed intervals.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use tracing::warn;

use freizeit_core::TimeSpan;

use crate::error::{FeedError, FeedResult};

/// One `<item>` from the status feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusItem {
    /// The item title.
    pub title: String,
    /// The item's publication time.
    pub published: DateTime<Utc>,
}

/// The direction of a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Opened,
    Closed,
}

/// A classified status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMarker {
    pub kind: StatusKind,
    pub title: String,
    pub at: DateTime<Utc>,
}

/// A completed open-to-close interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusInterval {
    /// The title of the opening item.
    pub title: String,
    /// Open instant through close instant.
    pub span: TimeSpan,
}

/// Parses RSS XML into status items.
///
/// Items missing a title or a parsable RFC 2822 `pubDate` are skipped
/// with a warning; XML that is not an RSS document at all is a parse
/// error.
pub fn parse_status_feed(xml: &str) -> FeedResult<Vec<StatusItem>> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut in_item = false;
    let mut current_element: Option<String> = None;
    let mut current_title: Option<String> = None;
    let mut current_pub_date: Option<String> = None;
    let mut saw_rss = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "rss" | "channel" => saw_rss = true,
                    "item" => {
                        in_item = true;
                        current_title = None;
                        current_pub_date = None;
                    }
                    "title" | "pubDate" if in_item => {
                        current_element = Some(name);
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "item" && in_item {
                    match (current_title.take(), current_pub_date.take()) {
                        (Some(title), Some(pub_date)) => {
                            match DateTime::parse_from_rfc2822(&pub_date) {
                                Ok(published) => items.push(StatusItem {
                                    title,
                                    published: published.with_timezone(&Utc),
                                }),
                                Err(error) => {
                                    warn!(pub_date, error = %error, "skipping item with bad pubDate");
                                }
                            }
                        }
                        _ => {
                            warn!("skipping RSS item without title or pubDate");
                        }
                    }
                    in_item = false;
                }
                current_element = None;
            }
            Ok(Event::Text(e)) => {
                if let Some(ref elem) = current_element {
                    let text = e.unescape().unwrap_or_default().to_string();
                    match elem.as_str() {
                        "title" => current_title = Some(text),
                        "pubDate" => current_pub_date = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(ref elem) = current_element {
                    let text = String::from_utf8_lossy(&e).to_string();
                    match elem.as_str() {
                        "title" => current_title = Some(text),
                        "pubDate" => current_pub_date = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FeedError::parse(format!("invalid RSS: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    if !saw_rss {
        return Err(FeedError::parse("document has no rss/channel element"));
    }
    Ok(items)
}

/// Classifies status items into transition markers.
///
/// Items whose title contains neither marker are ignored. The result is
/// sorted by publication time.
pub fn classify_markers(
    items: Vec<StatusItem>,
    open_marker: &str,
    close_marker: &str,
) -> Vec<StatusMarker> {
    let mut markers: Vec<StatusMarker> = items
        .into_iter()
        .filter_map(|item| {
            let kind = if item.title.contains(open_marker) {
                StatusKind::Opened
            } else if item.title.contains(close_marker) {
                StatusKind::Closed
            } else {
                return None;
            };
            Some(StatusMarker {
                kind,
                title: item.title,
                at: item.published,
            })
        })
        .collect();
    markers.sort_by_key(|m| m.at);
    markers
}

/// Pairs transition markers into closed intervals.
///
/// Repeated opens collapse to the most recent one before a close; a
/// close without a preceding open is dropped, as is a trailing open
/// that never closes.
pub fn pair_intervals(markers: Vec<StatusMarker>) -> Vec<StatusInterval> {
    let mut intervals = Vec::new();
    let mut pending_open: Option<StatusMarker> = None;

    for marker in markers {
        match marker.kind {
            StatusKind::Opened => pending_open = Some(marker),
            StatusKind::Closed => {
                let Some(open) = pending_open.take() else {
                    warn!(at = %marker.at, "close marker without a preceding open");
                    continue;
                };
                if open.at < marker.at {
                    intervals.push(StatusInterval {
                        title: open.title,
                        span: TimeSpan::new(open.at, marker.at),
                    });
                }
            }
        }
    }
    intervals
}
