//! The two run pipelines: free time and status log.
//!
//! Each run is a pure flow from sources to one published artifact, with
//! a [`RunSummary`] threaded back to the caller instead of shared
//! mutable state. Per-source failures are counted and logged; only
//! errors that make the whole run meaningless (unreadable link list,
//! unwritable artifact) abort it.

use chrono::{DateTime, Duration, Utc};
use icalendar::CalendarComponent;
use tracing::{info, warn};
use url::Url;

use freizeit_core::{
    CalendarEvent, CalendarWindow, TimeSpan, busy_spans, events_with_keyword, free_spans,
    merge_deduplicated, read_link_file, spans_with_min_duration,
};
use freizeit_feeds::{
    FeedFetcher, Normalizer, StatusInterval, classify_markers, pair_intervals, parse_feed,
    parse_status_feed, sleep_spans,
};

use crate::artifact::{CalendarArtifact, read_artifact_events};
use crate::config::EngineConfig;
use crate::error::{PublishError, PublishResult};

/// What one pipeline run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// How many sources were consulted.
    pub sources_total: usize,
    /// How many sources failed to fetch or parse.
    pub sources_failed: usize,
    /// Events ingested from sources after normalization.
    pub events_ingested: usize,
    /// Events in the published artifact after merging.
    pub events_published: usize,
}

/// Runs the free-time pipeline and publishes its artifact.
pub async fn run_free_time(
    config: &EngineConfig,
    fetcher: &FeedFetcher,
    now: DateTime<Utc>,
) -> PublishResult<RunSummary> {
    let tz = config.tz()?;
    let window = CalendarWindow::from_midnight(now, &tz, config.lookahead()?);

    let urls = read_link_file(&config.sources.link_file)?;
    let results = fetcher.fetch_all(&urls).await;

    let sources_total = results.len();
    let mut sources_failed = 0;
    let mut raw_events = Vec::new();
    let mut timezones: Vec<CalendarComponent> = Vec::new();
    for (url, result) in results {
        let body = match result {
            Ok(body) => body,
            Err(_) => {
                // Already logged by the fetcher.
                sources_failed += 1;
                continue;
            }
        };
        match parse_feed(&body, url.as_str()) {
            Ok(mut feed) => {
                raw_events.append(&mut feed.events);
                timezones.append(&mut feed.timezones);
            }
            Err(error) => {
                warn!(url = %url, error = %error, "feed parse failed");
                sources_failed += 1;
            }
        }
    }

    let normalizer = Normalizer::new(tz);
    let events = normalizer.normalize_all(raw_events, &window);
    let events_ingested = events.len();

    let sleep = sleep_spans(&window, &tz, config.sleep_start()?, config.sleep_end()?);
    let incoming = compute_free_slots(
        &events,
        &sleep,
        &window,
        config.min_duration(),
        &config.free_time.slot_summary,
        config.free_time.retain_keyword.as_deref(),
    );

    // Free time is recomputed from scratch every run; only the status
    // log accumulates incrementally.
    let events_published = incoming.len();
    CalendarArtifact::new(&config.free_time.calendar_name, &config.timezone)
        .with_color(&config.free_time.color)
        .with_timezones(timezones)
        .with_events(incoming)
        .write_atomic(&config.free_time.artifact_path)?;

    let summary = RunSummary {
        sources_total,
        sources_failed,
        events_ingested,
        events_published,
    };
    info!(
        sources = summary.sources_total,
        failed = summary.sources_failed,
        ingested = summary.events_ingested,
        published = summary.events_published,
        "free-time run complete"
    );
    Ok(summary)
}

/// Runs the status-log pipeline and publishes its artifact.
pub async fn run_status_log(
    config: &EngineConfig,
    fetcher: &FeedFetcher,
) -> PublishResult<RunSummary> {
    let url_text = config
        .sources
        .status_feed_url
        .as_deref()
        .ok_or_else(|| PublishError::config("status feed URL not configured"))?;
    let url: Url = url_text
        .parse()
        .map_err(|e| PublishError::config(format!("bad status feed URL {url_text}: {e}")))?;

    // A broken status feed degrades to an empty contribution; the
    // prior log is rewritten unchanged rather than failing the run.
    let mut sources_failed = 0;
    let incoming = match fetch_status_items(fetcher, &url).await {
        Ok(items) => {
            let markers = classify_markers(
                items,
                &config.status_log.open_marker,
                &config.status_log.close_marker,
            );
            status_events(pair_intervals(markers))
        }
        Err(error) => {
            warn!(url = %url, error = %error, "status feed unusable, keeping prior log");
            sources_failed = 1;
            Vec::new()
        }
    };
    let events_ingested = incoming.len();

    let path = &config.status_log.artifact_path;
    let prior = read_artifact_events(path)?.unwrap_or_default();
    let merged = merge_deduplicated(incoming, prior);
    let events_published = merged.len();

    CalendarArtifact::new(&config.status_log.calendar_name, &config.timezone)
        .with_color(&config.status_log.color)
        .with_events(merged)
        .write_atomic(path)?;

    let summary = RunSummary {
        sources_total: 1,
        sources_failed,
        events_ingested,
        events_published,
    };
    info!(
        ingested = summary.events_ingested,
        published = summary.events_published,
        "status-log run complete"
    );
    Ok(summary)
}

async fn fetch_status_items(
    fetcher: &FeedFetcher,
    url: &Url,
) -> Result<Vec<freizeit_feeds::StatusItem>, freizeit_feeds::FeedError> {
    let body = fetcher.fetch(url).await?;
    parse_status_feed(&body)
}

/// Turns normalized source events into the free-time artifact's events.
///
/// Busy time is the timed source events plus the synthesized sleep
/// spans; the window is inverted, short gaps dropped, and each
/// remaining gap becomes a transparent slot event. Source events whose
/// summary carries the retention keyword are published alongside.
pub fn compute_free_slots(
    events: &[CalendarEvent],
    extra_busy: &[TimeSpan],
    window: &CalendarWindow,
    min_duration: Duration,
    slot_summary: &str,
    retain_keyword: Option<&str>,
) -> Vec<CalendarEvent> {
    let mut busy = busy_spans(events);
    busy.extend_from_slice(extra_busy);

    let free = spans_with_min_duration(free_spans(&busy, window), min_duration);
    let mut slots: Vec<CalendarEvent> = free
        .into_iter()
        .map(|span| CalendarEvent::synthesized(slot_summary, span).with_transparent(true))
        .collect();

    if let Some(keyword) = retain_keyword {
        slots.extend(events_with_keyword(events.to_vec(), keyword));
    }
    slots
}

/// Turns paired status intervals into calendar events.
pub fn status_events(intervals: Vec<StatusInterval>) -> Vec<CalendarEvent> {
    intervals
        .into_iter()
        .map(|interval| CalendarEvent::synthesized(interval.title, interval.span))
        .collect()
}
