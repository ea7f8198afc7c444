//! Calendar artifact rendering and atomic publication.
//!
//! An artifact is an ICS file on disk: display name, display zone,
//! optional color, the events, and any VTIMEZONE blocks carried over
//! from source feeds. Writing goes through a temp sibling file and a
//! rename so readers never observe a half-written calendar.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use icalendar::{Calendar, CalendarComponent, Component, Event, EventLike};
use tracing::{debug, info, warn};

use freizeit_core::{CalendarEvent, EventTime};
use freizeit_feeds::{RawFeedTime, parse_feed};

use crate::error::{PublishError, PublishResult};

/// PRODID stamped into every published calendar.
pub const PRODID: &str = "-//freizeit//calendar-engine//EN";

/// A calendar artifact ready to be rendered and published.
#[derive(Debug, Clone)]
pub struct CalendarArtifact {
    /// Display name (X-WR-CALNAME).
    pub name: String,
    /// Display zone (X-WR-TIMEZONE).
    pub timezone: String,
    /// Calendar color tag (X-COLOR), if any.
    pub color: Option<String>,
    /// The events to publish.
    pub events: Vec<CalendarEvent>,
    /// VTIMEZONE components carried from source feeds.
    pub timezones: Vec<CalendarComponent>,
}

impl CalendarArtifact {
    /// Creates an empty artifact with the given display name and zone.
    pub fn new(name: impl Into<String>, timezone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timezone: timezone.into(),
            color: None,
            events: Vec::new(),
            timezones: Vec::new(),
        }
    }

    /// Builder method to set the calendar color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Builder method to set the events.
    pub fn with_events(mut self, events: Vec<CalendarEvent>) -> Self {
        self.events = events;
        self
    }

    /// Builder method to set the carried VTIMEZONE components.
    pub fn with_timezones(mut self, timezones: Vec<CalendarComponent>) -> Self {
        self.timezones = timezones;
        self
    }

    /// Renders the artifact as an icalendar Calendar.
    pub fn to_calendar(&self) -> Calendar {
        let mut calendar = Calendar::new();
        calendar.name(&self.name);
        calendar.append_property(("PRODID", PRODID));
        calendar.append_property(("X-WR-TIMEZONE", self.timezone.as_str()));
        if let Some(ref color) = self.color {
            calendar.append_property(("X-COLOR", color.as_str()));
        }

        for tz in &self.timezones {
            calendar.push(tz.clone());
        }
        for event in &self.events {
            calendar.push(render_event(event));
        }
        calendar
    }

    /// Renders the artifact as ICS text.
    pub fn to_ics(&self) -> String {
        self.to_calendar().to_string()
    }

    /// Publishes the artifact atomically.
    ///
    /// The ICS text is written to a temp sibling, synced, then renamed
    /// over the target path.
    pub fn write_atomic(&self, path: &Path) -> PublishResult<()> {
        let ics = self.to_ics();

        let file_name = path
            .file_name()
            .ok_or_else(|| PublishError::config(format!("{} has no file name", path.display())))?;
        let tmp_path = path.with_file_name(format!("{}.tmp", file_name.to_string_lossy()));

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(&tmp_path)?;
        file.write_all(ics.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp_path, path)?;

        info!(
            path = %path.display(),
            events = self.events.len(),
            "published calendar artifact"
        );
        Ok(())
    }
}

/// Reads the events of a previously published artifact.
///
/// A missing file is not an error; it just means this is the first run.
pub fn read_artifact_events(path: &Path) -> PublishResult<Option<Vec<CalendarEvent>>> {
    if !path.exists() {
        debug!(path = %path.display(), "no prior artifact");
        return Ok(None);
    }
    let ics = fs::read_to_string(path)?;
    let feed = parse_feed(&ics, &path.display().to_string())
        .map_err(|e| PublishError::artifact(e.to_string()))?;

    let mut events = Vec::new();
    for raw in feed.events {
        // The engine only ever writes UTC instants and bare dates, so
        // anything else in a prior artifact is foreign and dropped.
        let start = prior_time(&raw.start);
        let end = prior_time(&raw.end);
        let (Some(start), Some(end)) = (start, end) else {
            warn!(uid = raw.uid, "skipping prior event with unexpected time form");
            continue;
        };
        let mut event = CalendarEvent::new(raw.uid, start, end);
        event.summary = raw.summary;
        event.created = raw.created;
        events.push(event);
    }
    Ok(Some(events))
}

fn prior_time(time: &RawFeedTime) -> Option<EventTime> {
    match time {
        RawFeedTime::Utc(dt) => Some(EventTime::from_utc(*dt)),
        RawFeedTime::Date(date) => Some(EventTime::from_date(*date)),
        RawFeedTime::Zoned { .. } | RawFeedTime::Floating(_) => None,
    }
}

/// Renders one event as a VEVENT.
fn render_event(event: &CalendarEvent) -> Event {
    let mut vevent = Event::new();
    vevent.uid(&event.uid);
    if let Some(ref summary) = event.summary {
        vevent.summary(summary);
    }
    match event.start {
        EventTime::DateTime(dt) => vevent.starts(dt),
        EventTime::AllDay(date) => vevent.starts(date),
    };
    match event.end {
        EventTime::DateTime(dt) => vevent.ends(dt),
        EventTime::AllDay(date) => vevent.ends(date),
    };
    if let Some(ref category) = event.category {
        vevent.description(category);
    }
    if let Some(ref color) = event.color {
        vevent.add_property("COLOR", color);
    }
    if event.transparent {
        vevent.add_property("TRANSP", "TRANSPARENT");
    }
    if let Some(created) = event.created {
        vevent.timestamp(created);
    }
    vevent.done()
}
