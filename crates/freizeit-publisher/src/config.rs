//! Engine configuration.
//!
//! All settings live in a single `freizeit.toml` file. Every section
//! has sensible defaults, so a minimal config only needs the paths it
//! wants to override.

use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{PublishError, PublishResult};

/// Configuration for the freizeit engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// IANA name of the default and display timezone.
    pub timezone: String,

    /// How far the computation window reaches, in days.
    pub lookahead_days: i64,

    /// Minutes between runs when the engine runs periodically.
    pub interval_minutes: u64,

    /// Feed source settings.
    #[serde(default)]
    pub sources: SourceSettings,

    /// Free-time artifact settings.
    #[serde(default)]
    pub free_time: FreeTimeSettings,

    /// Status-log artifact settings.
    #[serde(default)]
    pub status_log: StatusLogSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Berlin".to_string(),
            lookahead_days: 14,
            interval_minutes: 30,
            sources: SourceSettings::default(),
            free_time: FreeTimeSettings::default(),
            status_log: StatusLogSettings::default(),
        }
    }
}

/// Where feeds come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Path to the link list file with one ICS URL per line.
    pub link_file: PathBuf,

    /// URL of the RSS status feed, if the status log is wanted.
    pub status_feed_url: Option<String>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            link_file: PathBuf::from("links.txt"),
            status_feed_url: None,
        }
    }
}

/// Settings for the free-time artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeTimeSettings {
    /// Where the artifact is published.
    pub artifact_path: PathBuf,

    /// Display name of the published calendar.
    pub calendar_name: String,

    /// Summary given to each synthesized free slot.
    pub slot_summary: String,

    /// Calendar color tag.
    pub color: String,

    /// Minimum slot length in minutes; shorter gaps are dropped.
    pub min_duration_minutes: i64,

    /// Source events whose summary contains this marker are published
    /// alongside the free slots.
    pub retain_keyword: Option<String>,

    /// Local time the nightly sleep block starts.
    pub sleep_start: String,

    /// Local time the nightly sleep block ends (next morning).
    pub sleep_end: String,
}

impl Default for FreeTimeSettings {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from("freizeit.ics"),
            calendar_name: "Freizeit".to_string(),
            slot_summary: "Frei".to_string(),
            color: "#FFC0CB".to_string(),
            min_duration_minutes: 150,
            retain_keyword: None,
            sleep_start: "22:00".to_string(),
            sleep_end: "09:00".to_string(),
        }
    }
}

/// Settings for the status-log artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusLogSettings {
    /// Where the artifact is published.
    pub artifact_path: PathBuf,

    /// Display name of the published calendar.
    pub calendar_name: String,

    /// Calendar color tag.
    pub color: String,

    /// Marker text that flags an item as an open transition.
    pub open_marker: String,

    /// Marker text that flags an item as a close transition.
    pub close_marker: String,
}

impl Default for StatusLogSettings {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from("status.ics"),
            calendar_name: "Statuslog".to_string(),
            color: "#FF3C00".to_string(),
            open_marker: "OFFEN".to_string(),
            close_marker: "GESCHLOSSEN".to_string(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a file.
    pub fn load_from(path: &Path) -> PublishResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| PublishError::config(format!("failed to parse config: {e}")))
    }

    /// Loads configuration from a file if given, else the defaults.
    pub fn load(path: Option<&Path>) -> PublishResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    /// Resolves the configured timezone.
    pub fn tz(&self) -> PublishResult<Tz> {
        self.timezone
            .parse()
            .map_err(|_| PublishError::config(format!("unknown timezone {}", self.timezone)))
    }

    /// Window lookahead in days, rejecting negative values before they
    /// reach the window constructor.
    pub fn lookahead(&self) -> PublishResult<i64> {
        if self.lookahead_days < 0 {
            return Err(PublishError::config(format!(
                "lookahead_days must not be negative, got {}",
                self.lookahead_days
            )));
        }
        Ok(self.lookahead_days)
    }

    /// Resolves the sleep start time.
    pub fn sleep_start(&self) -> PublishResult<NaiveTime> {
        parse_time(&self.free_time.sleep_start)
    }

    /// Resolves the sleep end time.
    pub fn sleep_end(&self) -> PublishResult<NaiveTime> {
        parse_time(&self.free_time.sleep_end)
    }

    /// Minimum free slot duration.
    pub fn min_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.free_time.min_duration_minutes)
    }

    /// Interval between periodic runs.
    pub fn run_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_minutes * 60)
    }
}

fn parse_time(text: &str) -> PublishResult<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M")
        .map_err(|e| PublishError::config(format!("bad time of day {text}: {e}")))
}
