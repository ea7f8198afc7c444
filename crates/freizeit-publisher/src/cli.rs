//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// freizeit - compute free time from calendar feeds
#[derive(Debug, Parser)]
#[command(name = "freizeit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "FREIZEIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Run once and exit instead of running periodically
    #[arg(long)]
    pub once: bool,

    /// Only produce the named artifact (default: all configured)
    #[arg(long, value_enum)]
    pub artifact: Option<ArtifactKind>,
}

/// Which artifact a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArtifactKind {
    /// The free-time calendar.
    FreeTime,
    /// The status-log calendar.
    StatusLog,
}

impl Cli {
    /// Returns true if the free-time pipeline should run.
    pub fn wants_free_time(&self) -> bool {
        matches!(self.artifact, None | Some(ArtifactKind::FreeTime))
    }

    /// Returns true if the status-log pipeline should run.
    pub fn wants_status_log(&self) -> bool {
        matches!(self.artifact, None | Some(ArtifactKind::StatusLog))
    }
}
