//! Artifact rendering, run pipelines, and the periodic runner

pub mod artifact;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod runner;

pub use artifact::{CalendarArtifact, PRODID, read_artifact_events};
pub use cli::{ArtifactKind, Cli};
pub use config::{EngineConfig, FreeTimeSettings, SourceSettings, StatusLogSettings};
pub use error::{PublishError, PublishResult};
pub use pipeline::{RunSummary, compute_free_slots, run_free_time, run_status_log, status_events};
pub use runner::{PeriodicRunner, RunnerCommand, RunnerConfig, RunnerHandle, RunnerState};
