//! Publisher error types.

use std::io;
use thiserror::Error;

/// Result type for publisher operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors that can occur while publishing artifacts.
#[derive(Debug, Error)]
pub enum PublishError {
    /// IO error while writing or renaming artifact files.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The link list could not be read.
    #[error(transparent)]
    LinkList(#[from] freizeit_core::LinkListError),

    /// A feed-layer error that had to abort the whole run.
    #[error(transparent)]
    Feed(#[from] freizeit_feeds::FeedError),

    /// An existing artifact on disk could not be parsed.
    #[error("Artifact error: {message}")]
    Artifact { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PublishError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an artifact error.
    pub fn artifact(message: impl Into<String>) -> Self {
        Self::Artifact {
            message: message.into(),
        }
    }
}
