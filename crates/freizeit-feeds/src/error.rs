//! Error types for feed ingestion.
//!
//! This module defines the error types that can occur when fetching and
//! parsing calendar and status feeds.

use std::fmt;
use thiserror::Error;

/// The category of a feed error.
///
/// Used by the pipeline to decide whether a source is skipped for this
/// run only or its data is considered broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedErrorCode {
    /// The source could not be reached: connection failure, timeout,
    /// DNS resolution, non-success HTTP status.
    SourceUnavailable,
    /// The source was reached but its payload could not be parsed.
    ParseFailure,
    /// Internal feed-layer error - unexpected state, bug.
    InternalError,
}

impl FeedErrorCode {
    /// Returns true if this error is transient and the fetch may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SourceUnavailable)
    }

    /// Returns a human-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceUnavailable => "source_unavailable",
            Self::ParseFailure => "parse_failure",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for FeedErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while ingesting a feed.
#[derive(Debug, Error)]
pub struct FeedError {
    /// The error code categorizing this error.
    code: FeedErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The source that generated this error (usually its URL).
    source_id: Option<String>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FeedError {
    /// Creates a new feed error with the given code and message.
    pub fn new(code: FeedErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source_id: None,
            source: None,
        }
    }

    /// Creates a source-unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(FeedErrorCode::SourceUnavailable, message)
    }

    /// Creates a parse-failure error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(FeedErrorCode::ParseFailure, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FeedErrorCode::InternalError, message)
    }

    /// Sets the source identifier for this error.
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Sets the underlying cause for this error.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(cause));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> FeedErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the source identifier, if set.
    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    /// Returns true if this error is transient and may be retried.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref source_id) = self.source_id {
            write!(f, "[{}] ", source_id)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;
