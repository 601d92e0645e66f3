//! Error types for book content extraction.
//!
//! Adapter-level failures (`SourceFailure`) are ordinary values recovered by
//! the orchestrator. Only `ExtractionError` ever reaches the caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::extraction::{AttemptOutcome, SourceAttempt};
use crate::models::{ContentSource, Genre};

/// The error returned by [`crate::extraction::ContentExtractor`].
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The book descriptor failed its precondition check.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Every source failed or returned too little text.
    #[error("{0}")]
    Exhausted(#[from] ExhaustedSourcesError),

    /// The caller aborted the extraction.
    #[error("Extraction cancelled: {0}")]
    Cancelled(String),

    /// The extractor could not be constructed from its configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExtractionError {
    /// Returns the exhaustion report, if this is an exhaustion failure.
    #[must_use]
    pub fn as_exhausted(&self) -> Option<&ExhaustedSourcesError> {
        match self {
            Self::Exhausted(e) => Some(e),
            _ => None,
        }
    }
}

/// Why a single source attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network error, timeout or non-2xx response.
    SourceUnavailable,
    /// No results, or nothing with any readable access.
    NoMatch,
    /// Unexpected response shape or undecodable payload.
    MalformedPayload,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SourceUnavailable => "source unavailable",
            Self::NoMatch => "no match",
            Self::MalformedPayload => "malformed payload",
        };
        write!(f, "{s}")
    }
}

/// A recoverable failure from one source adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{origin}: {kind}: {reason}")]
pub struct SourceFailure {
    /// The source that failed.
    pub origin: ContentSource,
    /// Failure category.
    pub kind: FailureKind,
    /// Human readable detail.
    pub reason: String,
}

impl SourceFailure {
    /// Creates a new failure.
    #[must_use]
    pub fn new(origin: ContentSource, kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            origin,
            kind,
            reason: reason.into(),
        }
    }

    /// Creates a `SourceUnavailable` failure.
    #[must_use]
    pub fn unavailable(source: ContentSource, reason: impl Into<String>) -> Self {
        Self::new(source, FailureKind::SourceUnavailable, reason)
    }

    /// Creates a `NoMatch` failure.
    #[must_use]
    pub fn no_match(source: ContentSource, reason: impl Into<String>) -> Self {
        Self::new(source, FailureKind::NoMatch, reason)
    }

    /// Creates a `MalformedPayload` failure.
    #[must_use]
    pub fn malformed(source: ContentSource, reason: impl Into<String>) -> Self {
        Self::new(source, FailureKind::MalformedPayload, reason)
    }

    /// Maps an HTTP-layer error onto the failure taxonomy.
    #[must_use]
    pub fn from_fetch(source: ContentSource, err: &FetchError) -> Self {
        let kind = match err {
            FetchError::Timeout { .. } | FetchError::Status { .. } | FetchError::Transport { .. } => {
                FailureKind::SourceUnavailable
            }
            FetchError::TooLarge { .. } | FetchError::Decode { .. } => FailureKind::MalformedPayload,
        };
        Self::new(source, kind, err.to_string())
    }
}

/// Errors raised by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The call did not complete within its timeout.
    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Applied timeout.
        timeout_ms: u64,
    },

    /// The server answered with a non-2xx status.
    #[error("request to {url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status code.
        status: u16,
    },

    /// Connection, TLS or protocol failure.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying error message.
        message: String,
    },

    /// The body exceeded the configured size cap.
    #[error("response from {url} exceeded {limit} bytes")]
    TooLarge {
        /// Requested URL.
        url: String,
        /// Byte limit.
        limit: usize,
    },

    /// The body could not be decoded into the expected shape.
    #[error("could not decode response from {url}: {message}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Decoder message.
        message: String,
    },
}

impl FetchError {
    /// Whether the status code indicates the resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404 | 410, .. })
    }
}

/// Terminal failure raised when no source produced usable content.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub struct ExhaustedSourcesError {
    /// Requested title.
    pub title: String,
    /// Requested author.
    pub author: String,
    /// Genre the suggestions were chosen for.
    pub genre: Genre,
    /// One entry per source that was attempted, in priority order.
    pub attempts: Vec<SourceAttempt>,
    /// Genre-conditioned next steps for the user.
    pub suggestions: Vec<String>,
    /// Closing note about availability of copyrighted works.
    pub note: String,
}

impl ExhaustedSourcesError {
    /// Sources that were attempted, in order.
    #[must_use]
    pub fn attempted_sources(&self) -> Vec<ContentSource> {
        self.attempts.iter().map(|a| a.source).collect()
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("ExhaustedSources"));
        map.insert("title".to_string(), serde_json::json!(self.title));
        map.insert("author".to_string(), serde_json::json!(self.author));
        map.insert("genre".to_string(), serde_json::json!(self.genre));
        map.insert(
            "attempts".to_string(),
            serde_json::json!(self
                .attempts
                .iter()
                .map(|a| {
                    serde_json::json!({
                        "source": a.source.as_str(),
                        "adapter": a.adapter,
                        "reason": a.outcome.describe(),
                    })
                })
                .collect::<Vec<_>>()),
        );
        map.insert("suggestions".to_string(), serde_json::json!(self.suggestions));
        map.insert("note".to_string(), serde_json::json!(self.note));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

impl fmt::Display for ExhaustedSourcesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Could not retrieve content for \"{}\" by {} from any source.",
            self.title, self.author
        )?;
        writeln!(f, "Sources tried:")?;
        for attempt in &self.attempts {
            let marker = match attempt.outcome {
                AttemptOutcome::Accepted { .. } => "+",
                _ => "-",
            };
            writeln!(
                f,
                "  {marker} {}: {}",
                attempt.source.display_name(),
                attempt.outcome.describe()
            )?;
        }
        if !self.suggestions.is_empty() {
            writeln!(f, "Suggestions:")?;
            for suggestion in &self.suggestions {
                writeln!(f, "  * {suggestion}")?;
            }
        }
        write!(f, "{}", self.note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_maps_to_kind() {
        let timeout = FetchError::Timeout {
            url: "https://x".to_string(),
            timeout_ms: 10,
        };
        assert_eq!(
            SourceFailure::from_fetch(ContentSource::Gutenberg, &timeout).kind,
            FailureKind::SourceUnavailable
        );

        let decode = FetchError::Decode {
            url: "https://x".to_string(),
            message: "eof".to_string(),
        };
        assert_eq!(
            SourceFailure::from_fetch(ContentSource::Gutenberg, &decode).kind,
            FailureKind::MalformedPayload
        );
    }

    #[test]
    fn test_is_not_found() {
        let gone = FetchError::Status {
            url: "u".to_string(),
            status: 404,
        };
        assert!(gone.is_not_found());
        let busy = FetchError::Status {
            url: "u".to_string(),
            status: 503,
        };
        assert!(!busy.is_not_found());
    }

    #[test]
    fn test_source_failure_display() {
        let failure = SourceFailure::no_match(ContentSource::OpenLibrary, "zero results");
        assert_eq!(failure.to_string(), "open-library: no match: zero results");
    }

    #[test]
    fn test_exhausted_display_lists_attempts() {
        let err = ExhaustedSourcesError {
            title: "Emma".to_string(),
            author: "Jane Austen".to_string(),
            genre: Genre::Fiction,
            attempts: vec![SourceAttempt::new(
                ContentSource::Gutenberg,
                "gutenberg",
                AttemptOutcome::Failed {
                    kind: FailureKind::NoMatch,
                    reason: "zero results".to_string(),
                },
            )],
            suggestions: vec!["Try the author's website".to_string()],
            note: "Many works are not freely available.".to_string(),
        };

        let text = err.to_string();
        assert!(text.contains("\"Emma\" by Jane Austen"));
        assert!(text.contains("Project Gutenberg: no match: zero results"));
        assert!(text.contains("Try the author's website"));

        let dict = err.to_dict();
        assert_eq!(dict.get("type").unwrap(), "ExhaustedSources");
        assert_eq!(dict["attempts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_extraction_error_as_exhausted() {
        let err = ExtractionError::InvalidInput("empty title".to_string());
        assert!(err.as_exhausted().is_none());
        assert_eq!(err.to_string(), "Invalid input: empty title");
    }
}
