//! Per-source attempt records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::{FailureKind, SourceFailure};
use crate::models::ContentSource;

/// How a single source attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The record passed the length floor and was eligible for ranking.
    Accepted {
        /// Characters in the record text.
        chars: usize,
    },
    /// The adapter returned a record that was too short to use.
    BelowFloor {
        /// Characters in the record text.
        chars: usize,
    },
    /// The adapter failed.
    Failed {
        /// Failure category.
        kind: FailureKind,
        /// Human readable detail.
        reason: String,
    },
}

impl AttemptOutcome {
    /// Whether the attempt produced a rankable record.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Short human readable description.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Accepted { chars } => format!("returned {chars} characters"),
            Self::BelowFloor { chars } => format!("returned only {chars} characters"),
            Self::Failed { kind, reason } => format!("{kind}: {reason}"),
        }
    }
}

impl From<&SourceFailure> for AttemptOutcome {
    fn from(failure: &SourceFailure) -> Self {
        Self::Failed {
            kind: failure.kind,
            reason: failure.reason.clone(),
        }
    }
}

/// One adapter invocation and its result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAttempt {
    /// Source the attempt is attributed to.
    pub source: ContentSource,
    /// Name of the adapter that ran.
    pub adapter: String,
    /// How it ended.
    pub outcome: AttemptOutcome,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
    /// When the attempt started.
    pub started_at: DateTime<Utc>,
}

impl SourceAttempt {
    /// Creates a new attempt record stamped with the current time.
    #[must_use]
    pub fn new(source: ContentSource, adapter: &str, outcome: AttemptOutcome) -> Self {
        Self {
            source,
            adapter: adapter.to_string(),
            outcome,
            duration_ms: 0.0,
            started_at: Utc::now(),
        }
    }

    /// Sets the timing fields.
    #[must_use]
    pub fn with_timing(mut self, started_at: DateTime<Utc>, duration_ms: f64) -> Self {
        self.started_at = started_at;
        self.duration_ms = duration_ms;
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("source".to_string(), serde_json::json!(self.source.as_str()));
        map.insert("adapter".to_string(), serde_json::json!(self.adapter));
        map.insert("outcome".to_string(), serde_json::json!(self.outcome));
        map.insert("description".to_string(), serde_json::json!(self.outcome.describe()));
        map.insert("duration_ms".to_string(), serde_json::json!(self.duration_ms));
        map.insert("started_at".to_string(), serde_json::json!(self.started_at.to_rfc3339()));
        map
    }
}
