//! Extraction lifecycle events.
//!
//! Events are a diagnostic side channel: they report which source was tried
//! and why it failed, and never influence the value `extract` returns.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event names emitted by the extractor.
pub mod names {
    /// An extraction request started.
    pub const EXTRACTION_STARTED: &str = "extraction.started";
    /// An adapter is about to run.
    pub const SOURCE_STARTED: &str = "source.started";
    /// An adapter returned a record above the length floor.
    pub const SOURCE_SUCCEEDED: &str = "source.succeeded";
    /// An adapter returned a record at or below the length floor.
    pub const SOURCE_BELOW_FLOOR: &str = "source.below_floor";
    /// An adapter failed.
    pub const SOURCE_FAILED: &str = "source.failed";
    /// A record was selected.
    pub const EXTRACTION_COMPLETED: &str = "extraction.completed";
    /// No source produced a usable record.
    pub const EXTRACTION_EXHAUSTED: &str = "extraction.exhausted";
}
