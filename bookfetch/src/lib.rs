//! # Bookfetch
//!
//! Multi-source content extraction for identified books.
//!
//! Given a title and author, bookfetch queries a cascade of book sources,
//! normalizes what they return into [`ContentRecord`](models::ContentRecord)s,
//! and picks the best one:
//!
//! - **Source adapters**: Internet Archive, Project Gutenberg, HathiTrust,
//!   Google Books and Open Library, each behind the same `SourceAdapter` trait
//! - **Page segmentation**: cuts the first or second content page out of a
//!   full book text, skipping front matter
//! - **Ranking**: a deterministic integer ordering over candidate records
//! - **Orchestration**: fault-isolated adapter runs with an itemized report
//!   when every source comes back empty
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bookfetch::prelude::*;
//! use std::sync::Arc;
//!
//! let extractor = ContentExtractor::with_default_sources(
//!     ExtractionConfig::default(),
//!     Arc::new(NoOcr),
//!     Arc::new(NoPageImages),
//! )?;
//!
//! let book = BookDescriptor::new("Pride and Prejudice", "Jane Austen").with_genre(Genre::Fiction);
//! let record = extractor.extract(&book, PageClass::FirstContentPage).await?;
//! println!("{} ({}): {}", record.source, record.confidence, record.text);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod errors;
pub mod events;
pub mod extraction;
pub mod genre;
pub mod models;
pub mod observability;
pub mod ranking;
pub mod segmenter;
pub mod sources;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{ExtractionConfig, OcrConfig, RetryConfig, SourceEndpoints};
    pub use crate::errors::{
        ExhaustedSourcesError, ExtractionError, FailureKind, FetchError, SourceFailure,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::extraction::{AttemptOutcome, ContentExtractor, SourceAttempt};
    pub use crate::genre::classify_by_keywords;
    pub use crate::models::{
        BookDescriptor, ContentRecord, ContentSource, Genre, PageClass, PageType,
    };
    pub use crate::observability::init_tracing;
    pub use crate::ranking::pick;
    pub use crate::segmenter::select_page;
    pub use crate::sources::{
        HttpOcrService, NoOcr, NoPageImages, OcrService, PageImageSource, SourceAdapter,
    };
}
