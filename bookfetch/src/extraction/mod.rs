//! Content extraction orchestrator.
//!
//! [`ContentExtractor`] runs every configured source adapter in priority
//! order, keeps the records whose text clears the length floor, and hands
//! them to the ranker. Individual adapter failures are recorded and never
//! stop the remaining adapters. When nothing usable comes back the caller
//! receives an [`ExhaustedSourcesError`] listing every attempt.

mod report;
mod suggestions;

pub use report::{AttemptOutcome, SourceAttempt};
pub use suggestions::{suggestions_for, AVAILABILITY_NOTE};

use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cancellation::CancellationToken;
use crate::config::ExtractionConfig;
use crate::errors::{ExhaustedSourcesError, ExtractionError, SourceFailure};
use crate::events::{names, EventSink, LoggingEventSink};
use crate::models::{BookDescriptor, ContentRecord, PageClass};
use crate::ranking;
use crate::sources::{
    ArchiveFullTextAdapter, GoogleBooksAdapter, GutenbergAdapter, HathiTrustAdapter, OcrService,
    OpenLibraryAdapter, PageImageSource, ReqwestFetcher, SourceAdapter,
};

/// Orchestrates source adapters and picks the best record.
pub struct ContentExtractor {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    config: Arc<ExtractionConfig>,
    event_sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for ContentExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentExtractor")
            .field("adapters", &self.adapter_names())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ContentExtractor {
    /// Creates an extractor over an ordered list of adapters.
    ///
    /// Adapters run in the order given.
    #[must_use]
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, config: impl Into<Arc<ExtractionConfig>>) -> Self {
        let config = config.into();
        let event_sink: Arc<dyn EventSink> = if config.verbose_logging {
            Arc::new(LoggingEventSink::info())
        } else {
            Arc::new(LoggingEventSink::debug())
        };
        Self {
            adapters,
            config,
            event_sink,
        }
    }

    /// Creates an extractor with the built-in sources in priority order:
    /// Internet Archive, Project Gutenberg, HathiTrust, Google Books, Open Library.
    pub fn with_default_sources(
        config: ExtractionConfig,
        ocr: Arc<dyn OcrService>,
        page_images: Arc<dyn PageImageSource>,
    ) -> Result<Self, ExtractionError> {
        config.validate().map_err(ExtractionError::Config)?;
        let config = Arc::new(config);
        let fetcher = Arc::new(
            ReqwestFetcher::new(&config).map_err(|e| ExtractionError::Config(e.to_string()))?,
        );

        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(ArchiveFullTextAdapter::new(fetcher.clone(), config.clone(), ocr.clone())),
            Arc::new(GutenbergAdapter::new(fetcher.clone(), config.clone())),
            Arc::new(HathiTrustAdapter::new(fetcher.clone(), config.clone())),
            Arc::new(GoogleBooksAdapter::new(fetcher.clone(), config.clone(), ocr, page_images)),
            Arc::new(OpenLibraryAdapter::new(fetcher, config.clone())),
        ];
        Ok(Self::new(adapters, config))
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Names of the configured adapters, in run order.
    #[must_use]
    pub fn adapter_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extracts the requested page, or fails with an exhaustion report.
    pub async fn extract(
        &self,
        book: &BookDescriptor,
        page_class: PageClass,
    ) -> Result<ContentRecord, ExtractionError> {
        book.validate().map_err(ExtractionError::InvalidInput)?;

        let run_id = Uuid::now_v7();
        let start = Instant::now();
        info!(
            run_id = %run_id,
            title = %book.title,
            author = %book.author,
            genre = %book.genre,
            page_class = %page_class,
            "Starting content extraction"
        );
        self.event_sink.try_emit(
            names::EXTRACTION_STARTED,
            Some(serde_json::json!({
                "run_id": run_id.to_string(),
                "title": book.title,
                "author": book.author,
                "genre": book.genre,
                "page_class": page_class,
                "sources": self.adapter_names(),
                "concurrent": self.config.concurrent,
            })),
        );

        let results = if self.config.concurrent {
            join_all(
                self.adapters
                    .iter()
                    .map(|a| self.run_adapter(a.as_ref(), book, page_class, run_id)),
            )
            .await
        } else {
            let mut results = Vec::with_capacity(self.adapters.len());
            for adapter in &self.adapters {
                results.push(self.run_adapter(adapter.as_ref(), book, page_class, run_id).await);
            }
            results
        };

        let mut attempts = Vec::with_capacity(results.len());
        let mut records = Vec::new();
        for (attempt, record) in results {
            attempts.push(attempt);
            records.extend(record);
        }

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        if let Some(best) = ranking::pick(&records) {
            info!(
                run_id = %run_id,
                source = %best.source,
                confidence = best.confidence,
                chars = best.char_len(),
                candidates = records.len(),
                duration_ms,
                "Selected content record"
            );
            self.event_sink.try_emit(
                names::EXTRACTION_COMPLETED,
                Some(serde_json::json!({
                    "run_id": run_id.to_string(),
                    "source": best.source,
                    "confidence": best.confidence,
                    "is_content_page": best.is_content_page,
                    "chars": best.char_len(),
                    "candidates": records.len(),
                    "duration_ms": duration_ms,
                })),
            );
            return Ok(best.clone());
        }

        let exhausted = ExhaustedSourcesError {
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre,
            attempts,
            suggestions: suggestions_for(book),
            note: AVAILABILITY_NOTE.to_string(),
        };
        warn!(
            run_id = %run_id,
            attempted = exhausted.attempts.len(),
            duration_ms,
            "No source produced usable content"
        );
        self.event_sink.try_emit(
            names::EXTRACTION_EXHAUSTED,
            Some(serde_json::json!({
                "run_id": run_id.to_string(),
                "attempts": exhausted.attempts,
                "duration_ms": duration_ms,
            })),
        );
        Err(ExtractionError::Exhausted(exhausted))
    }

    /// Like [`Self::extract`], but aborts when the token is cancelled.
    ///
    /// In-flight adapter calls are dropped; nothing partial is returned.
    pub async fn extract_with_cancellation(
        &self,
        book: &BookDescriptor,
        page_class: PageClass,
        token: &CancellationToken,
    ) -> Result<ContentRecord, ExtractionError> {
        let cancelled = |token: &CancellationToken| {
            ExtractionError::Cancelled(token.reason().unwrap_or_else(|| "cancelled".to_string()))
        };
        if token.is_cancelled() {
            return Err(cancelled(token));
        }

        tokio::select! {
            biased;
            () = token.cancelled() => {
                warn!(title = %book.title, "Extraction cancelled");
                Err(cancelled(token))
            }
            result = self.extract(book, page_class) => result,
        }
    }

    /// Runs one adapter, isolating panics and applying the length floor.
    async fn run_adapter(
        &self,
        adapter: &dyn SourceAdapter,
        book: &BookDescriptor,
        page_class: PageClass,
        run_id: Uuid,
    ) -> (SourceAttempt, Option<ContentRecord>) {
        let name = adapter.name();
        let started_at = Utc::now();
        let start = Instant::now();
        debug!(run_id = %run_id, adapter = name, "Trying source");
        self.event_sink.try_emit(
            names::SOURCE_STARTED,
            Some(serde_json::json!({
                "run_id": run_id.to_string(),
                "adapter": name,
                "source": adapter.source(),
            })),
        );

        let result = AssertUnwindSafe(adapter.attempt(book, page_class))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                Err(SourceFailure::unavailable(
                    adapter.source(),
                    format!("adapter '{name}' panicked"),
                ))
            });
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(record) => {
                let chars = record.char_len();
                if chars > self.config.min_content_chars {
                    debug!(run_id = %run_id, adapter = name, source = %record.source, chars, confidence = record.confidence, "Source returned content");
                    self.event_sink.try_emit(
                        names::SOURCE_SUCCEEDED,
                        Some(serde_json::json!({
                            "run_id": run_id.to_string(),
                            "adapter": name,
                            "source": record.source,
                            "chars": chars,
                            "confidence": record.confidence,
                            "is_content_page": record.is_content_page,
                            "duration_ms": duration_ms,
                        })),
                    );
                    let attempt = SourceAttempt::new(record.source, name, AttemptOutcome::Accepted { chars })
                        .with_timing(started_at, duration_ms);
                    (attempt, Some(record))
                } else {
                    debug!(run_id = %run_id, adapter = name, chars, floor = self.config.min_content_chars, "Source returned too little text");
                    self.event_sink.try_emit(
                        names::SOURCE_BELOW_FLOOR,
                        Some(serde_json::json!({
                            "run_id": run_id.to_string(),
                            "adapter": name,
                            "source": record.source,
                            "chars": chars,
                            "duration_ms": duration_ms,
                        })),
                    );
                    let attempt = SourceAttempt::new(record.source, name, AttemptOutcome::BelowFloor { chars })
                        .with_timing(started_at, duration_ms);
                    (attempt, None)
                }
            }
            Err(failure) => {
                debug!(run_id = %run_id, adapter = name, kind = %failure.kind, reason = %failure.reason, "Source failed");
                self.event_sink.try_emit(
                    names::SOURCE_FAILED,
                    Some(serde_json::json!({
                        "run_id": run_id.to_string(),
                        "adapter": name,
                        "source": failure.origin,
                        "kind": failure.kind,
                        "reason": failure.reason,
                        "duration_ms": duration_ms,
                    })),
                );
                let attempt = SourceAttempt::new(failure.origin, name, (&failure).into())
                    .with_timing(started_at, duration_ms);
                (attempt, None)
            }
        }
    }
}
