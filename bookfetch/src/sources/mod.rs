//! Source adapters.
//!
//! Each adapter queries one external book source and either returns a
//! [`ContentRecord`] or a [`SourceFailure`]. Adapters never panic and never
//! let a transport error escape as anything other than a failure value.

mod archive;
mod google_books;
mod gutenberg;
mod hathitrust;
pub mod http;
pub mod ocr;
mod open_library;

pub use archive::ArchiveFullTextAdapter;
pub use google_books::GoogleBooksAdapter;
pub use gutenberg::GutenbergAdapter;
pub use hathitrust::HathiTrustAdapter;
pub use http::{FetchResult, Fetcher, ReqwestFetcher};
pub use ocr::{HttpOcrService, NoOcr, NoPageImages, OcrPages, OcrService, PageImageSource};
pub use open_library::OpenLibraryAdapter;

use async_trait::async_trait;

use crate::errors::SourceFailure;
use crate::models::{BookDescriptor, ContentRecord, ContentSource, PageClass};
use crate::segmenter::{clean_layout_artifacts, detect_page_type, select_page};

/// A single external source of book text.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Adapter name used in logs and reports.
    fn name(&self) -> &str;

    /// The source tag attached to records this adapter produces.
    fn source(&self) -> ContentSource;

    /// Tries to produce a content record for the book.
    async fn attempt(
        &self,
        book: &BookDescriptor,
        page_class: PageClass,
    ) -> Result<ContentRecord, SourceFailure>;
}

/// Cleans a full text, cuts the requested page and classifies it.
///
/// Returns `None` when nothing is left after cleaning.
pub(crate) fn segment_full_text(
    raw: &str,
    source: ContentSource,
    confidence: u8,
    book: &BookDescriptor,
    page_class: PageClass,
) -> Option<ContentRecord> {
    let cleaned = clean_layout_artifacts(raw);
    let page = select_page(&cleaned, page_class, book.genre);
    if page.trim().is_empty() {
        return None;
    }
    let page_type = detect_page_type(&page);
    Some(ContentRecord::content(page, source, confidence, page_type))
}

/// Quotes a value for an exact-phrase query.
pub(crate) fn phrase(value: &str) -> String {
    format!("\"{}\"", value.trim().replace('"', ""))
}

/// Joins a base URL and a path.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use super::http::{Fetcher, ReqwestFetcher};
    use crate::config::{ExtractionConfig, SourceEndpoints};

    /// Config pointing every endpoint at a mock server, with fast retries.
    pub(crate) fn mock_config(uri: &str) -> Arc<ExtractionConfig> {
        let mut config = ExtractionConfig::new()
            .with_max_retries(0)
            .with_endpoints(SourceEndpoints::all_at(uri));
        config.retry.jitter = false;
        Arc::new(config)
    }

    pub(crate) fn mock_fetcher(config: &ExtractionConfig) -> Arc<dyn Fetcher> {
        Arc::new(ReqwestFetcher::new(config).unwrap())
    }

    /// A chaptered book body long enough to segment.
    pub(crate) fn chaptered_text() -> String {
        let chapter = |tag: &str| {
            (0..15)
                .map(|i| format!("{tag} paragraph {i} carries the story forward with steady, ordinary prose."))
                .collect::<Vec<_>>()
                .join("\n")
        };
        format!(
            "CHAPTER I\n{}\nCHAPTER II\n{}\nCHAPTER III\n{}\n",
            chapter("Opening"),
            chapter("Middle"),
            chapter("Closing")
        )
    }
}
