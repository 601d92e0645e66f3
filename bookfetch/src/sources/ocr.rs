//! OCR and page-image collaborators.
//!
//! Both are injected into the adapters that need them. `NoOcr` and
//! `NoPageImages` disable the corresponding paths.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::http::Fetcher;
use crate::config::OcrConfig;
use crate::segmenter::clean_ocr_text;

/// Turns a page image into text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OcrService: Send + Sync {
    /// Returns the recognized text, or `None` when nothing was readable.
    async fn ocr(&self, image: &[u8]) -> Option<String>;
}

/// Supplies rendered page images for a preview URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageImageSource: Send + Sync {
    /// Returns up to `max_pages` images. Empty when the preview cannot be rendered.
    async fn request_page_images(&self, preview_url: &str, max_pages: usize) -> Vec<Vec<u8>>;
}

/// OCR service that never recognizes anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOcr;

#[async_trait]
impl OcrService for NoOcr {
    async fn ocr(&self, _image: &[u8]) -> Option<String> {
        None
    }
}

/// Page-image source that never renders anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPageImages;

#[async_trait]
impl PageImageSource for NoPageImages {
    async fn request_page_images(&self, _preview_url: &str, _max_pages: usize) -> Vec<Vec<u8>> {
        Vec::new()
    }
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    text: String,
}

/// OCR through an HTTP text-extraction endpoint.
///
/// Posts `{"image": <base64>, "prompt": ...}` and reads `{"text": ...}` back.
pub struct HttpOcrService {
    fetcher: Arc<dyn Fetcher>,
    endpoint: String,
    prompt: String,
    timeout: Duration,
}

impl HttpOcrService {
    /// Creates a new HTTP OCR client.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, endpoint: impl Into<String>, config: &OcrConfig) -> Self {
        Self {
            fetcher,
            endpoint: endpoint.into(),
            prompt: config.prompt.clone(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Sets the per-image timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for HttpOcrService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOcrService")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl OcrService for HttpOcrService {
    async fn ocr(&self, image: &[u8]) -> Option<String> {
        let body = serde_json::json!({
            "image": base64::engine::general_purpose::STANDARD.encode(image),
            "prompt": self.prompt,
        });

        let response = match self.fetcher.post_json(&self.endpoint, &body, self.timeout).await {
            Ok(r) => r,
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "OCR request failed");
                return None;
            }
        };

        match response.json::<OcrResponse>() {
            Ok(parsed) if !parsed.text.trim().is_empty() => Some(parsed.text),
            Ok(_) => None,
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "OCR response was not understood");
                None
            }
        }
    }
}

/// Collects OCR'd pages until enough good ones have been seen.
#[derive(Debug)]
pub struct OcrPages {
    pages: Vec<String>,
    min_page_chars: usize,
    target_good_pages: usize,
}

impl OcrPages {
    /// Creates a new collector from the OCR settings.
    #[must_use]
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            pages: Vec::new(),
            min_page_chars: config.min_page_chars,
            target_good_pages: config.target_good_pages.max(1),
        }
    }

    /// Cleans one OCR result and keeps it if long enough.
    ///
    /// Returns `true` once the target number of good pages is reached.
    pub fn offer(&mut self, raw: Option<String>) -> bool {
        if let Some(raw) = raw {
            let cleaned = clean_ocr_text(&raw);
            let chars = cleaned.chars().count();
            if chars > self.min_page_chars {
                self.pages.push(cleaned);
            } else {
                debug!(chars, "Discarding short OCR page");
            }
        }
        self.is_done()
    }

    /// Whether enough good pages have been collected.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.pages.len() >= self.target_good_pages
    }

    /// Number of good pages so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether no good page was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Joins the good pages with blank lines.
    #[must_use]
    pub fn into_text(self) -> String {
        self.pages.join("\n\n")
    }
}

/// OCRs images in order, stopping early once enough good pages exist.
pub async fn ocr_images(ocr: &dyn OcrService, images: &[Vec<u8>], config: &OcrConfig) -> OcrPages {
    let mut pages = OcrPages::new(config);
    for image in images {
        if pages.offer(ocr.ocr(image).await) {
            break;
        }
    }
    pages
}
