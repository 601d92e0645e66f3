//! Configuration types for content extraction.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Top-level configuration consumed by the extractor and every adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Log adapter progress at INFO instead of DEBUG.
    #[serde(default)]
    pub verbose_logging: bool,
    /// Retries for transient HTTP failures, on top of the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Timeout for full downloads in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Timeout for search and metadata calls in milliseconds.
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,
    /// Timeout for existence probes in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Run adapters concurrently instead of one after another.
    #[serde(default)]
    pub concurrent: bool,
    /// Records must be strictly longer than this many characters to rank.
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,
    /// Maximum response size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Retry backoff configuration.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Page-image OCR configuration.
    #[serde(default)]
    pub ocr: OcrConfig,
    /// Base URLs of the external systems.
    #[serde(default)]
    pub endpoints: SourceEndpoints,
}

fn default_max_retries() -> usize {
    2
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_search_timeout_ms() -> u64 {
    10_000
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

fn default_min_content_chars() -> usize {
    100
}

fn default_max_response_bytes() -> usize {
    25 * 1024 * 1024 // 25MB
}

fn default_user_agent() -> String {
    "bookfetch/0.1 (+https://github.com/bookfetch/bookfetch-rust)".to_string()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            verbose_logging: false,
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
            search_timeout_ms: default_search_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            concurrent: false,
            min_content_chars: default_min_content_chars(),
            max_response_bytes: default_max_response_bytes(),
            user_agent: default_user_agent(),
            retry: RetryConfig::default(),
            ocr: OcrConfig::default(),
            endpoints: SourceEndpoints::default(),
        }
    }
}

impl ExtractionConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Enables verbose logging.
    #[must_use]
    pub fn with_verbose_logging(mut self, verbose: bool) -> Self {
        self.verbose_logging = verbose;
        self
    }

    /// Sets the retry count.
    #[must_use]
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the download timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Runs adapters concurrently.
    #[must_use]
    pub fn with_concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Replaces the endpoint table.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: SourceEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Download timeout as a Duration.
    #[must_use]
    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Search timeout as a Duration.
    #[must_use]
    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    /// Probe timeout as a Duration.
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Checks the configuration for values that would make every call fail.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_ms == 0 || self.search_timeout_ms == 0 || self.probe_timeout_ms == 0 {
            return Err("timeouts must be greater than zero".to_string());
        }
        if self.ocr.candidate_pages.is_empty() {
            return Err("ocr.candidate_pages must not be empty".to_string());
        }
        if self.ocr.target_good_pages == 0 {
            return Err("ocr.target_good_pages must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Retry configuration for failed requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Initial delay between retries in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Maximum delay between retries in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Status codes that should trigger a retry.
    #[serde(default = "default_retry_status_codes")]
    pub retry_status_codes: HashSet<u16>,
    /// Randomize each delay between zero and the computed value.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_retry_status_codes() -> HashSet<u16> {
    [429, 500, 502, 503, 504].into_iter().collect()
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            retry_status_codes: default_retry_status_codes(),
            jitter: default_jitter(),
        }
    }
}

impl RetryConfig {
    /// Calculates the un-jittered delay for a given attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = self.base_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = delay.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Whether a status code should trigger a retry.
    #[must_use]
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_status_codes.contains(&status)
    }
}

/// Configuration for the page-image OCR fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Page numbers to try, in order.
    #[serde(default = "default_candidate_pages")]
    pub candidate_pages: Vec<u32>,
    /// Stop probing after this many pages are confirmed to exist.
    #[serde(default = "default_max_available_pages")]
    pub max_available_pages: usize,
    /// Stop OCR once this many pages produced usable text.
    #[serde(default = "default_target_good_pages")]
    pub target_good_pages: usize,
    /// A page's OCR text must exceed this many characters to count.
    #[serde(default = "default_min_page_chars")]
    pub min_page_chars: usize,
    /// Prompt sent with each image to the vision service.
    #[serde(default = "default_ocr_prompt")]
    pub prompt: String,
}

fn default_candidate_pages() -> Vec<u32> {
    vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 15, 20]
}

fn default_max_available_pages() -> usize {
    8
}

fn default_target_good_pages() -> usize {
    3
}

fn default_min_page_chars() -> usize {
    100
}

fn default_ocr_prompt() -> String {
    "Extract all of the printed book text on this page. Return only the text.".to_string()
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            candidate_pages: default_candidate_pages(),
            max_available_pages: default_max_available_pages(),
            target_good_pages: default_target_good_pages(),
            min_page_chars: default_min_page_chars(),
            prompt: default_ocr_prompt(),
        }
    }
}

/// Base URLs for every external system the adapters talk to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEndpoints {
    /// Internet Archive.
    #[serde(default = "default_archive_base")]
    pub archive_base: String,
    /// Override for the inside-the-book search host; defaults to the item's own server.
    #[serde(default)]
    pub archive_inside_base: Option<String>,
    /// Gutendex catalogue for Project Gutenberg.
    #[serde(default = "default_gutendex_base")]
    pub gutendex_base: String,
    /// HathiTrust bibliographic API.
    #[serde(default = "default_hathitrust_catalog_base")]
    pub hathitrust_catalog_base: String,
    /// HathiTrust page-text viewer.
    #[serde(default = "default_hathitrust_babel_base")]
    pub hathitrust_babel_base: String,
    /// Google Books API.
    #[serde(default = "default_google_books_base")]
    pub google_books_base: String,
    /// Open Library.
    #[serde(default = "default_open_library_base")]
    pub open_library_base: String,
}

fn default_archive_base() -> String {
    "https://archive.org".to_string()
}

fn default_gutendex_base() -> String {
    "https://gutendex.com".to_string()
}

fn default_hathitrust_catalog_base() -> String {
    "https://catalog.hathitrust.org".to_string()
}

fn default_hathitrust_babel_base() -> String {
    "https://babel.hathitrust.org".to_string()
}

fn default_google_books_base() -> String {
    "https://www.googleapis.com".to_string()
}

fn default_open_library_base() -> String {
    "https://openlibrary.org".to_string()
}

impl Default for SourceEndpoints {
    fn default() -> Self {
        Self {
            archive_base: default_archive_base(),
            archive_inside_base: None,
            gutendex_base: default_gutendex_base(),
            hathitrust_catalog_base: default_hathitrust_catalog_base(),
            hathitrust_babel_base: default_hathitrust_babel_base(),
            google_books_base: default_google_books_base(),
            open_library_base: default_open_library_base(),
        }
    }
}

impl SourceEndpoints {
    /// Points every endpoint at one base URL. Used with mock servers.
    #[must_use]
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            archive_base: base.clone(),
            archive_inside_base: Some(base.clone()),
            gutendex_base: base.clone(),
            hathitrust_catalog_base: base.clone(),
            hathitrust_babel_base: base.clone(),
            google_books_base: base.clone(),
            open_library_base: base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_config_defaults() {
        let config = ExtractionConfig::default();
        assert!(!config.verbose_logging);
        assert_eq!(config.timeout_ms, 30_000);
        assert!(config.search_timeout_ms < config.timeout_ms);
        assert!(config.probe_timeout_ms < config.search_timeout_ms);
        assert_eq!(config.min_content_chars, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = ExtractionConfig::from_json_str(
            r#"{"verbose_logging": true, "max_retries": 0, "timeout_ms": 1000, "unknown": 1}"#,
        )
        .unwrap();
        assert!(config.verbose_logging);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.timeout_ms, 1000);
        assert_eq!(config.search_timeout_ms, 10_000);
        assert_eq!(config.ocr.candidate_pages.len(), 12);
        assert_eq!(config.endpoints.archive_base, "https://archive.org");
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = ExtractionConfig::new().with_timeout_ms(0);
        assert!(config.validate().is_err());

        let mut config = ExtractionConfig::new();
        config.ocr.candidate_pages.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_config_delay() {
        let config = RetryConfig {
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            ..Default::default()
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
    }

    #[test]
    fn test_retry_config_max_delay() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(20), Duration::from_millis(5_000));
    }

    #[test]
    fn test_retry_status_codes() {
        let config = RetryConfig::default();
        assert!(config.should_retry_status(429));
        assert!(config.should_retry_status(503));
        assert!(!config.should_retry_status(200));
        assert!(!config.should_retry_status(404));
    }

    #[test]
    fn test_endpoints_all_at() {
        let endpoints = SourceEndpoints::all_at("http://127.0.0.1:9999/");
        assert_eq!(endpoints.gutendex_base, "http://127.0.0.1:9999");
        assert_eq!(endpoints.archive_inside_base.as_deref(), Some("http://127.0.0.1:9999"));
    }
}
