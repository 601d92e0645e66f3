//! Internet Archive full texts.
//!
//! Each candidate item is tried along a fixed ladder: a declared text file
//! from the item metadata, conventional text filenames, inside-the-book
//! snippets, then OCR of page images. When nothing yields enough text the
//! adapter falls back to an access-information message.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::http::Fetcher;
use super::ocr::{OcrPages, OcrService};
use super::{join_url, phrase, segment_full_text, SourceAdapter};
use crate::config::ExtractionConfig;
use crate::errors::SourceFailure;
use crate::models::{BookDescriptor, ContentRecord, ContentSource, PageClass, PageType};
use crate::segmenter::detect_page_type;

const FULL_TEXT_CONFIDENCE: u8 = 90;
const SNIPPET_CONFIDENCE: u8 = 70;
const OCR_CONFIDENCE: u8 = 75;
const METADATA_CONFIDENCE: u8 = 55;
const MAX_CANDIDATES: usize = 3;
const MIN_PATH_CHARS: usize = 200;
const TEXT_FILE_PATTERNS: [&str; 3] = ["_djvu.txt", ".txt", "_text.txt"];

/// One search hit. Fields other than the identifier are best-effort.
#[derive(Debug, Clone)]
struct ArchiveDoc {
    identifier: String,
    title: Option<String>,
    creator: Option<String>,
    year: Option<String>,
    description: Option<String>,
}

impl ArchiveDoc {
    fn from_value(value: &Value) -> Option<Self> {
        let identifier = value.get("identifier")?.as_str()?.trim();
        if identifier.is_empty() {
            return None;
        }
        Some(Self {
            identifier: identifier.to_string(),
            title: first_string(value.get("title")),
            creator: first_string(value.get("creator")),
            year: first_string(value.get("year")),
            description: first_string(value.get("description")),
        })
    }
}

/// Reads a field that may be a string, a number or an array of strings.
fn first_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.iter().find_map(|v| v.as_str().map(String::from)),
        _ => None,
    }
}

#[derive(Debug, Default, Deserialize)]
struct ItemMetadata {
    #[serde(default)]
    server: Option<String>,
    #[serde(default)]
    dir: Option<String>,
    #[serde(default)]
    files: Vec<ItemFile>,
}

#[derive(Debug, Deserialize)]
struct ItemFile {
    name: String,
    #[serde(default)]
    format: Option<String>,
}

impl ItemMetadata {
    fn text_file(&self) -> Option<&str> {
        let by_format = |wanted: &str| {
            self.files
                .iter()
                .find(|f| f.format.as_deref() == Some(wanted))
                .map(|f| f.name.as_str())
        };
        by_format("DjVuTXT")
            .or_else(|| by_format("Text"))
            .or_else(|| {
                self.files
                    .iter()
                    .find(|f| f.name.to_lowercase().ends_with(".txt"))
                    .map(|f| f.name.as_str())
            })
    }
}

#[derive(Debug, Deserialize)]
struct InsideResponse {
    #[serde(default)]
    matches: Vec<InsideMatch>,
}

#[derive(Debug, Deserialize)]
struct InsideMatch {
    #[serde(default)]
    text: String,
}

/// Adapter for digitized texts on the Internet Archive.
pub struct ArchiveFullTextAdapter {
    fetcher: Arc<dyn Fetcher>,
    config: Arc<ExtractionConfig>,
    ocr: Arc<dyn OcrService>,
}

impl ArchiveFullTextAdapter {
    /// Creates a new Internet Archive adapter.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, config: Arc<ExtractionConfig>, ocr: Arc<dyn OcrService>) -> Self {
        Self { fetcher, config, ocr }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.config.endpoints.archive_base, path)
    }

    async fn search(&self, book: &BookDescriptor) -> Result<Vec<ArchiveDoc>, SourceFailure> {
        let q = format!(
            "title:({}) AND creator:({}) AND mediatype:(texts)",
            phrase(&book.title),
            phrase(&book.author)
        );
        let query = [
            ("q", q),
            ("fl[]", "identifier".to_string()),
            ("fl[]", "title".to_string()),
            ("fl[]", "creator".to_string()),
            ("fl[]", "year".to_string()),
            ("fl[]", "description".to_string()),
            ("rows", MAX_CANDIDATES.to_string()),
            ("output", "json".to_string()),
        ];
        let response = self
            .fetcher
            .fetch(&self.url("/advancedsearch.php"), &query, self.config.search_timeout())
            .await
            .map_err(|e| SourceFailure::from_fetch(ContentSource::ArchiveFulltext, &e))?;
        let body: Value = response
            .json()
            .map_err(|e| SourceFailure::malformed(ContentSource::ArchiveFulltext, e.to_string()))?;
        let docs = body
            .pointer("/response/docs")
            .and_then(Value::as_array)
            .ok_or_else(|| SourceFailure::malformed(ContentSource::ArchiveFulltext, "search response has no docs"))?;

        Ok(docs
            .iter()
            .filter_map(|d| {
                let doc = ArchiveDoc::from_value(d);
                if doc.is_none() {
                    debug!(doc = %d, "Skipping malformed search hit");
                }
                doc
            })
            .take(MAX_CANDIDATES)
            .collect())
    }

    async fn metadata(&self, id: &str) -> Option<ItemMetadata> {
        let response = self
            .fetcher
            .fetch(&self.url(&format!("/metadata/{id}")), &[], self.config.search_timeout())
            .await
            .map_err(|e| debug!(id, error = %e, "Metadata lookup failed"))
            .ok()?;
        response
            .json::<ItemMetadata>()
            .map_err(|e| debug!(id, error = %e, "Metadata was not understood"))
            .ok()
    }

    async fn download_text(&self, id: &str, file: &str) -> Option<String> {
        let url = self.url(&format!("/download/{id}/{file}"));
        match self.fetcher.fetch(&url, &[], self.config.download_timeout()).await {
            Ok(response) => Some(response.text()),
            Err(e) => {
                debug!(id, file, error = %e, "Text download failed");
                None
            }
        }
    }

    fn accept_full_text(&self, raw: &str, book: &BookDescriptor, page_class: PageClass) -> Option<ContentRecord> {
        segment_full_text(raw, ContentSource::ArchiveFulltext, FULL_TEXT_CONFIDENCE, book, page_class)
            .filter(|r| r.char_len() >= MIN_PATH_CHARS)
    }

    /// Path (a): a text file declared in the item metadata.
    async fn declared_text(
        &self,
        doc: &ArchiveDoc,
        metadata: Option<&ItemMetadata>,
        book: &BookDescriptor,
        page_class: PageClass,
    ) -> Option<ContentRecord> {
        let file = metadata?.text_file()?;
        let raw = self.download_text(&doc.identifier, file).await?;
        self.accept_full_text(&raw, book, page_class)
    }

    /// Path (b): conventional text filenames, probed before download.
    async fn conventional_text(&self, doc: &ArchiveDoc, book: &BookDescriptor, page_class: PageClass) -> Option<ContentRecord> {
        let id = doc.identifier.as_str();
        for suffix in TEXT_FILE_PATTERNS {
            let file = format!("{id}{suffix}");
            let url = self.url(&format!("/download/{id}/{file}"));
            if !matches!(self.fetcher.probe(&url, self.config.probe_timeout()).await, Ok(true)) {
                continue;
            }
            if let Some(record) = self
                .download_text(id, &file)
                .await
                .and_then(|raw| self.accept_full_text(&raw, book, page_class))
            {
                return Some(record);
            }
        }
        None
    }

    /// Path (c): inside-the-book search snippets.
    async fn inside_snippets(&self, doc: &ArchiveDoc, metadata: Option<&ItemMetadata>, book: &BookDescriptor) -> Option<ContentRecord> {
        let base = match (&self.config.endpoints.archive_inside_base, metadata.and_then(|m| m.server.as_deref())) {
            (Some(base), _) => base.clone(),
            (None, Some(server)) => format!("https://{server}"),
            (None, None) => return None,
        };
        let dir = metadata.and_then(|m| m.dir.clone()).unwrap_or_default();
        let query = [
            ("item_id", doc.identifier.clone()),
            ("doc", doc.identifier.clone()),
            ("path", dir),
            ("q", book.title.clone()),
        ];

        let response = self
            .fetcher
            .fetch(&join_url(&base, "/fulltext/inside.php"), &query, self.config.search_timeout())
            .await
            .map_err(|e| debug!(id = %doc.identifier, error = %e, "Inside search failed"))
            .ok()?;
        let parsed: InsideResponse = response.json().ok()?;

        let text = parsed
            .matches
            .iter()
            .map(|m| m.text.replace("{{{", "").replace("}}}", "").trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        if text.chars().count() < MIN_PATH_CHARS {
            return None;
        }
        let page_type = detect_page_type(&text);
        Some(ContentRecord::content(text, ContentSource::ArchiveFulltext, SNIPPET_CONFIDENCE, page_type))
    }

    /// Path (d): OCR of page images, probing each candidate page first.
    async fn page_ocr(&self, doc: &ArchiveDoc) -> Option<ContentRecord> {
        let id = doc.identifier.as_str();
        let settings = &self.config.ocr;
        let mut pages = OcrPages::new(settings);
        let mut available = 0;

        for n in &settings.candidate_pages {
            if available >= settings.max_available_pages {
                break;
            }
            let url = self.url(&format!("/download/{id}/page/n{n}.jpg"));
            if !matches!(self.fetcher.probe(&url, self.config.probe_timeout()).await, Ok(true)) {
                continue;
            }
            available += 1;

            let image = match self.fetcher.fetch(&url, &[], self.config.download_timeout()).await {
                Ok(response) => response.body,
                Err(e) => {
                    debug!(id, page = n, error = %e, "Page image download failed");
                    continue;
                }
            };
            if pages.offer(self.ocr.ocr(&image).await) {
                break;
            }
        }

        info!(id, available, good = pages.len(), "Archive page OCR finished");
        let text = pages.into_text();
        (text.chars().count() >= MIN_PATH_CHARS)
            .then(|| ContentRecord::content(text, ContentSource::ArchiveFulltext, OCR_CONFIDENCE, PageType::Content))
    }

    async fn try_candidate(&self, doc: &ArchiveDoc, book: &BookDescriptor, page_class: PageClass) -> Option<ContentRecord> {
        let metadata = self.metadata(&doc.identifier).await;

        if let Some(record) = self.declared_text(doc, metadata.as_ref(), book, page_class).await {
            debug!(id = %doc.identifier, "Using declared text file");
            return Some(record);
        }
        if let Some(record) = self.conventional_text(doc, book, page_class).await {
            debug!(id = %doc.identifier, "Using conventional text file");
            return Some(record);
        }
        if let Some(record) = self.inside_snippets(doc, metadata.as_ref(), book).await {
            debug!(id = %doc.identifier, "Using inside-the-book snippets");
            return Some(record);
        }
        self.page_ocr(doc).await
    }

    fn access_message(&self, doc: &ArchiveDoc, book: &BookDescriptor) -> String {
        let title = doc.title.as_deref().unwrap_or(&book.title);
        let creator = doc.creator.as_deref().unwrap_or(&book.author);
        let mut text = format!("[Access information] The Internet Archive holds \"{title}\" by {creator}");
        if let Some(year) = &doc.year {
            text.push_str(&format!(" ({year})"));
        }
        text.push_str(". No readable text layer could be retrieved; the scan may be lending-only.");
        if let Some(description) = doc.description.as_deref().filter(|d| !d.trim().is_empty()) {
            text.push_str(&format!("\n\nDescription: {}", description.trim()));
        }
        text.push_str(&format!("\n\nDetails: {}", self.url(&format!("/details/{}", doc.identifier))));
        text
    }
}

#[async_trait]
impl SourceAdapter for ArchiveFullTextAdapter {
    fn name(&self) -> &str {
        "archive-fulltext"
    }

    fn source(&self) -> ContentSource {
        ContentSource::ArchiveFulltext
    }

    async fn attempt(
        &self,
        book: &BookDescriptor,
        page_class: PageClass,
    ) -> Result<ContentRecord, SourceFailure> {
        let docs = self.search(book).await?;
        let Some(first) = docs.first() else {
            return Err(SourceFailure::no_match(ContentSource::ArchiveFulltext, "no matching texts"));
        };

        for doc in &docs {
            if let Some(record) = self.try_candidate(doc, book, page_class).await {
                return Ok(record);
            }
        }

        Ok(ContentRecord::access_info(
            self.access_message(first, book),
            ContentSource::ArchiveFulltext,
            METADATA_CONFIDENCE,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureKind;
    use crate::sources::ocr::{MockOcrService, NoOcr};
    use crate::sources::test_support::{chaptered_text, mock_config, mock_fetcher};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer, ocr: Arc<dyn OcrService>) -> ArchiveFullTextAdapter {
        let config = mock_config(&server.uri());
        ArchiveFullTextAdapter::new(mock_fetcher(&config), config, ocr)
    }

    async fn mount_search(server: &MockServer, docs: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/advancedsearch.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": {"numFound": 1, "docs": docs}})))
            .mount(server)
            .await;
    }

    fn book() -> BookDescriptor {
        BookDescriptor::new("The Lamp", "Ann Writer")
    }

    #[test]
    fn test_doc_parsing_is_lenient() {
        let doc = ArchiveDoc::from_value(&serde_json::json!({
            "identifier": "lamp1",
            "creator": ["Writer, Ann", "Other"],
            "year": 1910
        }))
        .unwrap();
        assert_eq!(doc.creator.as_deref(), Some("Writer, Ann"));
        assert_eq!(doc.year.as_deref(), Some("1910"));
        assert!(ArchiveDoc::from_value(&serde_json::json!({"title": "no id"})).is_none());
    }

    #[test]
    fn test_text_file_prefers_djvu() {
        let metadata = ItemMetadata {
            server: None,
            dir: None,
            files: vec![
                ItemFile { name: "notes.txt".to_string(), format: None },
                ItemFile { name: "lamp1_djvu.txt".to_string(), format: Some("DjVuTXT".to_string()) },
            ],
        };
        assert_eq!(metadata.text_file(), Some("lamp1_djvu.txt"));
    }

    #[tokio::test]
    async fn test_declared_text_file() {
        let server = MockServer::start().await;
        mount_search(&server, serde_json::json!([{"identifier": "lamp1", "title": "The Lamp"}])).await;
        Mock::given(method("GET"))
            .and(path("/metadata/lamp1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "server": "ia800.example.org",
                "dir": "/1/items/lamp1",
                "files": [{"name": "lamp1_djvu.txt", "format": "DjVuTXT"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/download/lamp1/lamp1_djvu.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("\u{c}{}", chaptered_text())))
            .mount(&server)
            .await;

        let record = adapter(&server, Arc::new(NoOcr))
            .attempt(&book(), PageClass::SecondContentPage)
            .await
            .unwrap();
        assert_eq!(record.source, ContentSource::ArchiveFulltext);
        assert_eq!(record.confidence, 90);
        assert!(record.is_content_page);
        assert!(record.text.starts_with("CHAPTER II"));
    }

    #[tokio::test]
    async fn test_conventional_filename_probe() {
        let server = MockServer::start().await;
        mount_search(&server, serde_json::json!([{"identifier": "lamp2"}])).await;
        Mock::given(method("HEAD"))
            .and(path("/download/lamp2/lamp2.txt"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/download/lamp2/lamp2.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(chaptered_text()))
            .mount(&server)
            .await;

        let record = adapter(&server, Arc::new(NoOcr))
            .attempt(&book(), PageClass::FirstContentPage)
            .await
            .unwrap();
        assert_eq!(record.confidence, 90);
        assert!(record.text.starts_with("CHAPTER I\n"));
    }

    #[tokio::test]
    async fn test_inside_snippets() {
        let server = MockServer::start().await;
        mount_search(&server, serde_json::json!([{"identifier": "lamp3"}])).await;
        let snippet = "the {{{lamp}}} burned through the night while the keeper wrote his log by its light";
        Mock::given(method("GET"))
            .and(path("/fulltext/inside.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "matches": [{"text": snippet}, {"text": snippet}, {"text": snippet}]
            })))
            .mount(&server)
            .await;

        let record = adapter(&server, Arc::new(NoOcr))
            .attempt(&book(), PageClass::FirstContentPage)
            .await
            .unwrap();
        assert_eq!(record.confidence, 70);
        assert!(record.text.contains("the lamp burned"));
        assert!(!record.text.contains("{{{"));
    }

    #[tokio::test]
    async fn test_page_ocr_stops_after_three_good_pages() {
        let server = MockServer::start().await;
        mount_search(&server, serde_json::json!([{"identifier": "lamp4"}])).await;
        for n in 1..=5 {
            Mock::given(method("HEAD"))
                .and(path(format!("/download/lamp4/page/n{n}.jpg")))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path(format!("/download/lamp4/page/n{n}.jpg")))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![n as u8; 4]))
                .mount(&server)
                .await;
        }

        let mut ocr = MockOcrService::new();
        ocr.expect_ocr()
            .times(3)
            .returning(|_| Some("The keeper trimmed the wick and watched the grey water roll in under the cliff.".repeat(2)));

        let record = adapter(&server, Arc::new(ocr))
            .attempt(&book(), PageClass::FirstContentPage)
            .await
            .unwrap();
        assert_eq!(record.confidence, 75);
        assert!(record.is_content_page);
        assert_eq!(record.page_type, PageType::Content);
    }

    #[tokio::test]
    async fn test_metadata_message_fallback() {
        let server = MockServer::start().await;
        mount_search(
            &server,
            serde_json::json!([{"identifier": "lamp5", "title": "The Lamp", "creator": "Ann Writer", "year": "1910"}]),
        )
        .await;

        let record = adapter(&server, Arc::new(NoOcr))
            .attempt(&book(), PageClass::FirstContentPage)
            .await
            .unwrap();
        assert_eq!(record.confidence, 55);
        assert!(!record.is_content_page);
        assert!(record.text.contains("(1910)"));
        assert!(record.text.contains("/details/lamp5"));
    }

    #[tokio::test]
    async fn test_no_docs_is_no_match() {
        let server = MockServer::start().await;
        mount_search(&server, serde_json::json!([{"title": "missing identifier"}])).await;
        let failure = adapter(&server, Arc::new(NoOcr))
            .attempt(&book(), PageClass::FirstContentPage)
            .await
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::NoMatch);
    }
}
