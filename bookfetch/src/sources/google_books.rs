//! Google Books volumes search, with optional preview OCR.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::http::Fetcher;
use super::ocr::{ocr_images, OcrService, PageImageSource};
use super::{join_url, phrase, SourceAdapter};
use crate::config::ExtractionConfig;
use crate::errors::SourceFailure;
use crate::models::{BookDescriptor, ContentRecord, ContentSource, PageClass, PageType};

const PREVIEW_CONFIDENCE: u8 = 75;
const METADATA_CONFIDENCE: u8 = 60;
const MAX_RESULTS: u32 = 10;

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    #[serde(default)]
    volume_info: VolumeInfo,
    #[serde(default)]
    access_info: AccessInfo,
    #[serde(default)]
    search_info: Option<SearchInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    preview_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessInfo {
    #[serde(default = "no_pages")]
    viewability: String,
    #[serde(default)]
    embeddable: bool,
    #[serde(default)]
    public_domain: bool,
}

impl Default for AccessInfo {
    fn default() -> Self {
        Self {
            viewability: no_pages(),
            embeddable: false,
            public_domain: false,
        }
    }
}

fn no_pages() -> String {
    "NO_PAGES".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchInfo {
    #[serde(default)]
    text_snippet: String,
}

impl Volume {
    fn has_preview(&self) -> bool {
        self.access_info.viewability != "NO_PAGES"
    }

    /// Embeddable or fully viewable volumes first, then partial previews.
    fn access_rank(&self) -> u8 {
        match self.access_info.viewability.as_str() {
            "ALL_PAGES" => 2,
            "NO_PAGES" => 0,
            _ if self.access_info.embeddable => 2,
            "PARTIAL" => 1,
            _ => 0,
        }
    }
}

/// Adapter for Google Books.
///
/// Produces `google-preview` records when preview pages can be rendered
/// and read, and `google-metadata` access information otherwise.
pub struct GoogleBooksAdapter {
    fetcher: Arc<dyn Fetcher>,
    config: Arc<ExtractionConfig>,
    ocr: Arc<dyn OcrService>,
    page_images: Arc<dyn PageImageSource>,
}

impl GoogleBooksAdapter {
    /// Creates a new Google Books adapter.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        config: Arc<ExtractionConfig>,
        ocr: Arc<dyn OcrService>,
        page_images: Arc<dyn PageImageSource>,
    ) -> Self {
        Self {
            fetcher,
            config,
            ocr,
            page_images,
        }
    }

    async fn search(&self, book: &BookDescriptor) -> Result<Vec<Volume>, SourceFailure> {
        let url = join_url(&self.config.endpoints.google_books_base, "/books/v1/volumes");
        let query = [
            (
                "q",
                format!("intitle:{} inauthor:{}", phrase(&book.title), phrase(&book.author)),
            ),
            ("maxResults", MAX_RESULTS.to_string()),
            ("printType", "books".to_string()),
        ];
        let response = self
            .fetcher
            .fetch(&url, &query, self.config.search_timeout())
            .await
            .map_err(|e| SourceFailure::from_fetch(ContentSource::GoogleMetadata, &e))?;
        let page: VolumesResponse = response
            .json()
            .map_err(|e| SourceFailure::malformed(ContentSource::GoogleMetadata, e.to_string()))?;

        let volumes: Vec<Volume> = page
            .items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<Volume>(item) {
                Ok(v) => Some(v),
                Err(e) => {
                    debug!(error = %e, "Skipping unparsable volume");
                    None
                }
            })
            .collect();
        Ok(volumes)
    }

    async fn preview_text(&self, link: &str) -> Option<String> {
        let images = self
            .page_images
            .request_page_images(link, self.config.ocr.max_available_pages)
            .await;
        if images.is_empty() {
            return None;
        }
        let pages = ocr_images(self.ocr.as_ref(), &images, &self.config.ocr).await;
        info!(rendered = images.len(), good = pages.len(), "Preview OCR finished");
        (!pages.is_empty()).then(|| pages.into_text())
    }
}

fn access_message(book: &BookDescriptor, volume: &Volume) -> String {
    let info = &volume.volume_info;
    let title = if info.title.is_empty() { &book.title } else { &info.title };
    let authors = if info.authors.is_empty() {
        book.author.clone()
    } else {
        info.authors.join(", ")
    };

    let access = match volume.access_info.viewability.as_str() {
        "ALL_PAGES" => "full view",
        "PARTIAL" => "partial preview",
        _ if volume.access_info.embeddable => "embeddable preview",
        _ => "limited preview",
    };

    let mut text = format!(
        "[Access information] Google Books lists \"{title}\" by {authors} with {access}. \
         Page text could not be retrieved automatically."
    );
    if volume.access_info.public_domain {
        text.push_str(" The volume is in the public domain.");
    }
    if let Some(description) = info.description.as_deref().filter(|d| !d.trim().is_empty()) {
        text.push_str(&format!("\n\nDescription: {}", description.trim()));
    }
    if let Some(snippet) = volume.search_info.as_ref().filter(|s| !s.text_snippet.is_empty()) {
        text.push_str(&format!("\n\nSnippet: {}", snippet.text_snippet));
    }
    if let Some(link) = &info.preview_link {
        text.push_str(&format!("\n\nPreview: {link}"));
    }
    text
}

#[async_trait]
impl SourceAdapter for GoogleBooksAdapter {
    fn name(&self) -> &str {
        "google-books"
    }

    fn source(&self) -> ContentSource {
        ContentSource::GooglePreview
    }

    async fn attempt(
        &self,
        book: &BookDescriptor,
        _page_class: PageClass,
    ) -> Result<ContentRecord, SourceFailure> {
        let mut volumes = self.search(book).await?;
        if volumes.is_empty() {
            return Err(SourceFailure::no_match(ContentSource::GoogleMetadata, "no volumes found"));
        }
        if !volumes.iter().any(Volume::has_preview) {
            return Err(SourceFailure::no_match(
                ContentSource::GoogleMetadata,
                "copyrighted with no preview available",
            ));
        }

        volumes.sort_by_key(|v| std::cmp::Reverse(v.access_rank()));
        let best = &volumes[0];

        let link = best
            .volume_info
            .preview_link
            .as_deref()
            .or(book.preview_link.as_deref());
        if let Some(link) = link {
            if let Some(text) = self.preview_text(link).await {
                return Ok(ContentRecord::content(
                    text,
                    ContentSource::GooglePreview,
                    PREVIEW_CONFIDENCE,
                    PageType::Content,
                ));
            }
        }

        Ok(ContentRecord::access_info(
            access_message(book, best),
            ContentSource::GoogleMetadata,
            METADATA_CONFIDENCE,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureKind;
    use crate::sources::ocr::{MockOcrService, MockPageImageSource, NoOcr, NoPageImages};
    use crate::sources::test_support::{mock_config, mock_fetcher};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn volume(title: &str, viewability: &str, embeddable: bool) -> serde_json::Value {
        serde_json::json!({
            "id": title,
            "volumeInfo": {
                "title": title,
                "authors": ["Ann Writer"],
                "description": "A story about a lighthouse.",
                "previewLink": format!("https://books.google.com/books?id={title}")
            },
            "accessInfo": {"viewability": viewability, "embeddable": embeddable},
            "searchInfo": {"textSnippet": "The lamp was lit at dusk."}
        })
    }

    async fn mount(server: &MockServer, items: Vec<serde_json::Value>) {
        Mock::given(method("GET"))
            .and(path("/books/v1/volumes"))
            .and(query_param("q", "intitle:\"The Lamp\" inauthor:\"Ann Writer\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"totalItems": items.len(), "items": items})))
            .mount(server)
            .await;
    }

    fn adapter(
        server: &MockServer,
        ocr: Arc<dyn OcrService>,
        images: Arc<dyn PageImageSource>,
    ) -> GoogleBooksAdapter {
        let config = mock_config(&server.uri());
        GoogleBooksAdapter::new(mock_fetcher(&config), config, ocr, images)
    }

    fn book() -> BookDescriptor {
        BookDescriptor::new("The Lamp", "Ann Writer")
    }

    #[tokio::test]
    async fn test_all_no_pages_is_no_match() {
        let server = MockServer::start().await;
        mount(&server, vec![volume("a", "NO_PAGES", false), volume("b", "NO_PAGES", false)]).await;

        let failure = adapter(&server, Arc::new(NoOcr), Arc::new(NoPageImages))
            .attempt(&book(), PageClass::FirstContentPage)
            .await
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::NoMatch);
        assert!(failure.reason.contains("no preview"));
    }

    #[tokio::test]
    async fn test_metadata_prefers_embeddable_volume() {
        let server = MockServer::start().await;
        mount(
            &server,
            vec![
                volume("meta-only", "NO_PAGES", false),
                volume("partial", "PARTIAL", false),
                volume("embed", "PARTIAL", true),
            ],
        )
        .await;

        let record = adapter(&server, Arc::new(NoOcr), Arc::new(NoPageImages))
            .attempt(&book(), PageClass::FirstContentPage)
            .await
            .unwrap();
        assert_eq!(record.source, ContentSource::GoogleMetadata);
        assert_eq!(record.confidence, 60);
        assert!(!record.is_content_page);
        assert!(record.text.contains("\"embed\""));
        assert!(record.text.contains("A story about a lighthouse."));
        assert!(record.text.contains("The lamp was lit at dusk."));
    }

    #[tokio::test]
    async fn test_preview_ocr_produces_content() {
        let server = MockServer::start().await;
        mount(&server, vec![volume("full", "ALL_PAGES", true)]).await;

        let mut images = MockPageImageSource::new();
        images
            .expect_request_page_images()
            .times(1)
            .returning(|_, max| vec![vec![7u8]; max]);
        let mut ocr = MockOcrService::new();
        ocr.expect_ocr()
            .times(3)
            .returning(|_| Some("The keeper climbed the stairs each evening to trim the wick and polish the glass.".repeat(2)));

        let record = adapter(&server, Arc::new(ocr), Arc::new(images))
            .attempt(&book(), PageClass::FirstContentPage)
            .await
            .unwrap();
        assert_eq!(record.source, ContentSource::GooglePreview);
        assert_eq!(record.confidence, 75);
        assert!(record.is_content_page);
    }

    #[tokio::test]
    async fn test_unreadable_preview_falls_back_to_metadata() {
        let server = MockServer::start().await;
        mount(&server, vec![volume("full", "ALL_PAGES", true)]).await;

        let mut images = MockPageImageSource::new();
        images
            .expect_request_page_images()
            .returning(|_, _| vec![vec![1u8], vec![2u8]]);
        let mut ocr = MockOcrService::new();
        ocr.expect_ocr().returning(|_| None);

        let record = adapter(&server, Arc::new(ocr), Arc::new(images))
            .attempt(&book(), PageClass::FirstContentPage)
            .await
            .unwrap();
        assert_eq!(record.source, ContentSource::GoogleMetadata);
    }

    #[tokio::test]
    async fn test_malformed_item_is_skipped() {
        let server = MockServer::start().await;
        mount(
            &server,
            vec![serde_json::json!({"volumeInfo": "not an object"}), volume("ok", "PARTIAL", false)],
        )
        .await;

        let record = adapter(&server, Arc::new(NoOcr), Arc::new(NoPageImages))
            .attempt(&book(), PageClass::FirstContentPage)
            .await
            .unwrap();
        assert!(record.text.contains("\"ok\""));
    }
}
