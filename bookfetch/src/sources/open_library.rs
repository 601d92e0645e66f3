//! Open Library catalogue records.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::http::Fetcher;
use super::{join_url, SourceAdapter};
use crate::config::ExtractionConfig;
use crate::errors::SourceFailure;
use crate::models::{BookDescriptor, ContentRecord, ContentSource, PageClass};

const CONFIDENCE: u8 = 50;
const SEARCH_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkDoc {
    key: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author_name: Vec<String>,
    #[serde(default)]
    first_publish_year: Option<i32>,
    #[serde(default)]
    first_sentence: Vec<String>,
    #[serde(default)]
    ebook_access: Option<String>,
    #[serde(default)]
    ia: Vec<String>,
}

/// Adapter for Open Library. Only ever produces access information.
pub struct OpenLibraryAdapter {
    fetcher: Arc<dyn Fetcher>,
    config: Arc<ExtractionConfig>,
}

impl OpenLibraryAdapter {
    /// Creates a new Open Library adapter.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, config: Arc<ExtractionConfig>) -> Self {
        Self { fetcher, config }
    }

    async fn search(&self, book: &BookDescriptor) -> Result<Vec<WorkDoc>, SourceFailure> {
        let url = join_url(&self.config.endpoints.open_library_base, "/search.json");
        let query = [
            ("title", book.title.clone()),
            ("author", book.author.clone()),
            ("limit", SEARCH_LIMIT.to_string()),
        ];
        let response = self
            .fetcher
            .fetch(&url, &query, self.config.search_timeout())
            .await
            .map_err(|e| SourceFailure::from_fetch(ContentSource::OpenLibrary, &e))?;
        let page: SearchResponse = response
            .json()
            .map_err(|e| SourceFailure::malformed(ContentSource::OpenLibrary, e.to_string()))?;

        Ok(page
            .docs
            .into_iter()
            .filter_map(|d| serde_json::from_value::<WorkDoc>(d).ok())
            .collect())
    }

    /// Fetches the work description, which is either a string or a typed text value.
    async fn description(&self, key: &str) -> Option<String> {
        let url = join_url(&self.config.endpoints.open_library_base, &format!("{key}.json"));
        let response = match self.fetcher.fetch(&url, &[], self.config.search_timeout()).await {
            Ok(r) => r,
            Err(e) => {
                debug!(key, error = %e, "Work lookup failed");
                return None;
            }
        };
        let work: Value = response.json().ok()?;
        match work.get("description")? {
            Value::String(s) => Some(s.clone()),
            Value::Object(o) => o.get("value").and_then(Value::as_str).map(String::from),
            _ => None,
        }
        .filter(|d| !d.trim().is_empty())
    }
}

fn access_message(book: &BookDescriptor, doc: &WorkDoc, description: Option<&str>) -> String {
    let title = if doc.title.is_empty() { &book.title } else { &doc.title };
    let authors = if doc.author_name.is_empty() {
        book.author.clone()
    } else {
        doc.author_name.join(", ")
    };

    let mut text = format!("[Access information] Open Library lists \"{title}\" by {authors}");
    if let Some(year) = doc.first_publish_year {
        text.push_str(&format!(", first published {year}"));
    }
    text.push('.');

    let access = match doc.ebook_access.as_deref() {
        Some("public") => "A public-domain ebook is available to read.",
        Some("borrowable") => "A scanned copy can be borrowed.",
        Some("printdisabled") => "A scanned copy is available to print-disabled readers.",
        _ => "No ebook is available.",
    };
    text.push(' ');
    text.push_str(access);

    if let Some(sentence) = doc.first_sentence.first() {
        text.push_str(&format!("\n\nFirst sentence: {sentence}"));
    }
    if let Some(description) = description {
        text.push_str(&format!("\n\nDescription: {}", description.trim()));
    }
    if !doc.ia.is_empty() {
        let ids: Vec<&str> = doc.ia.iter().take(3).map(String::as_str).collect();
        text.push_str(&format!("\n\nScanned copies: {}", ids.join(", ")));
    }
    text
}

#[async_trait]
impl SourceAdapter for OpenLibraryAdapter {
    fn name(&self) -> &str {
        "open-library"
    }

    fn source(&self) -> ContentSource {
        ContentSource::OpenLibrary
    }

    async fn attempt(
        &self,
        book: &BookDescriptor,
        _page_class: PageClass,
    ) -> Result<ContentRecord, SourceFailure> {
        let docs = self.search(book).await?;
        let Some(doc) = docs.first() else {
            return Err(SourceFailure::no_match(ContentSource::OpenLibrary, "no matching works"));
        };

        let description = self.description(&doc.key).await;
        Ok(ContentRecord::access_info(
            access_message(book, doc, description.as_deref()),
            ContentSource::OpenLibrary,
            CONFIDENCE,
        ))
    }
}
