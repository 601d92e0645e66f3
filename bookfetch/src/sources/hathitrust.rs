//! HathiTrust Digital Library, keyed by ISBN.

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

use super::http::Fetcher;
use super::{join_url, segment_full_text, SourceAdapter};
use crate::config::ExtractionConfig;
use crate::errors::SourceFailure;
use crate::models::{BookDescriptor, ContentRecord, ContentSource, PageClass};

const FULL_VIEW_CONFIDENCE: u8 = 85;
const LIMITED_CONFIDENCE: u8 = 65;
const MAX_PAGES: u32 = 30;
const PAGE_SEPARATOR: &str = "\u{c}";

#[allow(clippy::expect_used)]
static PAGE_TEXT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#mdpText, .page-text, div.Text, pre").expect("valid selector")
});

#[allow(clippy::expect_used)]
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").expect("valid selector"));

#[derive(Debug, Deserialize)]
struct BriefResponse {
    #[serde(default)]
    items: Vec<BriefItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BriefItem {
    htid: String,
    #[serde(default)]
    us_rights_string: String,
    #[serde(default, rename = "itemURL")]
    item_url: Option<String>,
    #[serde(default)]
    orig: Option<String>,
}

impl BriefItem {
    fn is_full_view(&self) -> bool {
        self.us_rights_string.eq_ignore_ascii_case("full view")
    }
}

/// Pulls the visible page text out of a page-text view.
fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let node = document
        .select(&PAGE_TEXT)
        .next()
        .or_else(|| document.select(&BODY).next());
    node.map(|n| {
        n.text()
            .collect::<String>()
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
    })
    .unwrap_or_default()
    .trim()
    .to_string()
}

/// Adapter for HathiTrust volumes.
pub struct HathiTrustAdapter {
    fetcher: Arc<dyn Fetcher>,
    config: Arc<ExtractionConfig>,
}

impl HathiTrustAdapter {
    /// Creates a new HathiTrust adapter.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, config: Arc<ExtractionConfig>) -> Self {
        Self { fetcher, config }
    }

    async fn lookup(&self, isbn: &str) -> Result<Vec<BriefItem>, SourceFailure> {
        let url = join_url(
            &self.config.endpoints.hathitrust_catalog_base,
            &format!("/api/volumes/brief/isbn/{isbn}.json"),
        );
        let response = self
            .fetcher
            .fetch(&url, &[], self.config.search_timeout())
            .await
            .map_err(|e| SourceFailure::from_fetch(ContentSource::Hathitrust, &e))?;
        let brief: BriefResponse = response
            .json()
            .map_err(|e| SourceFailure::malformed(ContentSource::Hathitrust, e.to_string()))?;
        Ok(brief.items)
    }

    /// Reads page-text views in order until one is missing or empty.
    async fn full_text(&self, htid: &str) -> Result<String, SourceFailure> {
        let url = join_url(&self.config.endpoints.hathitrust_babel_base, "/cgi/ssd");
        let mut pages = Vec::new();

        for seq in 1..=MAX_PAGES {
            let query = [("id", htid.to_string()), ("seq", seq.to_string())];
            match self.fetcher.fetch(&url, &query, self.config.download_timeout()).await {
                Ok(response) => {
                    let text = page_text(&response.text());
                    if text.is_empty() && seq > 1 {
                        break;
                    }
                    pages.push(text);
                }
                Err(e) if pages.is_empty() => {
                    return Err(SourceFailure::from_fetch(ContentSource::Hathitrust, &e));
                }
                Err(e) => {
                    debug!(htid = %htid, seq, error = %e, "Stopping page-text walk");
                    break;
                }
            }
        }

        Ok(pages.join(PAGE_SEPARATOR))
    }
}

fn access_message(book: &BookDescriptor, item: &BriefItem) -> String {
    let mut text = format!(
        "[Access information] HathiTrust holds \"{}\" by {} ({}).",
        book.title,
        book.author,
        if item.us_rights_string.is_empty() {
            "rights unknown"
        } else {
            item.us_rights_string.as_str()
        }
    );
    if let Some(orig) = &item.orig {
        text.push_str(&format!(" Contributed by {orig}."));
    }
    text.push_str(" Full text is not openly viewable; the volume can be searched for words and phrases.");
    if let Some(url) = &item.item_url {
        text.push_str(&format!(" Record: {url}"));
    }
    text
}

#[async_trait]
impl SourceAdapter for HathiTrustAdapter {
    fn name(&self) -> &str {
        "hathitrust"
    }

    fn source(&self) -> ContentSource {
        ContentSource::Hathitrust
    }

    async fn attempt(
        &self,
        book: &BookDescriptor,
        page_class: PageClass,
    ) -> Result<ContentRecord, SourceFailure> {
        let Some(isbn) = book.normalized_isbn() else {
            return Err(SourceFailure::no_match(ContentSource::Hathitrust, "no ISBN to look up"));
        };

        let items = self.lookup(&isbn).await?;
        let Some(first) = items.first() else {
            return Err(SourceFailure::no_match(
                ContentSource::Hathitrust,
                format!("no volumes for ISBN {isbn}"),
            ));
        };

        if let Some(full) = items.iter().find(|i| i.is_full_view()) {
            match self.full_text(&full.htid).await {
                Ok(raw) => {
                    if let Some(record) = segment_full_text(
                        &raw,
                        ContentSource::Hathitrust,
                        FULL_VIEW_CONFIDENCE,
                        book,
                        page_class,
                    ) {
                        return Ok(record);
                    }
                    debug!(htid = %full.htid, "Full-view volume had no readable text");
                }
                Err(failure) => warn!(htid = %full.htid, error = %failure, "Full-view fetch failed"),
            }
        }

        Ok(ContentRecord::access_info(
            access_message(book, first),
            ContentSource::Hathitrust,
            LIMITED_CONFIDENCE,
        ))
    }
}
