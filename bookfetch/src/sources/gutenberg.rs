//! Project Gutenberg through the Gutendex catalogue.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;
use tracing::{debug, warn};

use super::http::{FetchResult, Fetcher};
use super::{join_url, segment_full_text, SourceAdapter};
use crate::config::ExtractionConfig;
use crate::errors::SourceFailure;
use crate::models::{BookDescriptor, ContentRecord, ContentSource, PageClass};
use crate::segmenter::strip_gutenberg_footer;

const CONFIDENCE: u8 = 95;
const MAX_CANDIDATES: usize = 3;

#[derive(Debug, Deserialize)]
struct GutendexPage {
    #[serde(default)]
    results: Vec<GutendexBook>,
}

#[derive(Debug, Deserialize)]
struct GutendexBook {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: Vec<GutendexPerson>,
    #[serde(default)]
    formats: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct GutendexPerson {
    name: String,
}

impl GutendexBook {
    fn has_author(&self, surname: &str) -> bool {
        surname.is_empty()
            || self
                .authors
                .iter()
                .any(|a| a.name.to_lowercase().contains(surname))
    }

    fn first_format(&self, pred: impl Fn(&str, &str) -> bool) -> Option<&str> {
        let mut hits: Vec<(&String, &String)> = self
            .formats
            .iter()
            .filter(|(k, v)| pred(k.as_str(), v.as_str()))
            .collect();
        hits.sort();
        hits.first().map(|&(_, v)| v.as_str())
    }

    /// Picks the best plain-text download: UTF-8, then ASCII, then any
    /// plain text, then a zipped text.
    fn text_url(&self) -> Option<&str> {
        let plain = |k: &str, v: &str| k.starts_with("text/plain") && !v.ends_with(".zip");
        self.first_format(|k, v| plain(k, v) && k.contains("utf-8"))
            .or_else(|| self.first_format(|k, v| plain(k, v) && k.contains("ascii")))
            .or_else(|| self.first_format(plain))
            .or_else(|| {
                self.first_format(|k, v| {
                    k.starts_with("text/plain") || (k == "application/zip" && v.contains(".txt"))
                })
            })
    }
}

/// Adapter for public-domain texts on Project Gutenberg.
pub struct GutenbergAdapter {
    fetcher: Arc<dyn Fetcher>,
    config: Arc<ExtractionConfig>,
}

impl GutenbergAdapter {
    /// Creates a new Gutenberg adapter.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, config: Arc<ExtractionConfig>) -> Self {
        Self { fetcher, config }
    }

    async fn search(&self, book: &BookDescriptor) -> Result<Vec<GutendexBook>, SourceFailure> {
        let url = join_url(&self.config.endpoints.gutendex_base, "/books");
        let query = [("search", format!("{} {}", book.title, book.author))];
        let response = self
            .fetcher
            .fetch(&url, &query, self.config.search_timeout())
            .await
            .map_err(|e| SourceFailure::from_fetch(ContentSource::Gutenberg, &e))?;
        let page: GutendexPage = response
            .json()
            .map_err(|e| SourceFailure::malformed(ContentSource::Gutenberg, e.to_string()))?;
        Ok(page.results)
    }

    async fn download(&self, url: &str) -> Result<String, SourceFailure> {
        let response = self
            .fetcher
            .fetch(url, &[], self.config.download_timeout())
            .await
            .map_err(|e| SourceFailure::from_fetch(ContentSource::Gutenberg, &e))?;
        if response.is_zip() {
            unzip_text(&response)
        } else {
            Ok(response.text())
        }
    }
}

fn unzip_text(response: &FetchResult) -> Result<String, SourceFailure> {
    let malformed = |e: &dyn std::fmt::Display| {
        SourceFailure::malformed(ContentSource::Gutenberg, format!("bad zip from {}: {e}", response.final_url))
    };

    let mut archive = zip::ZipArchive::new(Cursor::new(response.body.as_slice())).map_err(|e| malformed(&e))?;
    let index = (0..archive.len())
        .find(|&i| {
            archive
                .by_index(i)
                .is_ok_and(|f| f.name().to_lowercase().ends_with(".txt"))
        })
        .ok_or_else(|| malformed(&"no .txt entry"))?;

    let mut file = archive.by_index(index).map_err(|e| malformed(&e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| malformed(&e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[async_trait]
impl SourceAdapter for GutenbergAdapter {
    fn name(&self) -> &str {
        "gutenberg"
    }

    fn source(&self) -> ContentSource {
        ContentSource::Gutenberg
    }

    async fn attempt(
        &self,
        book: &BookDescriptor,
        page_class: PageClass,
    ) -> Result<ContentRecord, SourceFailure> {
        let hits = self.search(book).await?;
        if hits.is_empty() {
            return Err(SourceFailure::no_match(ContentSource::Gutenberg, "no catalogue results"));
        }

        let surname = book.author_surname();
        let matching: Vec<&GutendexBook> = hits.iter().filter(|b| b.has_author(&surname)).collect();
        if matching.is_empty() {
            return Err(SourceFailure::no_match(
                ContentSource::Gutenberg,
                format!("no results by author '{}'", book.author),
            ));
        }

        let mut last_failure = None;
        for hit in matching.into_iter().take(MAX_CANDIDATES) {
            let Some(url) = hit.text_url() else {
                debug!(id = hit.id, title = %hit.title, "No plain-text format");
                continue;
            };

            let raw = match self.download(url).await {
                Ok(raw) => raw,
                Err(failure) => {
                    warn!(id = hit.id, error = %failure, "Gutenberg download failed");
                    last_failure = Some(failure);
                    continue;
                }
            };

            let body = strip_gutenberg_footer(&raw);
            if let Some(record) = segment_full_text(body, ContentSource::Gutenberg, CONFIDENCE, book, page_class) {
                debug!(id = hit.id, chars = record.char_len(), "Gutenberg text segmented");
                return Ok(record);
            }
        }

        Err(last_failure.unwrap_or_else(|| {
            SourceFailure::no_match(ContentSource::Gutenberg, "no readable plain-text edition")
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureKind;
    use crate::models::Genre;
    use crate::sources::test_support::{chaptered_text, mock_config, mock_fetcher};
    use std::io::Write;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalogue(uri: &str, author: &str, key: &str, file: &str) -> serde_json::Value {
        serde_json::json!({
            "count": 1,
            "results": [{
                "id": 1342,
                "title": "Pride and Prejudice",
                "authors": [{"name": author}],
                "formats": {
                    "text/html": format!("{uri}/files/1342.html"),
                    key: format!("{uri}/files/{file}"),
                }
            }]
        })
    }

    async fn adapter(server: &MockServer) -> GutenbergAdapter {
        let config = mock_config(&server.uri());
        GutenbergAdapter::new(mock_fetcher(&config), config)
    }

    #[test]
    fn test_text_url_priority() {
        let book = GutendexBook {
            id: 1,
            title: "x".to_string(),
            authors: vec![],
            formats: HashMap::from([
                ("application/zip".to_string(), "https://g/1.txt.zip".to_string()),
                ("text/plain".to_string(), "https://g/1.txt".to_string()),
                ("text/plain; charset=us-ascii".to_string(), "https://g/1-0.txt".to_string()),
                ("text/plain; charset=utf-8".to_string(), "https://g/1-8.txt".to_string()),
            ]),
        };
        assert_eq!(book.text_url(), Some("https://g/1-8.txt"));

        let zipped = GutendexBook {
            formats: HashMap::from([("application/zip".to_string(), "https://g/1.txt.zip".to_string())]),
            ..book
        };
        assert_eq!(zipped.text_url(), Some("https://g/1.txt.zip"));
    }

    #[tokio::test]
    async fn test_downloads_and_segments_text() {
        let server = MockServer::start().await;
        let body = format!(
            "{}\n*** END OF THE PROJECT GUTENBERG EBOOK PRIDE ***\nLicence text",
            chaptered_text()
        );
        Mock::given(method("GET"))
            .and(path("/books"))
            .and(query_param("search", "Pride and Prejudice Jane Austen"))
            .respond_with(ResponseTemplate::new(200).set_body_json(catalogue(
                &server.uri(),
                "Austen, Jane",
                "text/plain; charset=utf-8",
                "1342-0.txt",
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/1342-0.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let book = BookDescriptor::new("Pride and Prejudice", "Jane Austen").with_genre(Genre::Fiction);
        let record = adapter(&server)
            .await
            .attempt(&book, PageClass::FirstContentPage)
            .await
            .unwrap();

        assert_eq!(record.source, ContentSource::Gutenberg);
        assert_eq!(record.confidence, 95);
        assert!(record.is_content_page);
        assert!(record.text.starts_with("CHAPTER II"));
        assert!(!record.text.contains("Licence"));
    }

    #[tokio::test]
    async fn test_unzips_zipped_text() {
        let server = MockServer::start().await;
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
            writer
                .start_file("1342.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(chaptered_text().as_bytes()).unwrap();
            writer.finish().unwrap();
        }

        Mock::given(method("GET"))
            .and(path("/books"))
            .respond_with(ResponseTemplate::new(200).set_body_json(catalogue(
                &server.uri(),
                "Austen, Jane",
                "application/zip",
                "1342.txt.zip",
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/1342.txt.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(buf))
            .mount(&server)
            .await;

        let book = BookDescriptor::new("Pride and Prejudice", "Jane Austen");
        let record = adapter(&server)
            .await
            .attempt(&book, PageClass::FirstContentPage)
            .await
            .unwrap();
        assert!(record.text.starts_with("CHAPTER I\nOpening paragraph 0"));
    }

    #[tokio::test]
    async fn test_wrong_author_is_no_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/books"))
            .respond_with(ResponseTemplate::new(200).set_body_json(catalogue(
                &server.uri(),
                "Smith, John",
                "text/plain; charset=utf-8",
                "1.txt",
            )))
            .mount(&server)
            .await;

        let book = BookDescriptor::new("Pride and Prejudice", "Jane Austen");
        let failure = adapter(&server)
            .await
            .attempt(&book, PageClass::FirstContentPage)
            .await
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::NoMatch);
    }

    #[tokio::test]
    async fn test_empty_results_and_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/books"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"count": 0, "results": []})))
            .mount(&server)
            .await;
        let book = BookDescriptor::new("Nothing", "Nobody");
        let failure = adapter(&server).await.attempt(&book, PageClass::FirstContentPage).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::NoMatch);

        let down = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&down)
            .await;
        let failure = adapter(&down).await.attempt(&book, PageClass::FirstContentPage).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::SourceUnavailable);
    }

    #[tokio::test]
    async fn test_malformed_catalogue() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/books"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;
        let book = BookDescriptor::new("Emma", "Jane Austen");
        let failure = adapter(&server).await.attempt(&book, PageClass::FirstContentPage).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::MalformedPayload);
    }
}
