//! Book metadata produced by the identification collaborator.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Coarse genre tag used to steer page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    /// Novels, short stories and other narrative works.
    Fiction,
    /// Everything factual: history, science, self-help, reference.
    NonFiction,
    /// Not yet classified, or the classifier could not decide.
    #[default]
    Unknown,
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fiction => "fiction",
            Self::NonFiction => "non-fiction",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// The editorial position the caller wants an excerpt from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageClass {
    /// The first substantive page after front matter.
    #[default]
    FirstContentPage,
    /// The page that follows the first substantive page.
    SecondContentPage,
}

impl fmt::Display for PageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstContentPage => write!(f, "first-content-page"),
            Self::SecondContentPage => write!(f, "second-content-page"),
        }
    }
}

/// An identified book.
///
/// Title and author are required; everything else is best-effort metadata
/// that individual sources may use to sharpen their queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDescriptor {
    /// Book title as printed on the cover.
    pub title: String,
    /// Primary author.
    pub author: String,
    /// ISBN-10 or ISBN-13, digits only or hyphenated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    /// Publication date in whatever precision the identifier produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    /// Publisher name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    /// Free-text description or blurb.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared page count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    /// Opaque URL into a source's own preview viewer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_link: Option<String>,
    /// Genre tag.
    #[serde(default)]
    pub genre: Genre,
}

impl BookDescriptor {
    /// Creates a descriptor with just the required fields.
    #[must_use]
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            ..Default::default()
        }
    }

    /// Sets the ISBN.
    #[must_use]
    pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the preview link.
    #[must_use]
    pub fn with_preview_link(mut self, link: impl Into<String>) -> Self {
        self.preview_link = Some(link.into());
        self
    }

    /// Sets the publisher.
    #[must_use]
    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    /// Applies the genre classification.
    #[must_use]
    pub fn with_genre(mut self, genre: Genre) -> Self {
        self.genre = genre;
        self
    }

    /// Checks the required fields, returning a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("book title must not be empty".to_string());
        }
        if self.author.trim().is_empty() {
            return Err("book author must not be empty".to_string());
        }
        Ok(())
    }

    /// Returns the ISBN with separators removed, if it looks usable.
    #[must_use]
    pub fn normalized_isbn(&self) -> Option<String> {
        let digits: String = self
            .isbn
            .as_deref()?
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        matches!(digits.len(), 10 | 13).then_some(digits)
    }

    /// Returns the author's surname, used to sanity-check search hits.
    #[must_use]
    pub fn author_surname(&self) -> String {
        let author = self.author.trim();
        // "Austen, Jane" keeps the part before the comma
        if let Some((last, _)) = author.split_once(',') {
            return last.trim().to_lowercase();
        }
        author
            .split_whitespace()
            .last()
            .unwrap_or(author)
            .to_lowercase()
    }

    /// Converts to dictionary.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut dict = HashMap::new();
        dict.insert("title".to_string(), serde_json::json!(self.title));
        dict.insert("author".to_string(), serde_json::json!(self.author));
        if let Some(ref v) = self.isbn {
            dict.insert("isbn".to_string(), serde_json::json!(v));
        }
        if let Some(ref v) = self.publisher {
            dict.insert("publisher".to_string(), serde_json::json!(v));
        }
        if let Some(v) = self.page_count {
            dict.insert("page_count".to_string(), serde_json::json!(v));
        }
        dict.insert("genre".to_string(), serde_json::json!(self.genre.to_string()));
        dict
    }
}
