//! Normalized content records produced by source adapters.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifies which external system produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentSource {
    /// Internet Archive digitized full text.
    ArchiveFulltext,
    /// Project Gutenberg public-domain catalogue.
    Gutenberg,
    /// HathiTrust institutional preview.
    Hathitrust,
    /// Google Books preview pages.
    GooglePreview,
    /// Google Books descriptive metadata only.
    GoogleMetadata,
    /// Open Library catalogue.
    OpenLibrary,
    /// Generic web search result.
    WebSearch,
}

impl ContentSource {
    /// All sources, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::ArchiveFulltext,
        Self::Gutenberg,
        Self::Hathitrust,
        Self::GooglePreview,
        Self::GoogleMetadata,
        Self::OpenLibrary,
        Self::WebSearch,
    ];

    /// Wire identifier for the source.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ArchiveFulltext => "archive-fulltext",
            Self::Gutenberg => "gutenberg",
            Self::Hathitrust => "hathitrust",
            Self::GooglePreview => "google-preview",
            Self::GoogleMetadata => "google-metadata",
            Self::OpenLibrary => "open-library",
            Self::WebSearch => "web-search",
        }
    }

    /// Human readable name used in failure reports.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::ArchiveFulltext => "Internet Archive",
            Self::Gutenberg => "Project Gutenberg",
            Self::Hathitrust => "HathiTrust",
            Self::GooglePreview => "Google Books preview",
            Self::GoogleMetadata => "Google Books",
            Self::OpenLibrary => "Open Library",
            Self::WebSearch => "Web search",
        }
    }
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What kind of page an excerpt appears to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    /// Title or copyright page.
    Title,
    /// Table of contents.
    Toc,
    /// Body prose.
    Content,
    /// Acknowledgments or dedication.
    Acknowledgments,
    /// Could not be determined, or not a page at all.
    #[default]
    Unknown,
}

/// The normalized output of one source adapter attempt.
///
/// Records are value objects: adapters build them once through
/// [`ContentRecord::content`] or [`ContentRecord::access_info`] and nothing
/// downstream mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    /// Extracted text.
    pub text: String,
    /// Producing source.
    pub source: ContentSource,
    /// Source- and path-specific confidence, 0 to 100.
    pub confidence: u8,
    /// True only when `text` is real book prose.
    pub is_content_page: bool,
    /// Detected page type.
    pub page_type: PageType,
}

impl ContentRecord {
    /// Creates a record holding extracted book text.
    ///
    /// `is_content_page` follows from the page type: only `Content` pages
    /// count as prose.
    #[must_use]
    pub fn content(
        text: impl Into<String>,
        source: ContentSource,
        confidence: u8,
        page_type: PageType,
    ) -> Self {
        Self {
            text: text.into(),
            source,
            confidence: confidence.min(100),
            is_content_page: page_type == PageType::Content,
            page_type,
        }
    }

    /// Creates a clearly labelled access-information record.
    #[must_use]
    pub fn access_info(text: impl Into<String>, source: ContentSource, confidence: u8) -> Self {
        Self {
            text: text.into(),
            source,
            confidence: confidence.min(100),
            is_content_page: false,
            page_type: PageType::Unknown,
        }
    }

    /// Length of the text in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Converts to dictionary.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut dict = HashMap::new();
        dict.insert("text".to_string(), serde_json::json!(self.text));
        dict.insert("source".to_string(), serde_json::json!(self.source.as_str()));
        dict.insert("confidence".to_string(), serde_json::json!(self.confidence));
        dict.insert("isContentPage".to_string(), serde_json::json!(self.is_content_page));
        dict.insert("pageType".to_string(), serde_json::json!(self.page_type));
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_constructor_derives_flag_from_page_type() {
        let prose = ContentRecord::content("It was a dark night.", ContentSource::Gutenberg, 95, PageType::Content);
        assert!(prose.is_content_page);

        let toc = ContentRecord::content("Contents", ContentSource::Gutenberg, 95, PageType::Toc);
        assert!(!toc.is_content_page);
    }

    #[test]
    fn test_access_info_is_never_content() {
        let rec = ContentRecord::access_info("Access information: none", ContentSource::OpenLibrary, 50);
        assert!(!rec.is_content_page);
        assert_eq!(rec.page_type, PageType::Unknown);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let rec = ContentRecord::access_info("x", ContentSource::WebSearch, 250);
        assert_eq!(rec.confidence, 100);
    }

    #[test]
    fn test_char_len_counts_characters() {
        let rec = ContentRecord::access_info("café", ContentSource::WebSearch, 10);
        assert_eq!(rec.char_len(), 4);
    }

    #[test]
    fn test_wire_format() {
        let rec = ContentRecord::content("text", ContentSource::ArchiveFulltext, 90, PageType::Content);
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["source"], "archive-fulltext");
        assert_eq!(json["isContentPage"], true);
        assert_eq!(json["pageType"], "content");

        let back: ContentRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn test_source_identifiers_match_serde() {
        for source in ContentSource::ALL {
            let json = serde_json::to_value(source).unwrap();
            assert_eq!(json, serde_json::json!(source.as_str()));
        }
    }
}
