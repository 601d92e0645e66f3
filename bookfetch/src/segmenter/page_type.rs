//! Heuristic page-type detection.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::PageType;

#[allow(clippy::expect_used)]
static FRONT_MATTER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(copyright\s*(©|\(c\)|\d{4})|©\s*\d{4}|all rights reserved|\bisbn\b|library of congress|printed in the united states|first published in)",
    )
    .expect("valid regex")
});

#[allow(clippy::expect_used)]
static TOC_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\s|\.)\d{1,4}$|^(chapter|part)\s+\S+$").expect("valid regex"));

/// Short pages with a single front-matter marker still count as front matter.
const SHORT_FRONT_MATTER_CHARS: usize = 600;

/// Classifies an excerpt as title/copyright, contents, acknowledgments or prose.
#[must_use]
pub fn detect_page_type(text: &str) -> PageType {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.is_empty() {
        return PageType::Unknown;
    }

    let head: Vec<String> = lines.iter().take(3).map(|l| l.to_lowercase()).collect();
    if head
        .iter()
        .any(|l| l.starts_with("acknowledg") || l == "dedication")
    {
        return PageType::Acknowledgments;
    }

    let toc_entries = lines
        .iter()
        .filter(|l| TOC_ENTRY.is_match(&l.to_lowercase()))
        .count();
    let toc_ratio = toc_entries as f64 / lines.len() as f64;
    let names_contents = head.iter().any(|l| l == "contents" || l == "table of contents");
    if (names_contents && toc_ratio >= 0.5) || (lines.len() >= 5 && toc_ratio >= 0.8) {
        return PageType::Toc;
    }

    let markers = FRONT_MATTER_MARKER.find_iter(text).count();
    if markers >= 2 || (markers == 1 && text.chars().count() < SHORT_FRONT_MATTER_CHARS) {
        return PageType::Title;
    }

    PageType::Content
}
