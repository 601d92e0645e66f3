//! Cleanup of digitized and OCR'd text before segmentation.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Running headers must repeat at least this often to be dropped.
const RUNNING_HEADER_MIN_REPEATS: usize = 5;
/// Longer lines are never treated as running headers.
const RUNNING_HEADER_MAX_CHARS: usize = 60;

#[allow(clippy::expect_used)]
static PAGE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\[?\s*(page|p\.)?\s*\d{1,4}\s*\]?|[-–—]\s*\d{1,4}\s*[-–—])$").expect("valid regex")
});

#[allow(clippy::expect_used)]
static DIGITIZATION_BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(digitized by\b|generated (on|for)\b|public domain, google-digitized|google-digitized|original from\b|https?://(www\.)?hathitrust\.org|https?://hdl\.handle\.net|scanned by\b|this book was digitized|the internet archive$|archive\.org$)",
    )
    .expect("valid regex")
});

#[allow(clippy::expect_used)]
static GUTENBERG_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*(\*{3}\s*end of (the |this )?project gutenberg|end of (the )?project gutenberg)")
        .expect("valid regex")
});

#[allow(clippy::expect_used)]
static BASE64_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+/=]{20,}$").expect("valid regex"));

#[allow(clippy::expect_used)]
static DIGIT_SYMBOL_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9\s\-_+=.,;:!@#$%^&*()]{5,}$").expect("valid regex")
});

/// Watermarks that preview viewers burn into page images.
const VIEWER_ARTIFACTS: &[&str] = &[
    "ogle Books",
    "Powered by Google Books",
    "Copyrighted material",
    "Restricted Page",
    "You have reached your viewing limit",
    "This page is not shown in this preview",
];

/// Removes layout artifacts from a digitized full text.
///
/// Form feeds become paragraph breaks; bare page numbers, digitization
/// notices and repeated running headers are dropped. Blank-line runs are
/// collapsed to one.
#[must_use]
pub fn clean_layout_artifacts(raw: &str) -> String {
    let normalized = raw
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{c}', "\n\n");

    let mut header_counts: HashMap<String, usize> = HashMap::new();
    for line in normalized.lines() {
        if let Some(key) = running_header_key(line.trim()) {
            *header_counts.entry(key).or_default() += 1;
        }
    }

    let mut out: Vec<&str> = Vec::new();
    let mut last_blank = true;
    for line in normalized.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !last_blank {
                out.push("");
                last_blank = true;
            }
            continue;
        }
        if PAGE_NUMBER.is_match(trimmed) || DIGITIZATION_BOILERPLATE.is_match(trimmed) {
            continue;
        }
        let repeated = running_header_key(trimmed)
            .and_then(|key| header_counts.get(&key))
            .is_some_and(|&n| n >= RUNNING_HEADER_MIN_REPEATS);
        if repeated {
            continue;
        }
        out.push(line.trim_end());
        last_blank = false;
    }

    out.join("\n").trim().to_string()
}

/// Normalizes a candidate running header by dropping page numbers.
///
/// Only lines without lowercase letters qualify, so repeated dialogue such
/// as "Yes." is never mistaken for a header. Chapter and part headings are
/// never headers even when numbered ones repeat.
fn running_header_key(line: &str) -> Option<String> {
    if line.is_empty() || line.chars().count() > RUNNING_HEADER_MAX_CHARS {
        return None;
    }
    if super::is_structural_line(line) {
        return None;
    }
    if line.chars().any(char::is_lowercase) || !line.chars().any(char::is_alphabetic) {
        return None;
    }
    let key: String = line.chars().filter(|c| !c.is_ascii_digit()).collect();
    let key = key.trim().to_string();
    (!key.is_empty()).then_some(key)
}

/// Cuts a Project Gutenberg text at its licence footer.
#[must_use]
pub fn strip_gutenberg_footer(text: &str) -> &str {
    GUTENBERG_END
        .find(text)
        .map_or(text, |m| &text[..m.start()])
}

/// Removes OCR noise from recognised page text.
///
/// Drops encoding debris, lines that are mostly non-readable characters,
/// fragments under three characters, digit/symbol runs and viewer
/// watermarks.
#[must_use]
pub fn clean_ocr_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| {
            if line.is_empty() || line.chars().count() < 3 {
                return false;
            }
            if BASE64_LIKE.is_match(line) || DIGIT_SYMBOL_RUN.is_match(line) {
                return false;
            }
            let total = line.chars().count();
            if total > 10 {
                let readable = line
                    .chars()
                    .filter(|c| c.is_alphanumeric() || c.is_whitespace())
                    .count();
                if (readable as f64) / (total as f64) < 0.7 {
                    return false;
                }
            }
            !VIEWER_ARTIFACTS.iter().any(|a| line.contains(a))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
