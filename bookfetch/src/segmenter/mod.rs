//! Page segmentation over full book text.
//!
//! This module provides:
//! - `select_page`, which cuts the requested content page out of a full text
//! - Layout and OCR cleanup applied before segmentation
//! - A heuristic page-type detector
//!
//! The selection heuristic is deliberately procedural so that every step can
//! be inspected and tuned on its own.

mod cleaning;
mod page_type;

pub use cleaning::{clean_layout_artifacts, clean_ocr_text, strip_gutenberg_footer};
pub use page_type::detect_page_type;

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{Genre, PageClass};

/// Lines scanned for the end of front matter.
pub const FRONT_MATTER_SCAN_LINES: usize = 50;
/// Window length when no closing break exists.
pub const DEFAULT_WINDOW_LINES: usize = 50;
/// Window length after expanding a too-short excerpt.
pub const EXPANDED_WINDOW_LINES: usize = 75;
/// Excerpts shorter than this are expanded.
pub const MIN_WINDOW_CHARS: usize = 500;
/// Lines shorter than this can be all-caps headings or paragraph leads.
const SHORT_LINE_CHARS: usize = 50;
/// Paragraph boundaries need a following line at least this long.
const LONG_LINE_CHARS: usize = 50;

#[allow(clippy::expect_used)]
static START_OF_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\*{3}\s*start of (the |this )?project gutenberg|\*{0,3}\s*start of (the )?text\b)")
        .expect("valid regex")
});

#[allow(clippy::expect_used)]
static FIRST_CHAPTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^chapter\s+(1|i|one)\b").expect("valid regex"));

#[allow(clippy::expect_used)]
static LEADING_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(1|I)\.(\s|$)").expect("valid regex"));

#[allow(clippy::expect_used)]
static SECTION_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^((?i:(chapter|part|book|section)\s+([0-9]+|[ivxlcdm]+|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)\b)|[0-9]{1,3}\.(\s|$)|[IVXLCDM]{1,7}\.?$)",
    )
    .expect("valid regex")
});

/// Splits text into trimmed, non-empty lines after normalizing line endings.
#[must_use]
pub fn content_lines(text: &str) -> Vec<&str> {
    text.split(['\n', '\r'])
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Finds where front matter ends within the first lines of the text.
///
/// An explicit start-of-text marker starts content on the following line;
/// a first-chapter heading or a leading `1.`/`I.` line starts content on
/// itself. Returns 0 when nothing is found.
#[must_use]
pub fn find_content_start(lines: &[&str]) -> usize {
    for (i, line) in lines.iter().take(FRONT_MATTER_SCAN_LINES).enumerate() {
        if START_OF_TEXT.is_match(line) {
            return i + 1;
        }
        if FIRST_CHAPTER.is_match(line) || LEADING_FIRST.is_match(line) {
            return i;
        }
    }
    0
}

/// Whether a line looks like a chapter, numbered or roman-numeral heading.
#[must_use]
pub fn is_section_heading(line: &str) -> bool {
    SECTION_HEADING.is_match(line)
}

/// Whether a line marks structure the segmenter relies on: a heading, a
/// first-chapter line or a start-of-text marker.
pub(crate) fn is_structural_line(line: &str) -> bool {
    is_section_heading(line) || FIRST_CHAPTER.is_match(line) || START_OF_TEXT.is_match(line)
}

fn is_short_all_caps(line: &str) -> bool {
    if line.chars().count() >= SHORT_LINE_CHARS {
        return false;
    }
    let letters = line.chars().filter(|c| c.is_alphabetic()).count();
    letters >= 2 && !line.chars().any(char::is_lowercase)
}

/// Detects section breaks from `start` onward.
///
/// Headings and short all-caps lines count as breaks. With fewer than two of
/// those, paragraph boundaries (a short line followed by a long one) are used
/// instead.
#[must_use]
pub fn detect_section_breaks(lines: &[&str], start: usize) -> Vec<usize> {
    let headings: Vec<usize> = (start..lines.len())
        .filter(|&i| is_section_heading(lines[i]) || is_short_all_caps(lines[i]))
        .collect();
    if headings.len() >= 2 {
        return headings;
    }

    (start..lines.len().saturating_sub(1))
        .filter(|&i| {
            lines[i].chars().count() < SHORT_LINE_CHARS
                && lines[i + 1].chars().count() >= LONG_LINE_CHARS
        })
        .collect()
}

/// Selects the requested content page from a full book text.
///
/// Fiction and explicit second-page requests take the second detected
/// section; everything else takes the first. The window runs to the next
/// break (or 50 lines when there is none) and grows to 75 lines when the
/// excerpt would be under 500 characters.
#[must_use]
pub fn select_page(full_text: &str, page_class: PageClass, genre: Genre) -> String {
    let lines = content_lines(full_text);
    if lines.is_empty() {
        return String::new();
    }

    let start_index = find_content_start(&lines);
    let breaks = detect_section_breaks(&lines, start_index);

    let target = usize::from(page_class == PageClass::SecondContentPage || genre == Genre::Fiction);

    let (start, end) = match breaks.get(target) {
        Some(&begin) => {
            let end = breaks
                .get(target + 1)
                .copied()
                .unwrap_or(begin + DEFAULT_WINDOW_LINES);
            (begin, end)
        }
        None => (start_index, start_index + DEFAULT_WINDOW_LINES),
    };

    let mut page = join_window(&lines, start, end);
    if page.chars().count() < MIN_WINDOW_CHARS {
        page = join_window(&lines, start, end.max(start + EXPANDED_WINDOW_LINES));
    }
    page
}

fn join_window(lines: &[&str], start: usize, end: usize) -> String {
    let start = start.min(lines.len());
    let end = end.clamp(start, lines.len());
    lines[start..end].join("\n")
}
