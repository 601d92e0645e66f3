//! Deterministic ranking of content records.
//!
//! Records are ordered by three integer rules applied in strict priority:
//! real prose first, then `confidence + reliability_weight(source)`, then
//! text length. Remaining exact ties fall back to source and text so the
//! order is total and independent of input order.

use std::cmp::Ordering;

use crate::models::{ContentRecord, ContentSource};

/// Fixed reliability weight added to a record's confidence.
#[must_use]
pub const fn reliability_weight(source: ContentSource) -> u32 {
    match source {
        ContentSource::ArchiveFulltext => 100,
        ContentSource::Gutenberg => 95,
        ContentSource::Hathitrust => 85,
        ContentSource::GooglePreview => 80,
        ContentSource::GoogleMetadata => 60,
        ContentSource::OpenLibrary => 50,
        ContentSource::WebSearch => 40,
    }
}

/// Combined quality score used by the second ranking rule.
#[must_use]
pub fn quality_score(record: &ContentRecord) -> u32 {
    u32::from(record.confidence) + reliability_weight(record.source)
}

/// Compares two records; `Ordering::Greater` means `a` ranks higher.
#[must_use]
pub fn compare(a: &ContentRecord, b: &ContentRecord) -> Ordering {
    a.is_content_page
        .cmp(&b.is_content_page)
        .then_with(|| quality_score(a).cmp(&quality_score(b)))
        .then_with(|| a.char_len().cmp(&b.char_len()))
        // Exact ties: prefer the earlier source, then the lexically smaller text.
        .then_with(|| b.source.cmp(&a.source))
        .then_with(|| b.text.cmp(&a.text))
}

/// Picks the best record, or `None` for an empty slice.
#[must_use]
pub fn pick(records: &[ContentRecord]) -> Option<&ContentRecord> {
    records.iter().max_by(|a, b| compare(a, b))
}

/// Sorts records best-first.
pub fn rank(records: &mut [ContentRecord]) {
    records.sort_by(|a, b| compare(b, a));
}
