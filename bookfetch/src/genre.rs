//! Keyword-based genre fallback.
//!
//! Used when the model-backed classifier is unavailable. Counts whole-word
//! keyword hits in the title and description.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{BookDescriptor, Genre};

#[allow(clippy::expect_used)]
static FICTION_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(novel|novels|fiction|story|stories|tale|tales|fantasy|mystery|thriller|romance|adventure|saga|detective|murder|dragon|magic|wizard|love|war|quest)\b",
    )
    .expect("valid regex")
});

#[allow(clippy::expect_used)]
static NON_FICTION_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(history|biography|memoir|guide|handbook|introduction|science|economics|philosophy|psychology|business|self-help|cookbook|essays|theory|principles|study|analysis|how to|manual|textbook)\b",
    )
    .expect("valid regex")
});

/// Classifies a book from title and description keywords.
///
/// The larger non-zero hit count wins; ties and no hits give `Unknown`.
#[must_use]
pub fn classify_by_keywords(book: &BookDescriptor) -> Genre {
    let mut haystack = book.title.clone();
    if let Some(description) = &book.description {
        haystack.push(' ');
        haystack.push_str(description);
    }

    let fiction = FICTION_WORDS.find_iter(&haystack).count();
    let non_fiction = NON_FICTION_WORDS.find_iter(&haystack).count();
    match fiction.cmp(&non_fiction) {
        std::cmp::Ordering::Greater => Genre::Fiction,
        std::cmp::Ordering::Less => Genre::NonFiction,
        std::cmp::Ordering::Equal => Genre::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiction_keywords() {
        let book = BookDescriptor::new("The Dragon's Quest", "A. Author")
            .with_description("An epic fantasy novel of magic and war.");
        assert_eq!(classify_by_keywords(&book), Genre::Fiction);
    }

    #[test]
    fn test_non_fiction_keywords() {
        let book = BookDescriptor::new("A Short History of Nearly Everything", "Bill Bryson")
            .with_description("A popular science introduction.");
        assert_eq!(classify_by_keywords(&book), Genre::NonFiction);
    }

    #[test]
    fn test_no_hits_or_tie_is_unknown() {
        assert_eq!(classify_by_keywords(&BookDescriptor::new("Untitled", "Anon")), Genre::Unknown);
        let tie = BookDescriptor::new("A Love Story", "Anon").with_description("history and science");
        assert_eq!(classify_by_keywords(&tie), Genre::Unknown);
    }

    #[test]
    fn test_word_boundaries() {
        // "historyless" and "storyboard" are not keyword hits.
        let book = BookDescriptor::new("Storyboard Historyless", "Anon");
        assert_eq!(classify_by_keywords(&book), Genre::Unknown);
    }
}
