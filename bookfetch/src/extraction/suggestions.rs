//! Genre-conditioned next steps shown when every source is exhausted.

use crate::models::{BookDescriptor, Genre};

const FICTION: &[&str] = &[
    "Look for a sample chapter on the author's website",
    "Check the publisher's page for a \"Read an excerpt\" link",
    "Try the \"Look Inside\" preview at an online bookstore",
];

const NON_FICTION: &[&str] = &[
    "Look for a sample chapter on the publisher's website",
    "Search for the introduction or first chapter as a free PDF from the publisher",
    "Check a local or university library for a digital loan",
];

const COMMON: &[&str] = &[
    "Search for the title on a library lending service",
    "Photograph a page from a physical copy instead",
];

/// Closing note attached to every exhaustion report.
pub const AVAILABILITY_NOTE: &str = "Many books, especially recent or copyrighted works, are simply not freely available in full text online.";

/// Suggestions for the book's genre, followed by general ones.
#[must_use]
pub fn suggestions_for(book: &BookDescriptor) -> Vec<String> {
    let specific = match book.genre {
        Genre::Fiction => FICTION,
        Genre::NonFiction => NON_FICTION,
        Genre::Unknown => &FICTION[..1],
    };

    let mut out: Vec<String> = specific.iter().map(|s| (*s).to_string()).collect();
    if book.genre == Genre::Unknown {
        out.push(NON_FICTION[0].to_string());
    }
    if let Some(publisher) = book.publisher.as_deref().filter(|p| !p.trim().is_empty()) {
        out.push(format!("Contact {} for a review excerpt", publisher.trim()));
    }
    out.extend(COMMON.iter().map(|s| (*s).to_string()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiction_and_non_fiction_differ() {
        let fiction = suggestions_for(&BookDescriptor::new("T", "A").with_genre(Genre::Fiction));
        let non_fiction = suggestions_for(&BookDescriptor::new("T", "A").with_genre(Genre::NonFiction));
        assert!(fiction[0].contains("author's website"));
        assert!(non_fiction[0].contains("publisher's website"));
        assert_ne!(fiction, non_fiction);
    }

    #[test]
    fn test_unknown_genre_mixes_both() {
        let out = suggestions_for(&BookDescriptor::new("T", "A"));
        assert!(out.iter().any(|s| s.contains("author's website")));
        assert!(out.iter().any(|s| s.contains("publisher's website")));
    }

    #[test]
    fn test_publisher_suggestion() {
        let out = suggestions_for(&BookDescriptor::new("T", "A").with_publisher("Penguin"));
        assert!(out.contains(&"Contact Penguin for a review excerpt".to_string()));
    }
}
