//! Core value types flowing through the extraction pipeline.
//!
//! This module provides:
//! - `BookDescriptor`, the identified book handed to every source
//! - `ContentRecord`, the normalized output of one source attempt
//! - The small enums that qualify both (genre, page class, source, page type)

mod book;
mod record;

pub use book::{BookDescriptor, Genre, PageClass};
pub use record::{ContentRecord, ContentSource, PageType};
