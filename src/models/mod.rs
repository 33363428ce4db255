//! Data models for textmill.

mod document;

pub use document::{ActivityEntry, Document, DocumentVersion, Extraction, ExtractionOutcome};
