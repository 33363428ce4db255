//! Text extraction from stored document files.
//!
//! Each [`TextExtractor`] handles a fixed set of content types and is looked
//! up through an [`ExtractorRegistry`]. The [`ExtractionPipeline`] drives the
//! full flow: lookup, extraction, OCR fallback for image-only PDFs, and the
//! minimum-length check.

mod html;
mod mail;
mod office;
mod pdf;
mod pipeline;
mod plain;
mod registry;

pub use html::HtmlExtractor;
pub use mail::MailExtractor;
pub use office::OfficeExtractor;
pub use pdf::{PageImageLister, PdfExtractor, PdfImageLister};
pub use pipeline::ExtractionPipeline;
pub use plain::PlainTextExtractor;
pub use registry::ExtractorRegistry;

use std::path::Path;

use thiserror::Error;

/// Ways an extraction attempt can fail.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported content type: {0}")]
    UnsupportedType(String),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractorFailed(String),

    #[error("Too few characters: {actual} extracted, {minimum} required")]
    TooFewCharacters { actual: usize, minimum: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A text extractor for one or more content types.
///
/// Implementations must not write anywhere outside temporary scratch space;
/// persisting results is the caller's job.
pub trait TextExtractor: Send + Sync {
    /// Short identifier used in configuration and logs.
    fn name(&self) -> &'static str;

    /// Content types this extractor handles, lowercase without parameters.
    fn content_types(&self) -> &'static [&'static str];

    /// Extract plain text from the file at `path`.
    fn extract(
        &self,
        path: &Path,
        content_type: &str,
        encoding: Option<&str>,
    ) -> Result<String, ExtractError>;
}
