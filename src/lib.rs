//! textmill - document text extraction and full-text search maintenance.
//!
//! Maintains a local archive of documents: stored binary content (PDF,
//! office files, HTML, mail, plain text) is turned into plain text, with an
//! OCR fallback for image-only PDFs, and kept searchable through a tantivy
//! index plus a spell-check dictionary that stay consistent with the
//! underlying store across restarts and partial failures.

pub mod cli;
pub mod config;
pub mod extract;
pub mod index;
pub mod models;
pub mod ocr;
pub mod services;
pub mod storage;
pub mod store;
pub mod utils;
