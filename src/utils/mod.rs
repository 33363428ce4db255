//! Small helpers for MIME handling and filesystem-safe names.
//!
//! - `mime`: MIME normalization, detection, and extension mapping
//! - `names`: filename sanitizing and temp-file stem padding

mod mime;
mod names;

pub use mime::{detect_mime, is_text_family, mime_to_extension, normalize_mime};
pub use names::{safe_stem, sanitize_filename};
