//! Plain text extraction with encoding detection.

use std::io::Read;
use std::path::Path;

use super::{ExtractError, TextExtractor};

/// Sample size for encoding detection.
const SNIFF_SAMPLE_BYTES: usize = 8192;

/// Extractor for plain text files.
///
/// When no encoding is recorded for the version, the byte order mark is
/// checked first, then strict UTF-8, and finally a lossy UTF-8 decode so that
/// extraction never fails on mislabeled legacy files.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn content_types(&self) -> &'static [&'static str] {
        &["text/plain", "text/csv", "text/markdown"]
    }

    fn extract(
        &self,
        path: &Path,
        _content_type: &str,
        encoding: Option<&str>,
    ) -> Result<String, ExtractError> {
        let bytes = std::fs::read(path)?;
        Ok(decode_bytes(&bytes, encoding))
    }
}

/// Best-effort encoding detection from a file's first bytes.
///
/// Returns a label [`decode_bytes`] understands, or `None` when the sample
/// says nothing; the caller then proceeds with the default decode (strict
/// UTF-8, lossy fallback) rather than aborting.
pub(crate) fn sniff_encoding(path: &Path) -> Option<&'static str> {
    let mut sample = vec![0u8; SNIFF_SAMPLE_BYTES];
    let mut file = std::fs::File::open(path).ok()?;
    let read = file.read(&mut sample).ok()?;
    sample.truncate(read);

    if sample.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return Some("utf-8");
    }
    if sample.starts_with(&[0xFF, 0xFE]) {
        return Some("utf-16le");
    }
    if sample.starts_with(&[0xFE, 0xFF]) {
        return Some("utf-16be");
    }

    // The sample may cut a multi-byte sequence at its end; an error within
    // the last three bytes still counts as valid UTF-8.
    match std::str::from_utf8(&sample) {
        Ok(_) => Some("utf-8"),
        Err(err) if err.valid_up_to() + 3 >= sample.len() => Some("utf-8"),
        Err(_) => None,
    }
}

/// Decode raw bytes to a string, honoring an optional declared encoding.
///
/// A byte order mark always wins over the declared encoding.
pub(crate) fn decode_bytes(bytes: &[u8], encoding: Option<&str>) -> String {
    if let Some(stripped) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(stripped).into_owned();
    }
    if let Some(stripped) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(stripped, false);
    }
    if let Some(stripped) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(stripped, true);
    }

    match encoding.map(|e| e.trim().to_ascii_lowercase()).as_deref() {
        Some("utf-16le") => decode_utf16(bytes, false),
        Some("utf-16be") | Some("utf-16") => decode_utf16(bytes, true),
        Some("latin1") | Some("iso-8859-1") | Some("windows-1252") => {
            bytes.iter().map(|&b| b as char).collect()
        }
        // utf-8, us-ascii, unknown labels: strict first, lossy fallback
        _ => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
    }
}

fn decode_utf16(bytes: &[u8], big_endian: bool) -> String {
    let units = bytes.chunks_exact(2).map(|pair| {
        if big_endian {
            u16::from_be_bytes([pair[0], pair[1]])
        } else {
            u16::from_le_bytes([pair[0], pair[1]])
        }
    });
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
