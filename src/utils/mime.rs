//! MIME type normalization and detection utilities.

use std::path::Path;

/// Normalize a MIME type for use as a registry key.
///
/// Lowercases and strips parameters: `Text/Plain; charset=utf-8` becomes
/// `text/plain`.
pub fn normalize_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or(mime)
        .trim()
        .to_lowercase()
}

/// Whether a normalized MIME type belongs to the text family.
pub fn is_text_family(mime: &str) -> bool {
    mime.starts_with("text/")
}

/// Extension used for stored files of a given MIME type.
pub fn mime_to_extension(mime: &str) -> &'static str {
    match mime {
        "application/pdf" => "pdf",
        "text/html" => "html",
        "text/plain" => "txt",
        "application/json" => "json",
        "application/xml" | "text/xml" => "xml",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/tiff" => "tif",
        "message/rfc822" => "eml",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "application/vnd.ms-excel" => "xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
        "application/vnd.oasis.opendocument.text" => "odt",
        "application/zip" => "zip",
        "application/gzip" => "gz",
        _ => "bin",
    }
}

/// Detect the MIME type of content.
///
/// Magic bytes first, extension second, `application/octet-stream` last.
pub fn detect_mime(content: &[u8], path: &Path) -> String {
    let sample = &content[..content.len().min(8192)];
    if let Some(kind) = infer::get(sample) {
        return kind.mime_type().to_string();
    }
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_normalize_mime() {
        assert_eq!(normalize_mime("Text/Plain; charset=UTF-8"), "text/plain");
        assert_eq!(normalize_mime("application/pdf"), "application/pdf");
        assert_eq!(normalize_mime("  TEXT/HTML "), "text/html");
    }

    #[test]
    fn test_is_text_family() {
        assert!(is_text_family("text/plain"));
        assert!(is_text_family("text/csv"));
        assert!(!is_text_family("application/pdf"));
    }

    #[test]
    fn test_mime_to_extension() {
        assert_eq!(mime_to_extension("application/pdf"), "pdf");
        assert_eq!(mime_to_extension("message/rfc822"), "eml");
        assert_eq!(mime_to_extension("application/x-who-knows"), "bin");
    }

    #[test]
    fn test_detect_mime_magic_bytes() {
        // %PDF-1.4 header
        let pdf = b"%PDF-1.4\n...";
        assert_eq!(detect_mime(pdf, &PathBuf::from("x")), "application/pdf");
    }

    #[test]
    fn test_detect_mime_extension_fallback() {
        let text = b"just some words";
        assert_eq!(detect_mime(text, &PathBuf::from("notes.txt")), "text/plain");
    }

    #[test]
    fn test_detect_mime_octet_stream_default() {
        let noise = b"just some words";
        assert_eq!(
            detect_mime(noise, &PathBuf::from("mystery")),
            "application/octet-stream"
        );
    }
}
