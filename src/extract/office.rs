//! Text extraction from OOXML and OpenDocument containers.
//!
//! Both formats are zip archives holding XML. The text payload lives in a
//! well-known entry per format; tags are stripped and the five predefined
//! XML entities decoded. Layout is not preserved, which is fine for
//! indexing.

use std::io::Read;
use std::path::Path;

use super::{ExtractError, TextExtractor};

pub struct OfficeExtractor;

impl TextExtractor for OfficeExtractor {
    fn name(&self) -> &'static str {
        "office"
    }

    fn content_types(&self) -> &'static [&'static str] {
        &[
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            "application/vnd.oasis.opendocument.text",
            "application/vnd.oasis.opendocument.spreadsheet",
            "application/vnd.oasis.opendocument.presentation",
        ]
    }

    fn extract(
        &self,
        path: &Path,
        content_type: &str,
        _encoding: Option<&str>,
    ) -> Result<String, ExtractError> {
        let file = std::fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| ExtractError::ExtractorFailed(format!("not a zip container: {e}")))?;

        let xml = match content_type {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                read_entry(&mut archive, "word/document.xml")?
            }
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                read_entry(&mut archive, "xl/sharedStrings.xml")?
            }
            "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
                read_slides(&mut archive)?
            }
            // OpenDocument formats all keep their text in content.xml
            _ => read_entry(&mut archive, "content.xml")?,
        };

        Ok(strip_tags(&xml))
    }
}

fn read_entry(
    archive: &mut zip::ZipArchive<std::fs::File>,
    name: &str,
) -> Result<String, ExtractError> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::ExtractorFailed(format!("missing {name}: {e}")))?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Concatenate all slides of a presentation in slide order.
fn read_slides(archive: &mut zip::ZipArchive<std::fs::File>) -> Result<String, ExtractError> {
    let mut names: Vec<(u32, String)> = archive
        .file_names()
        .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
        .map(|name| (slide_number(name), name.to_string()))
        .collect();
    names.sort();

    if names.is_empty() {
        return Err(ExtractError::ExtractorFailed(
            "presentation has no slides".to_string(),
        ));
    }

    let mut combined = String::new();
    for (_, name) in names {
        combined.push_str(&read_entry(archive, &name)?);
        combined.push('\n');
    }
    Ok(combined)
}

fn slide_number(name: &str) -> u32 {
    name.chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

/// Replace XML tags with spaces, decode predefined entities, collapse runs
/// of whitespace.
fn strip_tags(xml: &str) -> String {
    let re = regex::Regex::new(r"<[^>]*>").unwrap();
    let text = re.replace_all(xml, " ");
    // &amp; last, so "&amp;lt;" decodes to "&lt;" and not "<"
    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_container(entries: &[(&str, &str)]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.bin");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, content) in entries {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        (dir, path)
    }

    #[test]
    fn strips_tags_and_entities() {
        let xml = r#"<w:p><w:t>Fish &amp; Chips</w:t><w:t>to go</w:t></w:p>"#;
        assert_eq!(strip_tags(xml), "Fish & Chips to go");
    }

    #[test]
    fn extracts_docx_body() {
        let (_dir, path) = write_container(&[(
            "word/document.xml",
            "<w:document><w:body><w:t>Quarterly totals</w:t></w:body></w:document>",
        )]);

        let extractor = OfficeExtractor;
        let text = extractor
            .extract(
                &path,
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                None,
            )
            .unwrap();
        assert_eq!(text, "Quarterly totals");
    }

    #[test]
    fn extracts_odt_content() {
        let (_dir, path) = write_container(&[(
            "content.xml",
            "<office:body><text:p>Meeting notes</text:p></office:body>",
        )]);

        let extractor = OfficeExtractor;
        let text = extractor
            .extract(&path, "application/vnd.oasis.opendocument.text", None)
            .unwrap();
        assert_eq!(text, "Meeting notes");
    }

    #[test]
    fn slides_come_out_in_order() {
        let (_dir, path) = write_container(&[
            ("ppt/slides/slide2.xml", "<a:t>second</a:t>"),
            ("ppt/slides/slide1.xml", "<a:t>first</a:t>"),
            ("ppt/slides/slide10.xml", "<a:t>tenth</a:t>"),
        ]);

        let extractor = OfficeExtractor;
        let text = extractor
            .extract(
                &path,
                "application/vnd.openxmlformats-officedocument.presentationml.presentation",
                None,
            )
            .unwrap();
        assert_eq!(text, "first second tenth");
    }

    #[test]
    fn missing_entry_is_extraction_failure() {
        let (_dir, path) = write_container(&[("unrelated.xml", "<x/>")]);

        let extractor = OfficeExtractor;
        let err = extractor
            .extract(
                &path,
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                None,
            )
            .unwrap_err();
        assert!(matches!(err, ExtractError::ExtractorFailed(_)));
    }

    #[test]
    fn non_zip_is_extraction_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-zip.docx");
        std::fs::write(&path, "plain bytes").unwrap();

        let extractor = OfficeExtractor;
        let err = extractor
            .extract(
                &path,
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                None,
            )
            .unwrap_err();
        assert!(matches!(err, ExtractError::ExtractorFailed(_)));
    }
}
