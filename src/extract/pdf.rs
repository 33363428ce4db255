//! PDF text-layer extraction and embedded image listing.
//!
//! Both operations shell out to poppler-utils. The text layer comes from
//! `pdftotext`; embedded images are enumerated with `pdfimages`, which
//! writes them in page order with zero-padded stems.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::utils::safe_stem;

use super::{ExtractError, TextExtractor};

fn handle_cmd_output(
    result: std::io::Result<std::process::Output>,
    tool_name: &str,
    error_prefix: &str,
) -> Result<String, ExtractError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ExtractError::ExtractorFailed(format!(
                    "{}: {}",
                    error_prefix, stderr
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(ExtractError::Io(e)),
    }
}

fn check_cmd_status(
    result: std::io::Result<std::process::ExitStatus>,
    tool_name: &str,
    error_msg: &str,
) -> Result<(), ExtractError> {
    match result {
        Ok(s) if s.success() => Ok(()),
        Ok(_) => Err(ExtractError::ExtractorFailed(error_msg.to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(ExtractError::Io(e)),
    }
}

/// Extractor for the PDF text layer via `pdftotext`.
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn content_types(&self) -> &'static [&'static str] {
        &["application/pdf"]
    }

    fn extract(
        &self,
        path: &Path,
        _content_type: &str,
        _encoding: Option<&str>,
    ) -> Result<String, ExtractError> {
        let output = Command::new("pdftotext")
            .args(["-layout", "-enc", "UTF-8"])
            .arg(path)
            .arg("-")
            .output();

        handle_cmd_output(
            output,
            "pdftotext (install poppler-utils)",
            "pdftotext failed",
        )
    }
}

/// Lists the embedded raster images of a PDF into a scratch directory.
///
/// Implementations must return paths in page order; the OCR fallback
/// concatenates recognized text in the order given here.
pub trait PageImageLister: Send + Sync {
    fn list_images(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, ExtractError>;
}

/// Production lister backed by `pdfimages`.
pub struct PdfImageLister;

impl PageImageLister for PdfImageLister {
    fn list_images(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
        let stem = safe_stem(pdf.file_stem().and_then(|s| s.to_str()).unwrap_or(""));
        let status = Command::new("pdfimages")
            .arg("-png")
            .arg(pdf)
            .arg(out_dir.join(&stem))
            .status();

        check_cmd_status(
            status,
            "pdfimages (install poppler-utils)",
            "pdfimages failed to enumerate images",
        )?;

        collect_png_sorted(out_dir, &format!("{stem}-"))
    }
}

/// Collect `<prefix>NNN.png` files and sort them. The zero-padded stems make
/// lexicographic order equal page order.
fn collect_png_sorted(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, ExtractError> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            name.starts_with(prefix) && name.ends_with(".png")
        })
        .collect();
    images.sort();
    Ok(images)
}
