//! Tesseract OCR engine.
//!
//! Shells out to the system `tesseract` binary, the traditional and most
//! widely packaged OCR option.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use super::models::check_binary;
use super::{run_with_deadline, OcrEngine, OcrError};

pub struct TesseractEngine {
    language: String,
}

impl TesseractEngine {
    pub fn new(language: String) -> Self {
        Self { language }
    }
}

impl OcrEngine for TesseractEngine {
    fn id(&self) -> &'static str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        check_binary("tesseract")
    }

    fn availability_hint(&self) -> String {
        if check_binary("tesseract") {
            "Tesseract is available".to_string()
        } else {
            "Tesseract not installed. Install with: apt install tesseract-ocr".to_string()
        }
    }

    fn recognize(&self, image: &Path, timeout: Duration) -> Result<String, OcrError> {
        let mut cmd = Command::new("tesseract");
        cmd.arg(image).arg("stdout").args(["-l", &self.language]);

        let output = run_with_deadline(cmd, "tesseract (install tesseract-ocr)", timeout)?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(OcrError::RecognitionFailed(format!(
                "tesseract failed: {}",
                stderr
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_fixed_id() {
        let engine = TesseractEngine::new("eng".to_string());
        assert_eq!(engine.id(), "tesseract");
    }

    #[test]
    fn hint_mentions_tesseract() {
        let engine = TesseractEngine::new("eng".to_string());
        assert!(engine.availability_hint().contains("Tesseract"));
    }
}
