//! The extraction pipeline: lookup, extraction, OCR fallback, length check.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{ExtractionConfig, Settings};
use crate::models::{Extraction, ExtractionOutcome};
use crate::ocr::OcrChain;
use crate::utils::{is_text_family, normalize_mime};

use super::plain::sniff_encoding;
use super::{ExtractError, ExtractorRegistry, PageImageLister, PdfImageLister};

/// A text layer with at most this many trimmed characters counts as absent
/// and triggers the OCR fallback for PDFs.
const OCR_TRIGGER_MAX_CHARS: usize = 1;

/// Drives a single version through extraction.
///
/// The pipeline never writes to the store or the index; it returns an
/// [`Extraction`] and leaves persistence to the caller. Failures come back
/// as values, not errors, so one broken document never aborts a batch.
pub struct ExtractionPipeline {
    registry: ExtractorRegistry,
    ocr: OcrChain,
    lister: Arc<dyn PageImageLister>,
    config: ExtractionConfig,
}

impl ExtractionPipeline {
    pub fn new(
        registry: ExtractorRegistry,
        ocr: OcrChain,
        lister: Arc<dyn PageImageLister>,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            registry,
            ocr,
            lister,
            config,
        }
    }

    /// Build the production pipeline from settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            ExtractorRegistry::from_ids(&settings.extraction.extractors),
            OcrChain::from_config(&settings.ocr),
            Arc::new(PdfImageLister),
            settings.extraction.clone(),
        )
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    pub fn ocr(&self) -> &OcrChain {
        &self.ocr
    }

    /// Extract text from the file at `path`.
    pub fn extract(&self, path: &Path, content_type: &str, encoding: Option<&str>) -> Extraction {
        let normalized = normalize_mime(content_type);

        let Some(extractor) = self.registry.lookup(&normalized) else {
            let err = ExtractError::UnsupportedType(normalized);
            return Extraction::failure(ExtractionOutcome::UnsupportedType, err.to_string());
        };

        // Text-family content with no stored encoding gets a best-effort
        // sniff before the extractor sees it.
        let encoding: Option<&str> = match encoding {
            Some(label) => Some(label),
            None if is_text_family(&normalized) => sniff_encoding(path),
            None => None,
        };

        debug!(
            path = %path.display(),
            content_type = %normalized,
            extractor = extractor.name(),
            encoding = encoding.unwrap_or("-"),
            "extracting text"
        );

        let mut text = match extractor.extract(path, &normalized, encoding) {
            Ok(text) => text,
            Err(err) => {
                // A hard extractor failure is not softened by OCR: if the
                // file cannot be read, its images cannot either.
                warn!(path = %path.display(), error = %err, "extraction failed");
                return Extraction::failure(outcome_for(&err), err.to_string());
            }
        };

        if normalized == "application/pdf" && self.should_run_ocr(&text) {
            if let Some(recognized) = self.ocr_embedded_images(path) {
                text = recognized;
            }
        }

        let actual = text.trim().chars().count();
        if actual < self.config.min_chars {
            let err = ExtractError::TooFewCharacters {
                actual,
                minimum: self.config.min_chars,
            };
            return Extraction::failure(ExtractionOutcome::TooShort, err.to_string());
        }

        Extraction::success(text)
    }

    fn should_run_ocr(&self, text: &str) -> bool {
        if !self.config.force_ocr && text.trim().chars().count() > OCR_TRIGGER_MAX_CHARS {
            return false;
        }
        if !self.ocr.any_engine_registered() {
            debug!("PDF has no usable text layer but no OCR engine is registered");
            return false;
        }
        true
    }

    /// OCR every embedded image of `pdf` and concatenate the results in
    /// page order. Returns `None` when the images could not be enumerated,
    /// in which case the text-layer result stands.
    fn ocr_embedded_images(&self, pdf: &Path) -> Option<String> {
        let scratch = match tempfile::TempDir::new() {
            Ok(dir) => dir,
            Err(err) => {
                warn!(error = %err, "could not create scratch dir for OCR");
                return None;
            }
        };

        let images = match self.lister.list_images(pdf, scratch.path()) {
            Ok(images) => images,
            Err(err) => {
                warn!(pdf = %pdf.display(), error = %err, "could not list embedded images");
                return None;
            }
        };

        debug!(pdf = %pdf.display(), images = images.len(), "running OCR fallback");

        let mut accumulated = String::new();
        for image in &images {
            match self.ocr.recognize(image) {
                Ok(recognized) => {
                    accumulated.push_str(&recognized);
                    accumulated.push(' ');
                }
                Err(err) => {
                    warn!(image = %image.display(), error = %err, "OCR failed for embedded image");
                }
            }
            // Free disk early on large PDFs; the TempDir cleans up the rest.
            let _ = std::fs::remove_file(image);
        }

        Some(accumulated)
    }
}

fn outcome_for(err: &ExtractError) -> ExtractionOutcome {
    match err {
        ExtractError::UnsupportedType(_) => ExtractionOutcome::UnsupportedType,
        ExtractError::TooFewCharacters { .. } => ExtractionOutcome::TooShort,
        _ => ExtractionOutcome::EngineError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{PlainTextExtractor, TextExtractor};
    use crate::ocr::{OcrEngine, OcrError};
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedExtractor {
        types: &'static [&'static str],
        result: Result<&'static str, &'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl TextExtractor for ScriptedExtractor {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn content_types(&self) -> &'static [&'static str] {
            self.types
        }

        fn extract(
            &self,
            _path: &Path,
            _content_type: &str,
            _encoding: Option<&str>,
        ) -> Result<String, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.result {
                Ok(text) => Ok(text.to_string()),
                Err(msg) => Err(ExtractError::ExtractorFailed(msg.to_string())),
            }
        }
    }

    struct ScriptedEngine {
        results: Mutex<VecDeque<Result<&'static str, &'static str>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedEngine {
        fn new(results: Vec<Result<&'static str, &'static str>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into()),
                calls: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    impl OcrEngine for ScriptedEngine {
        fn id(&self) -> &'static str {
            "tesseract"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn availability_hint(&self) -> String {
            "fake".to_string()
        }

        fn recognize(&self, _image: &Path, _timeout: Duration) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.results.lock().unwrap().pop_front();
            match next.unwrap_or(Ok("")) {
                Ok(text) => Ok(text.to_string()),
                Err(msg) => Err(OcrError::RecognitionFailed(msg.to_string())),
            }
        }
    }

    struct FakeLister {
        image_count: usize,
        calls: Arc<AtomicUsize>,
    }

    impl PageImageLister for FakeLister {
        fn list_images(&self, _pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut images = Vec::new();
            for i in 0..self.image_count {
                let path = out_dir.join(format!("img-{:03}.png", i));
                std::fs::write(&path, b"png").unwrap();
                images.push(path);
            }
            Ok(images)
        }
    }

    struct FailingLister;

    impl PageImageLister for FailingLister {
        fn list_images(&self, _pdf: &Path, _out_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
            Err(ExtractError::ToolNotFound("pdfimages".to_string()))
        }
    }

    struct PipelineFixture {
        pipeline: ExtractionPipeline,
        extractor_calls: Arc<AtomicUsize>,
        engine_calls: Arc<AtomicUsize>,
        lister_calls: Arc<AtomicUsize>,
        _dir: tempfile::TempDir,
        pdf_path: PathBuf,
    }

    fn pdf_fixture(
        text_layer: Result<&'static str, &'static str>,
        image_count: usize,
        engine_results: Vec<Result<&'static str, &'static str>>,
        config: ExtractionConfig,
    ) -> PipelineFixture {
        let extractor_calls = Arc::new(AtomicUsize::new(0));
        let lister_calls = Arc::new(AtomicUsize::new(0));

        let mut registry = ExtractorRegistry::new();
        registry.register(Arc::new(ScriptedExtractor {
            types: &["application/pdf"],
            result: text_layer,
            calls: extractor_calls.clone(),
        }));

        let engine = ScriptedEngine::new(engine_results);
        let engine_calls = engine.calls.clone();
        let chain = OcrChain::with_engines(vec![engine], Duration::from_secs(5));

        let lister = Arc::new(FakeLister {
            image_count,
            calls: lister_calls.clone(),
        });

        let dir = tempfile::tempdir().unwrap();
        let pdf_path = dir.path().join("doc.pdf");
        std::fs::write(&pdf_path, b"%PDF-1.4").unwrap();

        PipelineFixture {
            pipeline: ExtractionPipeline::new(registry, chain, lister, config),
            extractor_calls,
            engine_calls,
            lister_calls,
            _dir: dir,
            pdf_path,
        }
    }

    #[test]
    fn unsupported_type_skips_extractors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ExtractorRegistry::new();
        registry.register(Arc::new(ScriptedExtractor {
            types: &["text/plain"],
            result: Ok("whatever"),
            calls: calls.clone(),
        }));
        let pipeline = ExtractionPipeline::new(
            registry,
            OcrChain::with_engines(vec![], Duration::from_secs(1)),
            Arc::new(FailingLister),
            ExtractionConfig::default(),
        );

        let result = pipeline.extract(Path::new("/tmp/x.bin"), "application/x-unknown", None);

        assert_eq!(result.outcome, ExtractionOutcome::UnsupportedType);
        assert_eq!(result.text, "");
        assert!(result.failure.unwrap().contains("application/x-unknown"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn short_text_file_is_too_short() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.txt");
        std::fs::write(&path, "hi").unwrap();

        let mut registry = ExtractorRegistry::new();
        registry.register(Arc::new(PlainTextExtractor));
        let pipeline = ExtractionPipeline::new(
            registry,
            OcrChain::with_engines(vec![], Duration::from_secs(1)),
            Arc::new(FailingLister),
            ExtractionConfig::default(),
        );

        let result = pipeline.extract(&path, "text/plain", None);

        assert_eq!(result.outcome, ExtractionOutcome::TooShort);
        assert_eq!(result.text, "");
        let failure = result.failure.unwrap();
        assert!(failure.contains("2 extracted"));
        assert!(failure.contains("16 required"));
    }

    #[test]
    fn text_at_threshold_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exact.txt");
        let contents = "exactly sixteen!";
        assert_eq!(contents.chars().count(), 16);
        std::fs::write(&path, contents).unwrap();

        let mut registry = ExtractorRegistry::new();
        registry.register(Arc::new(PlainTextExtractor));
        let pipeline = ExtractionPipeline::new(
            registry,
            OcrChain::with_engines(vec![], Duration::from_secs(1)),
            Arc::new(FailingLister),
            ExtractionConfig::default(),
        );

        let result = pipeline.extract(&path, "text/plain", None);

        assert_eq!(result.outcome, ExtractionOutcome::Success);
        assert_eq!(result.text, contents);
        assert!(result.failure.is_none());
    }

    #[test]
    fn extractor_failure_is_hard_and_skips_ocr() {
        let fixture = pdf_fixture(
            Err("pdftotext failed: exit 1"),
            1,
            vec![Ok("SHOULD NOT BE REACHED")],
            ExtractionConfig::default(),
        );

        let result = fixture
            .pipeline
            .extract(&fixture.pdf_path, "application/pdf", None);

        assert_eq!(result.outcome, ExtractionOutcome::EngineError);
        assert!(result.failure.unwrap().contains("pdftotext failed: exit 1"));
        assert_eq!(fixture.engine_calls.load(Ordering::SeqCst), 0);
        assert_eq!(fixture.lister_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn image_only_pdf_goes_through_ocr_then_length_check() {
        let fixture = pdf_fixture(
            Ok(""),
            1,
            vec![Ok("INVOICE 123")],
            ExtractionConfig::default(),
        );

        let result = fixture
            .pipeline
            .extract(&fixture.pdf_path, "application/pdf", None);

        // "INVOICE 123 " trims to 11 chars, below the default minimum of 16
        assert_eq!(result.outcome, ExtractionOutcome::TooShort);
        assert!(result.failure.unwrap().contains("11 extracted"));
        assert_eq!(fixture.engine_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.extractor_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ocr_text_replaces_empty_text_layer() {
        let fixture = pdf_fixture(
            Ok(" "),
            2,
            vec![Ok("first scanned page"), Ok("second scanned page")],
            ExtractionConfig::default(),
        );

        let result = fixture
            .pipeline
            .extract(&fixture.pdf_path, "application/pdf", None);

        assert_eq!(result.outcome, ExtractionOutcome::Success);
        assert_eq!(result.text, "first scanned page second scanned page ");
        assert_eq!(fixture.engine_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn good_text_layer_skips_ocr() {
        let fixture = pdf_fixture(
            Ok("This text layer has plenty of characters in it."),
            1,
            vec![Ok("SHOULD NOT BE REACHED")],
            ExtractionConfig::default(),
        );

        let result = fixture
            .pipeline
            .extract(&fixture.pdf_path, "application/pdf", None);

        assert_eq!(result.outcome, ExtractionOutcome::Success);
        assert_eq!(
            result.text,
            "This text layer has plenty of characters in it."
        );
        assert_eq!(fixture.lister_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn force_ocr_replaces_good_text_layer() {
        let config = ExtractionConfig {
            force_ocr: true,
            ..ExtractionConfig::default()
        };
        let fixture = pdf_fixture(
            Ok("This text layer has plenty of characters in it."),
            1,
            vec![Ok("recognized replacement text")],
            config,
        );

        let result = fixture
            .pipeline
            .extract(&fixture.pdf_path, "application/pdf", None);

        assert_eq!(result.outcome, ExtractionOutcome::Success);
        assert_eq!(result.text, "recognized replacement text ");
    }

    #[test]
    fn no_registered_engine_skips_fallback() {
        let extractor_calls = Arc::new(AtomicUsize::new(0));
        let lister_calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ExtractorRegistry::new();
        registry.register(Arc::new(ScriptedExtractor {
            types: &["application/pdf"],
            result: Ok(""),
            calls: extractor_calls,
        }));
        let pipeline = ExtractionPipeline::new(
            registry,
            OcrChain::with_engines(vec![], Duration::from_secs(1)),
            Arc::new(FakeLister {
                image_count: 3,
                calls: lister_calls.clone(),
            }),
            ExtractionConfig::default(),
        );

        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("doc.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let result = pipeline.extract(&pdf, "application/pdf", None);

        assert_eq!(result.outcome, ExtractionOutcome::TooShort);
        assert_eq!(lister_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn per_image_failure_keeps_remaining_images() {
        let fixture = pdf_fixture(
            Ok(""),
            2,
            vec![Err("engine crashed"), Ok("text from the second image ok")],
            ExtractionConfig::default(),
        );

        let result = fixture
            .pipeline
            .extract(&fixture.pdf_path, "application/pdf", None);

        assert_eq!(result.outcome, ExtractionOutcome::Success);
        assert_eq!(result.text, "text from the second image ok ");
        assert_eq!(fixture.engine_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn lister_failure_keeps_text_layer_result() {
        let extractor_calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ExtractorRegistry::new();
        registry.register(Arc::new(ScriptedExtractor {
            types: &["application/pdf"],
            result: Ok(""),
            calls: extractor_calls,
        }));
        let engine = ScriptedEngine::new(vec![Ok("unused")]);
        let engine_calls = engine.calls.clone();
        let pipeline = ExtractionPipeline::new(
            registry,
            OcrChain::with_engines(vec![engine], Duration::from_secs(1)),
            Arc::new(FailingLister),
            ExtractionConfig::default(),
        );

        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("doc.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let result = pipeline.extract(&pdf, "application/pdf", None);

        assert_eq!(result.outcome, ExtractionOutcome::TooShort);
        assert_eq!(engine_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, "long enough to pass the minimum").unwrap();

        let mut registry = ExtractorRegistry::new();
        registry.register(Arc::new(PlainTextExtractor));
        let pipeline = ExtractionPipeline::new(
            registry,
            OcrChain::with_engines(vec![], Duration::from_secs(1)),
            Arc::new(FailingLister),
            ExtractionConfig::default(),
        );

        let result = pipeline.extract(&path, "Text/Plain; charset=utf-8", None);
        assert_eq!(result.outcome, ExtractionOutcome::Success);
    }
}
