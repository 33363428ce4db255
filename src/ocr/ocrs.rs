//! Pure-Rust OCR through the ocrs crate, no external binaries.
//!
//! The engine loads its two rten models once per process. Missing models
//! are fetched from the ocrs release bucket before the first recognition.
//! Recognition runs in process, so the timeout can only be advisory.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use tracing::warn;

use super::models::{fetch_if_missing, ModelFile, ModelHome};
use super::{OcrEngine, OcrError};

// ocrs::OcrEngine is Send+Sync with &self methods, so the cached
// instance needs no lock.
static ENGINE: OnceLock<ocrs::OcrEngine> = OnceLock::new();

const HOME: ModelHome = ModelHome {
    subdir: "ocrs",
    required: &["text-detection.rten", "text-recognition.rten"],
};

const MODELS: [ModelFile; 2] = [
    ModelFile {
        url: "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten",
        filename: "text-detection.rten",
        size_hint: "2.5 MB",
    },
    ModelFile {
        url: "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten",
        filename: "text-recognition.rten",
        size_hint: "10 MB",
    },
];

fn model_dir() -> Result<PathBuf, OcrError> {
    if let Some(dir) = HOME.locate() {
        return Ok(dir);
    }
    let dir = HOME.download_dir();
    std::fs::create_dir_all(&dir).map_err(OcrError::Io)?;
    for model in &MODELS {
        fetch_if_missing(model, &dir)?;
    }
    Ok(dir)
}

fn load_model(dir: &Path, name: &str) -> Result<rten::Model, OcrError> {
    rten::Model::load_file(dir.join(name))
        .map_err(|e| OcrError::RecognitionFailed(format!("loading {name}: {e}")))
}

fn engine() -> Result<&'static ocrs::OcrEngine, OcrError> {
    if let Some(engine) = ENGINE.get() {
        return Ok(engine);
    }

    let dir = model_dir()?;
    let built = ocrs::OcrEngine::new(ocrs::OcrEngineParams {
        detection_model: Some(load_model(&dir, "text-detection.rten")?),
        recognition_model: Some(load_model(&dir, "text-recognition.rten")?),
        ..Default::default()
    })
    .map_err(|e| OcrError::RecognitionFailed(format!("building ocrs engine: {e}")))?;

    // A racing thread may have set it first; either instance is fine.
    let _ = ENGINE.set(built);
    ENGINE
        .get()
        .ok_or_else(|| OcrError::RecognitionFailed("engine cache empty after init".to_string()))
}

#[derive(Default)]
pub struct OcrsEngine;

impl OcrsEngine {
    pub fn new() -> Self {
        Self
    }
}

impl OcrEngine for OcrsEngine {
    fn id(&self) -> &'static str {
        "ocrs"
    }

    fn is_available(&self) -> bool {
        // Missing models are fetched on first use.
        true
    }

    fn availability_hint(&self) -> String {
        match HOME.locate() {
            Some(dir) => format!("ocrs models found at {}", dir.display()),
            None => format!(
                "ocrs models (~12 MB) will be fetched on first use into {}",
                HOME.download_dir().display()
            ),
        }
    }

    fn recognize(&self, image: &Path, timeout: Duration) -> Result<String, OcrError> {
        let start = Instant::now();
        let engine = engine()?;

        let rgb = image::open(image)
            .map_err(|e| OcrError::RecognitionFailed(format!("reading image: {e}")))?
            .to_rgb8();
        let source = ocrs::ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions())
            .map_err(|e| OcrError::RecognitionFailed(format!("converting image: {e}")))?;

        let input = engine
            .prepare_input(source)
            .map_err(|e| OcrError::RecognitionFailed(format!("preparing input: {e}")))?;
        let text = engine
            .get_text(&input)
            .map_err(|e| OcrError::RecognitionFailed(format!("recognizing text: {e}")))?;

        let elapsed = start.elapsed();
        if elapsed > timeout {
            warn!(
                image = %image.display(),
                elapsed_secs = elapsed.as_secs(),
                timeout_secs = timeout.as_secs(),
                "in-process OCR exceeded the advisory timeout"
            );
        }

        Ok(text)
    }
}
