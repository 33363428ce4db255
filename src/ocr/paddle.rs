//! PaddleOCR models driven through ONNX Runtime.
//!
//! Missing models are fetched from the RapidOCR releases before the first
//! recognition. OcrLite wants `&mut self` for detection, so the shared
//! instance lives behind a mutex. Recognition runs in process, so the
//! timeout can only be advisory.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use paddle_ocr_rs::ocr_lite::OcrLite;
use tracing::warn;

use super::models::{fetch_if_missing, ModelFile, ModelHome};
use super::{OcrEngine, OcrError};

static ENGINE: OnceLock<Mutex<OcrLite>> = OnceLock::new();

const DET: &str = "ch_PP-OCRv4_det_infer.onnx";
const REC: &str = "ch_PP-OCRv4_rec_infer.onnx";
const CLS: &str = "ch_ppocr_mobile_v2.0_cls_infer.onnx";

// The angle classifier is optional for layout-upright scans, so only the
// detector and recognizer mark a directory as usable.
const HOME: ModelHome = ModelHome {
    subdir: "paddle-ocr",
    required: &[DET, REC],
};

const MODELS: [ModelFile; 3] = [
    ModelFile {
        url: "https://huggingface.co/SWHL/RapidOCR/resolve/main/PP-OCRv4/ch_PP-OCRv4_det_infer.onnx",
        filename: DET,
        size_hint: "4 MB",
    },
    ModelFile {
        url: "https://huggingface.co/SWHL/RapidOCR/resolve/main/PP-OCRv4/ch_PP-OCRv4_rec_infer.onnx",
        filename: REC,
        size_hint: "10 MB",
    },
    ModelFile {
        url: "https://www.modelscope.cn/models/RapidAI/RapidOCR/resolve/v3.4.0/onnx/PP-OCRv4/cls/ch_ppocr_mobile_v2.0_cls_infer.onnx",
        filename: CLS,
        size_hint: "1 MB",
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

fn engine() -> Result<&'static Mutex<OcrLite>, OcrError> {
    if let Some(engine) = ENGINE.get() {
        return Ok(engine);
    }

    let dir = model_dir()?;
    if !HOME.is_complete(&dir) {
        return Err(OcrError::ModelNotFound(format!(
            "PaddleOCR models missing from {}",
            dir.display()
        )));
    }

    let mut ocr = OcrLite::new();
    let num_threads = 4;
    ocr.init_models(
        &dir.join(DET).to_string_lossy(),
        &dir.join(CLS).to_string_lossy(),
        &dir.join(REC).to_string_lossy(),
        num_threads,
    )
    .map_err(|e| OcrError::RecognitionFailed(format!("initializing PaddleOCR: {e}")))?;

    // A racing thread may have set it first; either instance is fine.
    let _ = ENGINE.set(Mutex::new(ocr));
    ENGINE
        .get()
        .ok_or_else(|| OcrError::RecognitionFailed("engine cache empty after init".to_string()))
}

#[derive(Default)]
pub struct PaddleEngine;

impl PaddleEngine {
    pub fn new() -> Self {
        Self
    }
}

impl OcrEngine for PaddleEngine {
    fn id(&self) -> &'static str {
        "paddle"
    }

    fn is_available(&self) -> bool {
        // Missing models are fetched on first use.
        true
    }

    fn availability_hint(&self) -> String {
        match HOME.locate() {
            Some(dir) => format!("PaddleOCR models found at {}", dir.display()),
            None => format!(
                "PaddleOCR models (~15 MB) will be fetched on first use into {}",
                HOME.download_dir().display()
            ),
        }
    }

    fn recognize(&self, image: &Path, timeout: Duration) -> Result<String, OcrError> {
        let start = Instant::now();
        let mut ocr = engine()?
            .lock()
            .map_err(|e| OcrError::RecognitionFailed(format!("engine lock poisoned: {e}")))?;

        let result = ocr
            .detect_from_path(
                image.to_str().unwrap_or(""),
                50,    // padding
                1024,  // max side length
                0.5,   // box score threshold
                0.3,   // box threshold
                1.6,   // unclip ratio
                false, // do angle
                false, // most angle
            )
            .map_err(|e| OcrError::RecognitionFailed(format!("PaddleOCR detection: {e}")))?;

        let lines: Vec<&str> = result
            .text_blocks
            .iter()
            .map(|block| block.text.as_str())
            .collect();

        let elapsed = start.elapsed();
        if elapsed > timeout {
            warn!(
                image = %image.display(),
                elapsed_secs = elapsed.as_secs(),
                timeout_secs = timeout.as_secs(),
                "in-process OCR exceeded the advisory timeout"
            );
        }

        Ok(lines.join("\n"))
    }
}
