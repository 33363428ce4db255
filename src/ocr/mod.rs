//! OCR engines and the priority chain that selects between them.
//!
//! Engines are identified by short ids (`tesseract`, `ocrs`, `paddle`).
//! Tesseract is always compiled in and shells out to the system binary;
//! the pure-Rust engines are behind the `ocr-ocrs` and `ocr-paddle`
//! features. The chain holds the engines that are both compiled in and
//! enabled in configuration, in fixed priority order, and delegates each
//! recognition request to the first one. A failing engine does not fall
//! through to the next: per-image retries with a second engine would
//! multiply worst-case latency without improving recall much.

mod models;
#[cfg(feature = "ocr-ocrs")]
mod ocrs;
#[cfg(feature = "ocr-paddle")]
mod paddle;
mod tesseract;

pub use models::check_binary;
#[cfg(feature = "ocr-ocrs")]
pub use ocrs::OcrsEngine;
#[cfg(feature = "ocr-paddle")]
pub use paddle::PaddleEngine;
pub use tesseract::TesseractEngine;

use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::OcrConfig;

/// Errors that can occur during OCR.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("No OCR engine configured")]
    NoEngineConfigured,

    #[error("OCR engine not available: {0}")]
    EngineNotAvailable(String),

    #[error("OCR timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("OCR failed: {0}")]
    RecognitionFailed(String),

    #[error("OCR model not found: {0}")]
    ModelNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single OCR engine.
pub trait OcrEngine: Send + Sync {
    /// Engine id as used in configuration (`tesseract`, `ocrs`, `paddle`).
    fn id(&self) -> &'static str;

    /// Whether the engine can run right now (binary installed, models
    /// present or downloadable).
    fn is_available(&self) -> bool;

    /// Human-readable availability status for the `engines` listing.
    fn availability_hint(&self) -> String;

    /// Recognize text in a single raster image.
    ///
    /// Subprocess engines enforce `timeout` by killing the child on the
    /// deadline; in-process engines treat it as advisory.
    fn recognize(&self, image: &Path, timeout: Duration) -> Result<String, OcrError>;
}

/// Engine ids in selection order. Position decides which enabled engine
/// handles recognition.
pub const ENGINE_PRIORITY: &[&str] = &["tesseract", "ocrs", "paddle"];

/// Whether an engine id is compiled into this binary.
pub fn is_engine_compiled(id: &str) -> bool {
    match id {
        "tesseract" => true,
        "ocrs" => cfg!(feature = "ocr-ocrs"),
        "paddle" => cfg!(feature = "ocr-paddle"),
        _ => false,
    }
}

/// All engines compiled into this binary, in priority order.
pub fn compiled_engines(config: &OcrConfig) -> Vec<Arc<dyn OcrEngine>> {
    let mut engines: Vec<Arc<dyn OcrEngine>> = Vec::new();
    for id in ENGINE_PRIORITY {
        match *id {
            "tesseract" => engines.push(Arc::new(TesseractEngine::new(config.language.clone()))),
            #[cfg(feature = "ocr-ocrs")]
            "ocrs" => engines.push(Arc::new(OcrsEngine::new())),
            #[cfg(feature = "ocr-paddle")]
            "paddle" => engines.push(Arc::new(PaddleEngine::new())),
            _ => {}
        }
    }
    engines
}

/// Priority-ordered set of registered OCR engines.
///
/// An engine is registered when it is compiled into the binary and its id
/// appears in the configured engine list. Whether the engine can actually
/// run (binary installed, models present) is a per-call concern and does
/// not affect registration.
pub struct OcrChain {
    engines: Vec<Arc<dyn OcrEngine>>,
    timeout: Duration,
}

impl OcrChain {
    /// Build the chain from configuration.
    pub fn from_config(config: &OcrConfig) -> Self {
        let engines = compiled_engines(config)
            .into_iter()
            .filter(|engine| config.engines.iter().any(|id| id == engine.id()))
            .collect();
        Self {
            engines,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Build a chain from explicit engines, keeping the given order.
    pub fn with_engines(engines: Vec<Arc<dyn OcrEngine>>, timeout: Duration) -> Self {
        Self { engines, timeout }
    }

    pub fn is_engine_registered(&self, id: &str) -> bool {
        self.engines.iter().any(|engine| engine.id() == id)
    }

    pub fn any_engine_registered(&self) -> bool {
        !self.engines.is_empty()
    }

    /// Registered engines in priority order.
    pub fn engines(&self) -> &[Arc<dyn OcrEngine>] {
        &self.engines
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Recognize text in an image with the highest-priority registered
    /// engine. Exactly one engine is consulted per call.
    pub fn recognize(&self, image: &Path) -> Result<String, OcrError> {
        let engine = self.engines.first().ok_or(OcrError::NoEngineConfigured)?;
        engine.recognize(image, self.timeout)
    }
}

/// Run a subprocess with output capture and a hard deadline.
///
/// The pipes are drained on separate threads so a chatty child cannot
/// block on a full pipe while the parent polls. On deadline the child is
/// killed and reaped.
pub(crate) fn run_with_deadline(
    mut cmd: Command,
    tool: &str,
    timeout: Duration,
) -> Result<std::process::Output, OcrError> {
    use std::io::Read;
    use std::process::Stdio;

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(OcrError::EngineNotAvailable(format!("{tool} not found")));
        }
        Err(e) => return Err(OcrError::Io(e)),
    };

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let stdout_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(ref mut pipe) = stdout_pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    });
    let stderr_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(ref mut pipe) = stderr_pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    });

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(OcrError::Timeout {
                        secs: timeout.as_secs(),
                    });
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => return Err(OcrError::Io(e)),
        }
    };

    let stdout = stdout_thread.join().unwrap_or_default();
    let stderr = stderr_thread.join().unwrap_or_default();
    Ok(std::process::Output {
        status,
        stdout,
        stderr,
    })
}
