//! Binary probing and model-file management shared by the OCR engines.

// The model half is only compiled into use when an optional engine
// feature is on.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use super::OcrError;

/// Whether `name` resolves on PATH.
pub fn check_binary(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// One downloadable model file.
pub struct ModelFile {
    pub url: &'static str,
    pub filename: &'static str,
    /// Rough size, shown while downloading.
    pub size_hint: &'static str,
}

/// Where an engine keeps its models on disk.
///
/// `locate` walks a fixed candidate list (platform data dir, a dotted
/// home dir, the system share dir, a relative `./models` tree) and picks
/// the first directory that holds every required file.
pub struct ModelHome {
    pub subdir: &'static str,
    pub required: &'static [&'static str],
}

impl ModelHome {
    /// The directory downloads go to when no candidate has the models.
    pub fn download_dir(&self) -> PathBuf {
        dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(self.subdir)
            .join("models")
    }

    fn candidates(&self) -> Vec<PathBuf> {
        let mut dirs_to_try = Vec::new();
        if let Some(data) = dirs::data_dir() {
            dirs_to_try.push(data.join(self.subdir).join("models"));
        }
        if let Some(home) = dirs::home_dir() {
            dirs_to_try.push(home.join(format!(".{}", self.subdir)).join("models"));
        }
        dirs_to_try.push(PathBuf::from(format!("/usr/share/{}/models", self.subdir)));
        dirs_to_try.push(PathBuf::from(format!("./models/{}", self.subdir)));
        dirs_to_try
    }

    pub fn is_complete(&self, dir: &Path) -> bool {
        self.required.iter().all(|name| dir.join(name).exists())
    }

    /// First candidate directory holding every required file.
    pub fn locate(&self) -> Option<PathBuf> {
        self.candidates().into_iter().find(|dir| self.is_complete(dir))
    }
}

/// Download `model` into `dir` unless it is already there.
pub fn fetch_if_missing(model: &ModelFile, dir: &Path) -> Result<(), OcrError> {
    let dest = dir.join(model.filename);
    if dest.exists() {
        return Ok(());
    }
    eprintln!("Downloading {} (~{})...", model.filename, model.size_hint);
    fetch(model.url, &dest)?;
    eprintln!("  Downloaded {}", model.filename);
    Ok(())
}

/// Fetch a URL with whichever downloader is installed, curl before wget.
fn fetch(url: &str, dest: &Path) -> Result<(), OcrError> {
    let attempts: [(&str, &[&str]); 2] = [
        ("curl", &["-fSL", "--progress-bar", "-o"]),
        ("wget", &["-q", "--show-progress", "-O"]),
    ];

    for (tool, flags) in attempts {
        let run = Command::new(tool).args(flags).arg(dest).arg(url).status();
        match run {
            Ok(status) if status.success() => return Ok(()),
            Ok(_) => {
                // A partial file would shadow the retry forever.
                let _ = std::fs::remove_file(dest);
                return Err(OcrError::RecognitionFailed(format!(
                    "Failed to download {url}"
                )));
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => return Err(OcrError::Io(err)),
        }
    }

    Err(OcrError::EngineNotAvailable(
        "Neither curl nor wget found. Install one to download models.".to_string(),
    ))
}
