//! Configuration management for textmill.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Database file created inside the data directory.
pub const DEFAULT_DATABASE_FILENAME: &str = "textmill.db";

/// Subdirectory holding stored document bytes.
const DOCUMENTS_SUBDIR: &str = "documents";

/// Primary search index subdirectory name.
const INDEX_SUBDIR: &str = "index";

/// Spell dictionary index subdirectory name.
const SPELL_SUBDIR: &str = "spell";

fn default_extractors() -> Vec<String> {
    ["plain", "html", "pdf", "office", "mail"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_min_chars() -> usize {
    16
}

fn default_rebuild_batch_size() -> usize {
    300
}

/// Extraction pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Extractor identifiers to register at startup; unknown ids are
    /// skipped with a warning.
    #[serde(default = "default_extractors")]
    pub extractors: Vec<String>,
    /// Minimum trimmed character count for extracted text. Anything
    /// shorter is treated as a failed extraction.
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
    /// Treat every PDF text layer as absent and OCR embedded images.
    #[serde(default)]
    pub force_ocr: bool,
    /// Rows per flush during full index rebuilds.
    #[serde(default = "default_rebuild_batch_size")]
    pub rebuild_batch_size: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            extractors: default_extractors(),
            min_chars: default_min_chars(),
            force_ocr: false,
            rebuild_batch_size: default_rebuild_batch_size(),
        }
    }
}

impl ExtractionConfig {
    pub fn is_default(&self) -> bool {
        self.extractors == default_extractors()
            && self.min_chars == default_min_chars()
            && !self.force_ocr
            && self.rebuild_batch_size == default_rebuild_batch_size()
    }
}

fn default_ocr_engines() -> Vec<String> {
    vec!["tesseract".to_string()]
}

fn default_ocr_timeout_secs() -> u64 {
    120
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

/// OCR engine configuration.
///
/// `engines` is the set of enabled engine identifiers; the chain's own
/// fixed priority order decides which one actually runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_ocr_engines")]
    pub engines: Vec<String>,
    /// Per-image OCR timeout in seconds.
    #[serde(default = "default_ocr_timeout_secs")]
    pub timeout_secs: u64,
    /// Tesseract language code.
    #[serde(default = "default_ocr_language")]
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engines: default_ocr_engines(),
            timeout_secs: default_ocr_timeout_secs(),
            language: default_ocr_language(),
        }
    }
}

impl OcrConfig {
    pub fn is_default(&self) -> bool {
        self.engines == default_ocr_engines()
            && self.timeout_secs == default_ocr_timeout_secs()
            && self.language == default_ocr_language()
    }
}

/// Resolved runtime settings after file values and CLI overrides.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root directory the other paths hang off.
    pub data_dir: PathBuf,
    /// SQLite database filename inside `data_dir`.
    pub database_filename: String,
    /// Directory for storing document content.
    pub documents_dir: PathBuf,
    /// Primary search index directory.
    pub index_dir: PathBuf,
    /// Spell dictionary index directory.
    pub spell_index_dir: PathBuf,
    /// Extraction pipeline settings.
    pub extraction: ExtractionConfig,
    /// OCR settings.
    pub ocr: OcrConfig,
}

impl Default for Settings {
    fn default() -> Self {
        // Falls back gracefully: data dir -> home dir -> current dir
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("textmill");

        Self::with_data_dir(data_dir)
    }
}

impl Settings {
    /// Create settings rooted at a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            documents_dir: data_dir.join(DOCUMENTS_SUBDIR),
            index_dir: data_dir.join(INDEX_SUBDIR),
            spell_index_dir: data_dir.join(SPELL_SUBDIR),
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            extraction: ExtractionConfig::default(),
            ocr: OcrConfig::default(),
        }
    }

    /// Get the full path to the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Check whether `init` appears to have run.
    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Create any data directories that do not exist yet.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for (dir, label) in [
            (&self.data_dir, "data directory"),
            (&self.documents_dir, "documents directory"),
            (&self.index_dir, "index directory"),
            (&self.spell_index_dir, "spell index directory"),
        ] {
            std::fs::create_dir_all(dir).map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!("Failed to create {} '{}': {}", label, dir.display(), e),
                )
            })?;
        }
        Ok(())
    }
}

/// Shape of the on-disk config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory, possibly relative to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "target")]
    pub data_dir: Option<String>,
    /// Alternate database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Extraction pipeline configuration.
    #[serde(default, skip_serializing_if = "ExtractionConfig::is_default")]
    pub extraction: ExtractionConfig,
    /// OCR engine configuration.
    #[serde(default, skip_serializing_if = "OcrConfig::is_default")]
    pub ocr: OcrConfig,
    /// Where this config was read from; never written back out.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Read a config file, picking the parser from its extension.
    /// TOML is the default when the extension is unknown.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("could not read config file: {e}"))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

        let mut config: Config = match ext {
            "yaml" | "yml" => {
                serde_yaml::from_str(&contents).map_err(|e| format!("invalid YAML config: {e}"))?
            }
            "json" => {
                serde_json::from_str(&contents).map_err(|e| format!("invalid JSON config: {e}"))?
            }
            _ => toml::from_str(&contents).map_err(|e| format!("invalid TOML config: {e}"))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory relative config paths resolve against.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Expand `~`, then join relative paths onto `base_dir`. Absolute
    /// paths pass through untouched.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Fold file values into `settings`.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            let resolved = self.resolve_path(data_dir, base_dir);
            let database_filename = settings.database_filename.clone();
            *settings = Settings::with_data_dir(resolved);
            settings.database_filename = database_filename;
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        settings.extraction = self.extraction.clone();
        settings.ocr = self.ocr.clone();
    }
}

/// Look for a config file next to the data directory.
fn find_config_near(data_dir: &Path) -> Option<PathBuf> {
    let extensions = ["toml", "yaml", "yml", "json"];
    let basenames = ["textmill", "config"];

    for basename in basenames {
        for ext in extensions {
            let path = data_dir.join(format!("{}.{}", basename, ext));
            if path.exists() {
                return Some(path);
            }
        }
    }
    None
}

/// Settings-loading knobs fed from the global CLI flags.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file, skipping discovery.
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of the config file directory.
    pub use_cwd: bool,
    /// Data directory override (--data-dir flag).
    pub data_dir: Option<PathBuf>,
}

/// Load settings with explicit options. Returns (Settings, Config).
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let data_dir_override = options.data_dir.as_ref().map(|d| {
        if d.is_absolute() {
            d.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(d)
        }
    });

    // Explicit --config wins, then a config file inside the data dir
    // (the overridden one first, the default one otherwise).
    let discovered = data_dir_override
        .as_deref()
        .and_then(find_config_near)
        .or_else(|| find_config_near(&Settings::default().data_dir));

    let config = if let Some(ref config_path) = options.config_path {
        Config::load_from_path(config_path)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("{}", e);
                Config::default()
            })
    } else if let Some(found) = discovered {
        tracing::debug!("Found config in data dir: {}", found.display());
        Config::load_from_path(&found)
            .await
            .unwrap_or_else(|_| Config::default())
    } else {
        Config::default()
    };

    let mut settings = Settings::default();

    let base_dir = if options.use_cwd {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    } else {
        config
            .base_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    };

    config.apply_to_settings(&mut settings, &base_dir);

    // --data-dir override takes precedence over everything from the file
    if let Some(data_dir) = data_dir_override {
        let extraction = settings.extraction.clone();
        let ocr = settings.ocr.clone();
        let database_filename = settings.database_filename.clone();
        settings = Settings::with_data_dir(data_dir);
        settings.extraction = extraction;
        settings.ocr = ocr;
        settings.database_filename = database_filename;
    }

    (settings, config)
}
