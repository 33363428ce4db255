//! Document models for versioned content storage.
//!
//! Documents are stored with content-addressable versioning; each version
//! carries the plain text produced by the extraction pipeline together with
//! the outcome of that run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Outcome of one extraction run over a version's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// Not extracted yet.
    Pending,
    Success,
    /// Final text was shorter than the configured minimum.
    TooShort,
    /// No extractor registered for the content type.
    UnsupportedType,
    /// The extractor or OCR machinery failed.
    EngineError,
}

impl ExtractionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::TooShort => "too_short",
            Self::UnsupportedType => "unsupported_type",
            Self::EngineError => "engine_error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "success" => Some(Self::Success),
            "too_short" => Some(Self::TooShort),
            "unsupported_type" => Some(Self::UnsupportedType),
            "engine_error" => Some(Self::EngineError),
            _ => None,
        }
    }
}

/// Text produced by one pipeline run.
///
/// The text is never null: failed runs carry an empty string so downstream
/// indexing code never has to special-case absence.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub text: String,
    pub outcome: ExtractionOutcome,
    /// Human-readable failure reason, for the activity log.
    pub failure: Option<String>,
}

impl Extraction {
    pub fn success(text: String) -> Self {
        Self {
            text,
            outcome: ExtractionOutcome::Success,
            failure: None,
        }
    }

    pub fn failure(outcome: ExtractionOutcome, reason: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            outcome,
            failure: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == ExtractionOutcome::Success
    }
}

/// One stored revision of a document's bytes.
///
/// Versions are keyed by SHA-256 content hash, so ingesting the same
/// bytes twice is detected as a duplicate rather than stored again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentVersion {
    /// Database row ID; insertion order is the rebuild scan order.
    pub id: i64,
    /// Owning document.
    pub document_id: String,
    /// SHA-256 hash of the content.
    pub content_hash: String,
    /// Where the stored bytes live on disk.
    pub file_path: PathBuf,
    /// Content length in bytes.
    pub file_size: u64,
    /// Normalized MIME type of the content.
    pub mime_type: String,
    /// Declared character encoding, if the source provided one.
    pub encoding: Option<String>,
    /// Extracted plain text. Empty until extraction runs, and empty again
    /// when extraction fails.
    pub text: String,
    /// Outcome of the last extraction run.
    pub outcome: ExtractionOutcome,
    /// Failure reason from the last extraction run, if any.
    pub error: Option<String>,
    /// When this version was stored.
    pub created_at: DateTime<Utc>,
}

impl DocumentVersion {
    /// Hex-encoded SHA-256 digest of `content`.
    pub fn compute_hash(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    /// Create a new unextracted version.
    pub fn new(
        document_id: String,
        content_hash: String,
        file_path: PathBuf,
        file_size: u64,
        mime_type: String,
        encoding: Option<String>,
    ) -> Self {
        Self {
            id: 0, // assigned on insert
            document_id,
            content_hash,
            file_path,
            file_size,
            mime_type,
            encoding,
            text: String::new(),
            outcome: ExtractionOutcome::Pending,
            error: None,
            created_at: Utc::now(),
        }
    }
}

/// A document with version history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier.
    pub id: String,
    /// Title, usually derived from the original filename.
    pub title: String,
    /// Content versions, newest first.
    pub versions: Vec<DocumentVersion>,
    /// First ingestion time.
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(id: String, title: String) -> Self {
        Self {
            id,
            title,
            versions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Get the most recent version.
    pub fn current_version(&self) -> Option<&DocumentVersion> {
        self.versions.first()
    }

    /// Prepend `version` unless its hash matches the current version.
    /// Returns whether the version was kept.
    pub fn add_version(&mut self, version: DocumentVersion) -> bool {
        if let Some(current) = self.current_version() {
            if current.content_hash == version.content_hash {
                return false;
            }
        }

        self.versions.insert(0, version);
        true
    }
}

/// One entry in a version's activity log.
///
/// Extraction failures land here so the document stays usable while an
/// operator can still see why it is missing from search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub version_id: i64,
    pub event: String,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}
