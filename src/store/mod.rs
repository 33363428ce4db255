//! SQLite-backed persistence for documents, versions, and activity history.
//!
//! A single [`VersionStore`] wraps the connection behind a mutex so the
//! indexing workers can share it across threads. Version rows are scanned
//! with keyset pagination (`WHERE id > ? ORDER BY id`) so a full rebuild
//! never materializes the corpus in memory.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use thiserror::Error;

use crate::models::{ActivityEntry, Document, DocumentVersion, Extraction, ExtractionOutcome};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id          TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS versions (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id   TEXT NOT NULL REFERENCES documents(id),
    content_hash  TEXT NOT NULL,
    file_path     TEXT NOT NULL,
    file_size     INTEGER NOT NULL,
    mime_type     TEXT NOT NULL,
    encoding      TEXT,
    text          TEXT NOT NULL DEFAULT '',
    outcome       TEXT NOT NULL DEFAULT 'pending',
    error         TEXT,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS activities (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id  INTEGER NOT NULL REFERENCES versions(id),
    event       TEXT NOT NULL,
    detail      TEXT,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_versions_document ON versions(document_id);
CREATE INDEX IF NOT EXISTS idx_versions_hash ON versions(content_hash);
CREATE INDEX IF NOT EXISTS idx_versions_outcome ON versions(outcome);
CREATE INDEX IF NOT EXISTS idx_activities_version ON activities(version_id);
"#;

/// Shared handle to the SQLite database.
#[derive(Clone)]
pub struct VersionStore {
    conn: Arc<Mutex<Connection>>,
}

impl VersionStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create all tables and indexes if they do not exist yet.
    pub fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn insert_document(&self, doc: &Document) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO documents (id, title, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET title = excluded.title",
            params![doc.id, doc.title, doc.created_at],
        )?;
        Ok(())
    }

    /// Insert a version row and return its rowid.
    pub fn insert_version(&self, version: &DocumentVersion) -> Result<i64, StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO versions
                (document_id, content_hash, file_path, file_size, mime_type,
                 encoding, text, outcome, error, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                version.document_id,
                version.content_hash,
                version.file_path.to_string_lossy(),
                version.file_size as i64,
                version.mime_type,
                version.encoding,
                version.text,
                version.outcome.as_str(),
                version.error,
                version.created_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT id, title, created_at FROM documents WHERE id = ?1")?;
        let doc = stmt
            .query_row(params![id], |row| {
                Ok(Document {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    versions: Vec::new(),
                    created_at: row.get(2)?,
                })
            })
            .map(Some)
            .or_else(ignore_not_found)?;

        let Some(mut doc) = doc else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT id, document_id, content_hash, file_path, file_size, mime_type,
                    encoding, text, outcome, error, created_at
             FROM versions WHERE document_id = ?1 ORDER BY id DESC",
        )?;
        let versions = stmt.query_map(params![id], row_to_version)?;
        for version in versions {
            doc.versions.push(version?);
        }
        Ok(Some(doc))
    }

    pub fn get_version(&self, id: i64) -> Result<DocumentVersion, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, document_id, content_hash, file_path, file_size, mime_type,
                    encoding, text, outcome, error, created_at
             FROM versions WHERE id = ?1",
        )?;
        stmt.query_row(params![id], row_to_version)
            .map(Some)
            .or_else(ignore_not_found)?
            .ok_or_else(|| StoreError::NotFound(format!("version {id}")))
    }

    pub fn find_version_by_hash(&self, hash: &str) -> Result<Option<DocumentVersion>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, document_id, content_hash, file_path, file_size, mime_type,
                    encoding, text, outcome, error, created_at
             FROM versions WHERE content_hash = ?1 LIMIT 1",
        )?;
        let found = stmt
            .query_row(params![hash], row_to_version)
            .map(Some)
            .or_else(ignore_not_found)?;
        Ok(found)
    }

    pub fn count_documents(&self) -> Result<u64, StoreError> {
        let conn = self.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn count_versions(&self) -> Result<u64, StoreError> {
        let conn = self.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM versions", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn count_pending(&self) -> Result<u64, StoreError> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM versions WHERE outcome = 'pending'",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Keyset scan over all versions in insertion order, joined with the
    /// owning document's title. Pass the last seen rowid (0 to start) and
    /// receive at most `limit` rows after it.
    pub fn scan_versions_after(
        &self,
        last_id: i64,
        limit: usize,
    ) -> Result<Vec<VersionRow>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT v.id, v.document_id, v.content_hash, v.file_path, v.file_size,
                    v.mime_type, v.encoding, v.text, v.outcome, v.error, v.created_at,
                    d.title
             FROM versions v JOIN documents d ON d.id = v.document_id
             WHERE v.id > ?1 ORDER BY v.id LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![last_id, limit as i64], |row| {
            Ok(VersionRow {
                version: row_to_version(row)?,
                title: row.get(11)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Versions that have not been through extraction yet, oldest first.
    pub fn versions_pending(&self, limit: usize) -> Result<Vec<DocumentVersion>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, document_id, content_hash, file_path, file_size, mime_type,
                    encoding, text, outcome, error, created_at
             FROM versions WHERE outcome = 'pending' ORDER BY id LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_version)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Persist the result of an extraction attempt on a version.
    pub fn set_version_extraction(
        &self,
        version_id: i64,
        extraction: &Extraction,
    ) -> Result<(), StoreError> {
        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE versions SET text = ?1, outcome = ?2, error = ?3 WHERE id = ?4",
            params![
                extraction.text,
                extraction.outcome.as_str(),
                extraction.failure,
                version_id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("version {version_id}")));
        }
        Ok(())
    }

    pub fn record_activity(
        &self,
        version_id: i64,
        event: &str,
        detail: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO activities (version_id, event, detail, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![version_id, event, detail, Utc::now()],
        )?;
        Ok(())
    }

    pub fn list_activities(&self, version_id: i64) -> Result<Vec<ActivityEntry>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, version_id, event, detail, created_at
             FROM activities WHERE version_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![version_id], |row| {
            Ok(ActivityEntry {
                id: row.get(0)?,
                version_id: row.get(1)?,
                event: row.get(2)?,
                detail: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Document id and title for each version id, used to render search hits.
    pub fn version_meta(&self, version_ids: &[i64]) -> Result<Vec<VersionMeta>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT v.id, v.document_id, d.title, v.mime_type, v.created_at
             FROM versions v JOIN documents d ON d.id = v.document_id
             WHERE v.id = ?1",
        )?;
        let mut out = Vec::with_capacity(version_ids.len());
        for id in version_ids {
            let meta = stmt
                .query_row(params![id], |row| {
                    Ok(VersionMeta {
                        version_id: row.get(0)?,
                        document_id: row.get(1)?,
                        title: row.get(2)?,
                        mime_type: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })
                .map(Some)
                .or_else(ignore_not_found)?;
            if let Some(meta) = meta {
                out.push(meta);
            }
        }
        Ok(out)
    }
}

/// A version row joined with its document title, as indexed.
#[derive(Debug, Clone)]
pub struct VersionRow {
    pub version: DocumentVersion,
    pub title: String,
}

/// Display metadata for a version, joined with its document.
#[derive(Debug, Clone)]
pub struct VersionMeta {
    pub version_id: i64,
    pub document_id: String,
    pub title: String,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

fn row_to_version(row: &Row<'_>) -> rusqlite::Result<DocumentVersion> {
    let path: String = row.get(3)?;
    let size: i64 = row.get(4)?;
    let outcome: String = row.get(8)?;
    Ok(DocumentVersion {
        id: row.get(0)?,
        document_id: row.get(1)?,
        content_hash: row.get(2)?,
        file_path: path.into(),
        file_size: size as u64,
        mime_type: row.get(5)?,
        encoding: row.get(6)?,
        text: row.get(7)?,
        // unknown outcome strings requeue the version as pending
        outcome: ExtractionOutcome::from_str(&outcome).unwrap_or(ExtractionOutcome::Pending),
        error: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn ignore_not_found<T>(err: rusqlite::Error) -> Result<Option<T>, rusqlite::Error> {
    match err {
        rusqlite::Error::QueryReturnedNoRows => Ok(None),
        other => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionOutcome;

    fn store() -> VersionStore {
        let store = VersionStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        store
    }

    fn sample_version(doc_id: &str, hash: &str) -> DocumentVersion {
        DocumentVersion::new(
            doc_id.to_string(),
            hash.to_string(),
            "/tmp/sample.pdf".into(),
            1024,
            "application/pdf".to_string(),
            None,
        )
    }

    fn seed_document(store: &VersionStore, doc_id: &str, hash: &str) -> i64 {
        let doc = Document::new(doc_id.to_string(), format!("Title for {doc_id}"));
        store.insert_document(&doc).unwrap();
        store.insert_version(&sample_version(doc_id, hash)).unwrap()
    }

    #[test]
    fn insert_and_fetch_document_with_versions() {
        let store = store();
        let id = seed_document(&store, "doc-1", "aaaa");

        let doc = store.get_document("doc-1").unwrap().unwrap();
        assert_eq!(doc.title, "Title for doc-1");
        assert_eq!(doc.versions.len(), 1);
        assert_eq!(doc.versions[0].id, id);
        assert_eq!(doc.versions[0].outcome, ExtractionOutcome::Pending);
    }

    #[test]
    fn missing_document_is_none() {
        let store = store();
        assert!(store.get_document("absent").unwrap().is_none());
    }

    #[test]
    fn find_version_by_hash_dedupes() {
        let store = store();
        seed_document(&store, "doc-1", "cafe01");

        let found = store.find_version_by_hash("cafe01").unwrap();
        assert!(found.is_some());
        assert!(store.find_version_by_hash("beef02").unwrap().is_none());
    }

    #[test]
    fn set_extraction_updates_row() {
        let store = store();
        let id = seed_document(&store, "doc-1", "aaaa");

        let extraction = Extraction::success("extracted body".to_string());
        store.set_version_extraction(id, &extraction).unwrap();

        let version = store.get_version(id).unwrap();
        assert_eq!(version.text, "extracted body");
        assert_eq!(version.outcome, ExtractionOutcome::Success);
        assert!(version.error.is_none());
    }

    #[test]
    fn set_extraction_on_missing_version_is_not_found() {
        let store = store();
        let extraction = Extraction::success("body".to_string());
        let err = store.set_version_extraction(42, &extraction).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn failed_extraction_persists_reason() {
        let store = store();
        let id = seed_document(&store, "doc-1", "aaaa");

        let extraction =
            Extraction::failure(ExtractionOutcome::EngineError, "pdftotext exited with 1");
        store.set_version_extraction(id, &extraction).unwrap();

        let version = store.get_version(id).unwrap();
        assert_eq!(version.text, "");
        assert_eq!(version.outcome, ExtractionOutcome::EngineError);
        assert_eq!(version.error.as_deref(), Some("pdftotext exited with 1"));
    }

    #[test]
    fn keyset_scan_walks_in_insertion_order() {
        let store = store();
        let doc = Document::new("doc-1".to_string(), "Scanned".to_string());
        store.insert_document(&doc).unwrap();
        for i in 0..5 {
            store
                .insert_version(&sample_version("doc-1", &format!("hash-{i}")))
                .unwrap();
        }

        let first = store.scan_versions_after(0, 2).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].title, "Scanned");
        let second = store.scan_versions_after(first[1].version.id, 2).unwrap();
        assert_eq!(second.len(), 2);
        assert!(second[0].version.id > first[1].version.id);
        let tail = store.scan_versions_after(second[1].version.id, 2).unwrap();
        assert_eq!(tail.len(), 1);
        let done = store.scan_versions_after(tail[0].version.id, 2).unwrap();
        assert!(done.is_empty());
    }

    #[test]
    fn pending_scan_skips_processed_versions() {
        let store = store();
        let first = seed_document(&store, "doc-1", "aaaa");
        let doc = Document::new("doc-2".to_string(), "Second".to_string());
        store.insert_document(&doc).unwrap();
        let second = store.insert_version(&sample_version("doc-2", "bbbb")).unwrap();

        store
            .set_version_extraction(first, &Extraction::success("done".to_string()))
            .unwrap();

        let pending = store.versions_pending(10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second);
        assert_eq!(store.count_pending().unwrap(), 1);
    }

    #[test]
    fn activities_round_trip() {
        let store = store();
        let id = seed_document(&store, "doc-1", "aaaa");

        store
            .record_activity(id, "extraction_failed", Some("too few characters"))
            .unwrap();
        store.record_activity(id, "indexed", None).unwrap();

        let entries = store.list_activities(id).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event, "extraction_failed");
        assert_eq!(entries[0].detail.as_deref(), Some("too few characters"));
        assert_eq!(entries[1].event, "indexed");
    }

    #[test]
    fn version_meta_joins_titles() {
        let store = store();
        let id = seed_document(&store, "doc-1", "aaaa");

        let meta = store.version_meta(&[id, 999]).unwrap();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].document_id, "doc-1");
        assert_eq!(meta[0].title, "Title for doc-1");
    }
}
