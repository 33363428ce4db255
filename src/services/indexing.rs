//! Ingestion and batch extraction service.
//!
//! Owns the store + pipeline + index wiring: ingest a file, run extraction,
//! persist the text, keep both indexes current. Blocking extraction work
//! always runs inside `spawn_blocking`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::extract::ExtractionPipeline;
use crate::index::{SearchIndex, SpellIndex};
use crate::models::{Document, DocumentVersion, Extraction, ExtractionOutcome};
use crate::storage;
use crate::store::VersionStore;
use crate::utils::detect_mime;

/// Events emitted while processing pending versions.
#[derive(Debug, Clone)]
pub enum IndexEvent {
    BatchStarted {
        total: usize,
    },
    VersionStarted {
        version_id: i64,
        title: String,
    },
    /// Extraction ran to completion; the outcome may still be a failure.
    VersionCompleted {
        version_id: i64,
        outcome: ExtractionOutcome,
    },
    /// The store or index rejected the version.
    VersionFailed {
        version_id: i64,
        error: String,
    },
    BatchComplete {
        processed: usize,
        succeeded: usize,
        failed: usize,
    },
}

/// Counters from one `process_pending` run.
#[derive(Debug, Clone, Copy)]
pub struct ProcessSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// What ingesting one file did.
#[derive(Debug)]
pub enum IngestOutcome {
    Ingested {
        document_id: String,
        version_id: i64,
        extraction: Extraction,
    },
    /// Content with the same hash is already stored.
    Duplicate {
        version_id: i64,
    },
}

/// Service for turning stored content into indexed text.
#[derive(Clone)]
pub struct IndexingService {
    store: VersionStore,
    pipeline: Arc<ExtractionPipeline>,
    index: Arc<SearchIndex>,
    spell: Arc<SpellIndex>,
    documents_dir: PathBuf,
}

impl IndexingService {
    pub fn new(
        store: VersionStore,
        pipeline: Arc<ExtractionPipeline>,
        index: Arc<SearchIndex>,
        spell: Arc<SpellIndex>,
        documents_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            pipeline,
            index,
            spell,
            documents_dir,
        }
    }

    /// Ingest one file: hash, dedupe, store content, create document and
    /// version rows, then extract and index.
    pub async fn ingest_file(
        &self,
        path: &Path,
        title: Option<&str>,
    ) -> anyhow::Result<IngestOutcome> {
        let content = tokio::fs::read(path).await?;
        let hash = DocumentVersion::compute_hash(&content);

        if let Some(existing) = self.store.find_version_by_hash(&hash)? {
            return Ok(IngestOutcome::Duplicate {
                version_id: existing.id,
            });
        }

        let title = match title {
            Some(title) => title.to_string(),
            None => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "untitled".to_string()),
        };
        let mime_type = detect_mime(&content, path);
        let stored_path = storage::store_content(&content, &mime_type, &title, &self.documents_dir)?;

        let document = Document::new(Uuid::new_v4().to_string(), title);
        self.store.insert_document(&document)?;
        let version = DocumentVersion::new(
            document.id.clone(),
            hash,
            stored_path,
            content.len() as u64,
            mime_type,
            None,
        );
        let version_id = self.store.insert_version(&version)?;

        let extraction = self.process_version(version_id).await?;
        Ok(IngestOutcome::Ingested {
            document_id: document.id,
            version_id,
            extraction,
        })
    }

    /// Extract one version, persist its text and outcome, and update both
    /// indexes. An extraction failure is persisted and recorded as an
    /// activity entry, never returned as an error.
    pub async fn process_version(&self, version_id: i64) -> anyhow::Result<Extraction> {
        let service = self.clone();
        let extraction =
            tokio::task::spawn_blocking(move || service.process_version_blocking(version_id))
                .await??;
        Ok(extraction)
    }

    fn process_version_blocking(&self, version_id: i64) -> anyhow::Result<Extraction> {
        let mut version = self.store.get_version(version_id)?;

        let extraction = self.pipeline.extract(
            &version.file_path,
            &version.mime_type,
            version.encoding.as_deref(),
        );
        self.store.set_version_extraction(version_id, &extraction)?;

        if extraction.is_success() {
            version.text = extraction.text.clone();
            version.outcome = extraction.outcome;
            let title = self.version_title(version_id);
            // The row is already persisted; a failed index write is
            // recoverable by rebuild, so it only warns.
            if let Err(err) = self.index.index_version(&version, &title) {
                warn!(version_id, error = %err, "index update failed");
            }
            self.spell.update_incremental(&extraction.text);
        } else {
            self.store.record_activity(
                version_id,
                "extraction_failed",
                extraction.failure.as_deref(),
            )?;
        }

        Ok(extraction)
    }

    fn version_title(&self, version_id: i64) -> String {
        self.store
            .version_meta(&[version_id])
            .ok()
            .and_then(|metas| metas.into_iter().next())
            .map(|meta| meta.title)
            .unwrap_or_default()
    }

    /// Count of versions still waiting for extraction.
    pub fn count_pending(&self) -> anyhow::Result<u64> {
        Ok(self.store.count_pending()?)
    }

    /// Extract and index all pending versions across blocking workers.
    pub async fn process_pending(
        &self,
        workers: usize,
        limit: usize,
        event_tx: mpsc::Sender<IndexEvent>,
    ) -> anyhow::Result<ProcessSummary> {
        let workers = workers.max(1);
        let total = self.store.count_pending()? as usize;
        let effective_limit = if limit > 0 { limit.min(total) } else { total };

        let _ = event_tx
            .send(IndexEvent::BatchStarted {
                total: effective_limit,
            })
            .await;

        let processed = Arc::new(AtomicUsize::new(0));
        let succeeded = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));

        let batch_size = workers * 4;
        let mut offset = 0;

        while offset < effective_limit {
            let batch_limit = (effective_limit - offset).min(batch_size);
            let versions = self.store.versions_pending(batch_limit)?;
            if versions.is_empty() {
                break;
            }

            let mut handles = Vec::with_capacity(versions.len().min(workers));

            for version in versions {
                if processed.load(Ordering::Relaxed) >= effective_limit {
                    break;
                }

                let service = self.clone();
                let processed = processed.clone();
                let succeeded = succeeded.clone();
                let failed = failed.clone();
                let event_tx = event_tx.clone();

                let handle = tokio::task::spawn_blocking(move || {
                    let version_id = version.id;
                    let title = service.version_title(version_id);

                    // Blocking send: this closure runs outside the runtime
                    let _ = futures::executor::block_on(
                        event_tx.send(IndexEvent::VersionStarted { version_id, title }),
                    );

                    match service.process_version_blocking(version_id) {
                        Ok(extraction) => {
                            if extraction.is_success() {
                                succeeded.fetch_add(1, Ordering::Relaxed);
                            } else {
                                failed.fetch_add(1, Ordering::Relaxed);
                            }
                            let _ = futures::executor::block_on(event_tx.send(
                                IndexEvent::VersionCompleted {
                                    version_id,
                                    outcome: extraction.outcome,
                                },
                            ));
                        }
                        Err(err) => {
                            warn!(version_id, error = %err, "version processing failed");
                            failed.fetch_add(1, Ordering::Relaxed);
                            let _ = futures::executor::block_on(event_tx.send(
                                IndexEvent::VersionFailed {
                                    version_id,
                                    error: err.to_string(),
                                },
                            ));
                        }
                    }

                    processed.fetch_add(1, Ordering::Relaxed);
                });

                handles.push(handle);

                if handles.len() >= workers {
                    for handle in handles.drain(..) {
                        let _ = handle.await;
                    }
                }
            }

            for handle in handles {
                let _ = handle.await;
            }

            offset += batch_limit;
        }

        let summary = ProcessSummary {
            processed: processed.load(Ordering::Relaxed),
            succeeded: succeeded.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
        };

        let _ = event_tx
            .send(IndexEvent::BatchComplete {
                processed: summary.processed,
                succeeded: summary.succeeded,
                failed: summary.failed,
            })
            .await;

        Ok(summary)
    }
}
