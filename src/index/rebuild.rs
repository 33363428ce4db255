//! Full index rebuild from the version store.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::store::VersionStore;

use super::{IndexError, SearchIndex};

/// What a completed rebuild did.
#[derive(Debug, Clone)]
pub struct RebuildSummary {
    /// Versions written to the index.
    pub versions: u64,
    /// Intermediate flushes, one per full batch.
    pub flushes: u64,
    pub elapsed: Duration,
}

/// Re-derives the primary index from the store, batch by batch.
///
/// The writer is held for the whole rebuild, serializing against
/// incremental indexing. Versions are scanned in insertion order with
/// keyset pagination so the corpus is never materialized in memory.
pub struct IndexRebuilder {
    batch_size: usize,
}

impl IndexRebuilder {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn rebuild_all(
        &self,
        store: &VersionStore,
        index: &SearchIndex,
    ) -> Result<RebuildSummary, IndexError> {
        let started = Instant::now();

        let total = store.count_versions()?;
        info!(total, "rebuilding search index");

        let mut writer = index.writer();
        writer.delete_all_documents()?;
        writer.commit()?;
        index.merge_segments(&mut writer)?;

        let mut last_id = 0i64;
        let mut indexed = 0u64;
        let mut flushes = 0u64;

        loop {
            let batch = store.scan_versions_after(last_id, self.batch_size)?;
            let Some(last_row) = batch.last() else {
                break;
            };
            last_id = last_row.version.id;

            for row in &batch {
                writer.add_document(index.version_document(&row.version, &row.title))?;
                indexed += 1;
            }

            writer.commit()?;
            flushes += 1;
            debug!(indexed, total, "rebuild progress");
        }

        writer.commit()?;
        index.merge_segments(&mut writer)?;

        let summary = RebuildSummary {
            versions: indexed,
            flushes,
            elapsed: started.elapsed(),
        };
        info!(
            versions = summary.versions,
            flushes = summary.flushes,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "search index rebuilt"
        );
        Ok(summary)
    }
}
