//! Startup consistency check between the version store and the indexes.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::store::VersionStore;

use super::{IndexError, IndexRebuilder, SearchIndex, SpellIndex};

/// Rebuild both indexes when the primary index comes up empty.
///
/// An empty index next to a populated store means the index directory was
/// lost or wiped; on an actually fresh install the rebuild is a no-op. A
/// failed index rebuild is fatal here, a failed spell rebuild is not.
pub fn check_on_startup(
    store: &VersionStore,
    index: &SearchIndex,
    spell: &SpellIndex,
    rebuilder: &IndexRebuilder,
) -> Result<(), IndexError> {
    let docs = index.num_docs()?;
    if docs > 0 {
        debug!(docs, "search index populated, skipping consistency rebuild");
        return Ok(());
    }

    warn!("search index is empty, rebuilding from the version store");
    let started = Instant::now();
    let summary = rebuilder
        .rebuild_all(store, index)
        .map_err(|err| IndexError::RebuildFailed(err.to_string()))?;
    info!(
        versions = summary.versions,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "consistency rebuild complete"
    );

    if let Err(err) = spell.rebuild_full(index) {
        warn!(error = %err, "spell dictionary rebuild failed");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, DocumentVersion, Extraction};

    fn seeded_store(count: usize) -> VersionStore {
        let store = VersionStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        let doc = Document::new("doc-1".to_string(), "Seeded".to_string());
        store.insert_document(&doc).unwrap();
        for i in 0..count {
            let version = DocumentVersion::new(
                "doc-1".to_string(),
                format!("hash-{i}"),
                "/tmp/x".into(),
                10,
                "text/plain".to_string(),
                None,
            );
            let id = store.insert_version(&version).unwrap();
            store
                .set_version_extraction(
                    id,
                    &Extraction::success(format!("searchable body number {i}")),
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn empty_index_triggers_rebuild() {
        let store = seeded_store(4);
        let index_dir = tempfile::tempdir().unwrap();
        let spell_dir = tempfile::tempdir().unwrap();
        let index = SearchIndex::open_or_create(index_dir.path()).unwrap();
        let spell = SpellIndex::open_or_create(spell_dir.path()).unwrap();

        check_on_startup(&store, &index, &spell, &IndexRebuilder::new(2)).unwrap();

        assert_eq!(index.num_docs().unwrap(), 4);
        assert!(spell.num_words().unwrap() > 0);
        assert!(spell
            .suggest("searchable", 5)
            .unwrap()
            .contains(&"searchable".to_string()));
    }

    #[test]
    fn populated_index_is_left_alone() {
        let store = seeded_store(4);
        let index_dir = tempfile::tempdir().unwrap();
        let spell_dir = tempfile::tempdir().unwrap();
        let index = SearchIndex::open_or_create(index_dir.path()).unwrap();
        let spell = SpellIndex::open_or_create(spell_dir.path()).unwrap();

        // an entry the store does not know about; a rebuild would drop it
        let ghost = DocumentVersion {
            id: 999,
            text: "ghost entry contents".to_string(),
            ..DocumentVersion::new(
                "doc-ghost".to_string(),
                "hash-ghost".to_string(),
                "/tmp/x".into(),
                1,
                "text/plain".to_string(),
                None,
            )
        };
        index.index_version(&ghost, "Ghost").unwrap();

        check_on_startup(&store, &index, &spell, &IndexRebuilder::new(2)).unwrap();

        assert_eq!(index.num_docs().unwrap(), 1);
        assert_eq!(index.search("ghost", 10).unwrap().len(), 1);
    }

    #[test]
    fn fresh_install_rebuild_is_a_noop() {
        let store = seeded_store(0);
        let index_dir = tempfile::tempdir().unwrap();
        let spell_dir = tempfile::tempdir().unwrap();
        let index = SearchIndex::open_or_create(index_dir.path()).unwrap();
        let spell = SpellIndex::open_or_create(spell_dir.path()).unwrap();

        check_on_startup(&store, &index, &spell, &IndexRebuilder::new(2)).unwrap();

        assert_eq!(index.num_docs().unwrap(), 0);
        assert_eq!(spell.num_words().unwrap(), 0);
    }
}
