//! Setup code the commands share.

use std::sync::Arc;

use crate::config::Settings;
use crate::extract::ExtractionPipeline;
use crate::index::{check_on_startup, IndexRebuilder, SearchIndex, SpellIndex};
use crate::services::IndexingService;
use crate::store::VersionStore;

/// Everything an index-touching command needs.
pub struct Stack {
    pub store: VersionStore,
    pub pipeline: Arc<ExtractionPipeline>,
    pub index: Arc<SearchIndex>,
    pub spell: Arc<SpellIndex>,
    pub rebuilder: IndexRebuilder,
}

impl Stack {
    pub fn service(&self, settings: &Settings) -> IndexingService {
        IndexingService::new(
            self.store.clone(),
            self.pipeline.clone(),
            self.index.clone(),
            self.spell.clone(),
            settings.documents_dir.clone(),
        )
    }
}

/// Open the store, pipeline, and both indexes.
///
/// With `startup_check` the consistency check runs before the stack is
/// handed out, rebuilding the search index from the store when it comes up
/// empty. `check` skips it to run and report the check on its own terms;
/// `rebuild` skips it because it rebuilds unconditionally anyway.
pub fn open_stack(settings: &Settings, startup_check: bool) -> anyhow::Result<Stack> {
    if !settings.database_exists() {
        anyhow::bail!(
            "no database at {} (run `tmill init` first)",
            settings.database_path().display()
        );
    }

    let store = VersionStore::open(&settings.database_path())?;
    store.init_schema()?;

    let pipeline = Arc::new(ExtractionPipeline::from_settings(settings));
    let index = Arc::new(SearchIndex::open_or_create(&settings.index_dir)?);
    let spell = Arc::new(SpellIndex::open_or_create(&settings.spell_index_dir)?);
    let rebuilder = IndexRebuilder::new(settings.extraction.rebuild_batch_size);

    if startup_check {
        check_on_startup(&store, &index, &spell, &rebuilder)?;
    }

    Ok(Stack {
        store,
        pipeline,
        index,
        spell,
        rebuilder,
    })
}
