//! Full-text search over extracted document text.
//!
//! Two tantivy indexes live side by side: the primary index over version
//! text and titles, and a secondary spell dictionary derived from it. The
//! startup consistency check rebuilds both from the store when the primary
//! index comes up empty.

mod consistency;
mod rebuild;
mod spell;

pub use consistency::check_on_startup;
pub use rebuild::{IndexRebuilder, RebuildSummary};
pub use spell::SpellIndex;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, TantivyDocument, Value, INDEXED, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexWriter, ReloadPolicy, TantivyError, Term};
use thiserror::Error;

use crate::models::DocumentVersion;
use crate::store::StoreError;

/// Heap given to each index writer.
const WRITER_HEAP_BYTES: usize = 50_000_000;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index error: {0}")]
    Tantivy(#[from] TantivyError),

    #[error("query error: {0}")]
    Query(#[from] tantivy::query::QueryParserError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("index rebuild failed: {0}")]
    RebuildFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

struct SearchFields {
    version_id: Field,
    document_id: Field,
    title: Field,
    text: Field,
}

/// One search hit, resolved to a version rowid.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub version_id: i64,
    pub score: f32,
}

/// The primary full-text index over document versions.
///
/// Holds the single long-lived writer behind a mutex; readers are opened
/// per call and dropped with scope.
pub struct SearchIndex {
    index: Index,
    fields: SearchFields,
    writer: Mutex<IndexWriter>,
}

impl SearchIndex {
    /// Open the index at `dir`, creating it with the current schema if the
    /// directory is empty.
    pub fn open_or_create(dir: &Path) -> Result<Self, IndexError> {
        std::fs::create_dir_all(dir)?;

        let mut builder = Schema::builder();
        let version_id = builder.add_u64_field("version_id", INDEXED | STORED);
        let document_id = builder.add_text_field("document_id", STRING | STORED);
        let title = builder.add_text_field("title", TEXT | STORED);
        let text = builder.add_text_field("text", TEXT);
        let schema = builder.build();

        let mmap = MmapDirectory::open(dir).map_err(TantivyError::from)?;
        let index = Index::open_or_create(mmap, schema)?;
        let writer = index.writer(WRITER_HEAP_BYTES)?;

        Ok(Self {
            index,
            fields: SearchFields {
                version_id,
                document_id,
                title,
                text,
            },
            writer: Mutex::new(writer),
        })
    }

    pub(crate) fn writer(&self) -> MutexGuard<'_, IndexWriter> {
        match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub(crate) fn version_document(
        &self,
        version: &DocumentVersion,
        title: &str,
    ) -> TantivyDocument {
        doc!(
            self.fields.version_id => version.id as u64,
            self.fields.document_id => version.document_id.as_str(),
            self.fields.title => title,
            self.fields.text => version.text.as_str(),
        )
    }

    pub(crate) fn text_field(&self) -> Field {
        self.fields.text
    }

    pub(crate) fn tantivy(&self) -> &Index {
        &self.index
    }

    /// Index one version, replacing any previous entry for the same rowid.
    pub fn index_version(&self, version: &DocumentVersion, title: &str) -> Result<(), IndexError> {
        let mut writer = self.writer();
        writer.delete_term(Term::from_field_u64(self.fields.version_id, version.id as u64));
        writer.add_document(self.version_document(version, title))?;
        writer.commit()?;
        Ok(())
    }

    /// Merge all searchable segments into one. A no-op below two segments.
    pub(crate) fn merge_segments(&self, writer: &mut IndexWriter) -> Result<(), IndexError> {
        let segment_ids = self.index.searchable_segment_ids()?;
        if segment_ids.len() > 1 {
            writer.merge(&segment_ids).wait()?;
        }
        Ok(())
    }

    /// Number of live documents, read through a scoped reader.
    pub fn num_docs(&self) -> Result<u64, IndexError> {
        let reader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(reader.searcher().num_docs())
    }

    /// Query title and text, returning version rowids best-first.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, IndexError> {
        let reader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let searcher = reader.searcher();

        let parser = QueryParser::for_index(&self.index, vec![self.fields.title, self.fields.text]);
        let parsed = parser.parse_query(query)?;

        let top = searcher.search(&parsed, &TopDocs::with_limit(limit.max(1)))?;
        let mut hits = Vec::with_capacity(top.len());
        for (score, address) in top {
            let doc: TantivyDocument = searcher.doc(address)?;
            if let Some(version_id) = doc
                .get_first(self.fields.version_id)
                .and_then(|value| value.as_u64())
            {
                hits.push(SearchHit {
                    version_id: version_id as i64,
                    score,
                });
            }
        }
        Ok(hits)
    }
}
