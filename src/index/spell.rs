//! Spell dictionary index for query suggestions.
//!
//! A small secondary tantivy index holding one document per distinct word
//! seen in extracted text. It is best-effort by contract: update failures
//! are logged and never propagated, and the whole dictionary can be
//! re-derived from the primary index at any time.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::FuzzyTermQuery;
use tantivy::schema::{Field, Schema, TantivyDocument, Value, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, TextAnalyzer};
use tantivy::{doc, Index, IndexWriter, ReloadPolicy, TantivyError, Term};
use tracing::{debug, info, warn};

use super::{IndexError, SearchIndex};

/// Words shorter than this never enter the dictionary; fuzzy matching on
/// them produces mostly noise.
const MIN_WORD_CHARS: usize = 3;

const SPELL_WRITER_HEAP_BYTES: usize = 15_000_000;

/// Edit distance for suggestions. Distance 2 on a short word matches half
/// the dictionary.
fn suggest_distance(word: &str) -> u8 {
    if word.chars().count() <= 4 {
        1
    } else {
        2
    }
}

/// The on-disk spell dictionary.
///
/// The dictionary writer is opened and closed inside each critical
/// section; `write_lock` serializes those sections. Exactly one
/// `SpellIndex` exists per process, so the lock is process-wide.
pub struct SpellIndex {
    index: Index,
    word: Field,
    write_lock: Mutex<()>,
}

impl SpellIndex {
    pub fn open_or_create(dir: &Path) -> Result<Self, IndexError> {
        std::fs::create_dir_all(dir)?;

        let mut builder = Schema::builder();
        let word = builder.add_text_field("word", STRING | STORED);
        let schema = builder.build();

        let mmap = MmapDirectory::open(dir).map_err(TantivyError::from)?;
        let index = Index::open_or_create(mmap, schema)?;

        Ok(Self {
            index,
            word,
            write_lock: Mutex::new(()),
        })
    }

    /// Merge the distinct words of one version's text into the dictionary.
    ///
    /// Never fails from the caller's point of view: any error is logged
    /// and swallowed, the dictionary being secondary to the primary index.
    pub fn update_incremental(&self, text: &str) {
        match self.update_incremental_inner(text) {
            Ok(0) => {}
            Ok(words) => debug!(words, "spell dictionary updated"),
            Err(err) => warn!(error = %err, "spell dictionary update failed"),
        }
    }

    fn update_incremental_inner(&self, text: &str) -> Result<usize, IndexError> {
        // Tokenize outside the critical section
        let words = tokenize_distinct(text);
        if words.is_empty() {
            return Ok(0);
        }

        let guard = self.lock();
        let mut writer: IndexWriter = self.index.writer(SPELL_WRITER_HEAP_BYTES)?;
        let count = words.len();
        for word in words {
            // Delete-then-add keeps the dictionary free of duplicates
            writer.delete_term(Term::from_field_text(self.word, &word));
            writer.add_document(doc!(self.word => word))?;
        }
        writer.commit()?;
        drop(writer);
        drop(guard);
        Ok(count)
    }

    /// Replace the whole dictionary with the distinct terms of the primary
    /// index's text field.
    pub fn rebuild_full(&self, primary: &SearchIndex) -> Result<(), IndexError> {
        let started = Instant::now();

        let guard = self.lock();
        let words = primary_text_terms(primary)?;

        let mut writer: IndexWriter = self.index.writer(SPELL_WRITER_HEAP_BYTES)?;
        writer.delete_all_documents()?;
        let count = words.len();
        for word in words {
            writer.add_document(doc!(self.word => word))?;
        }
        writer.commit()?;
        drop(writer);
        drop(guard);

        info!(
            words = count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "spell dictionary rebuilt"
        );
        Ok(())
    }

    /// Words within edit distance of `word`, sorted.
    pub fn suggest(&self, word: &str, limit: usize) -> Result<Vec<String>, IndexError> {
        let reader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let searcher = reader.searcher();

        let term = Term::from_field_text(self.word, &word.to_lowercase());
        let query = FuzzyTermQuery::new(term, suggest_distance(word), true);

        let top = searcher.search(&query, &TopDocs::with_limit(limit.max(1)))?;
        let mut suggestions = Vec::with_capacity(top.len());
        for (_score, address) in top {
            let doc: TantivyDocument = searcher.doc(address)?;
            if let Some(found) = doc.get_first(self.word).and_then(|value| value.as_str()) {
                suggestions.push(found.to_string());
            }
        }
        suggestions.sort();
        suggestions.dedup();
        Ok(suggestions)
    }

    /// Dictionary size, read through a scoped reader.
    pub fn num_words(&self) -> Result<u64, IndexError> {
        let reader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(reader.searcher().num_docs())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Distinct lowercased words of at least [`MIN_WORD_CHARS`] characters.
fn tokenize_distinct(text: &str) -> BTreeSet<String> {
    let mut analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .build();
    let mut stream = analyzer.token_stream(text);

    let mut words = BTreeSet::new();
    while let Some(token) = stream.next() {
        if token.text.chars().count() >= MIN_WORD_CHARS {
            words.insert(token.text.clone());
        }
    }
    words
}

/// Every distinct term of the primary index's text field.
fn primary_text_terms(primary: &SearchIndex) -> Result<BTreeSet<String>, IndexError> {
    let reader = primary
        .tantivy()
        .reader_builder()
        .reload_policy(ReloadPolicy::Manual)
        .try_into()?;
    let searcher = reader.searcher();

    let mut words = BTreeSet::new();
    for segment in searcher.segment_readers() {
        let inverted = segment.inverted_index(primary.text_field())?;
        let mut stream = inverted.terms().stream()?;
        while stream.advance() {
            let term = String::from_utf8_lossy(stream.key());
            if term.chars().count() >= MIN_WORD_CHARS {
                words.insert(term.into_owned());
            }
        }
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn spell_index() -> (tempfile::TempDir, SpellIndex) {
        let dir = tempfile::tempdir().unwrap();
        let spell = SpellIndex::open_or_create(dir.path()).unwrap();
        (dir, spell)
    }

    #[test]
    fn tokenizer_lowercases_and_filters_short_words() {
        let words = tokenize_distinct("An Ox is BY the Riverbank");
        let collected: Vec<_> = words.into_iter().collect();
        assert_eq!(collected, ["riverbank", "the"]);
    }

    #[test]
    fn incremental_update_dedupes_across_calls() {
        let (_dir, spell) = spell_index();

        spell.update_incremental("alpha beta");
        spell.update_incremental("beta gamma");

        assert_eq!(spell.num_words().unwrap(), 3);
    }

    #[test]
    fn all_short_tokens_leave_dictionary_untouched() {
        let (_dir, spell) = spell_index();
        spell.update_incremental("an ox is by me");
        assert_eq!(spell.num_words().unwrap(), 0);
    }

    #[test]
    fn suggest_finds_close_words() {
        let (_dir, spell) = spell_index();
        spell.update_incremental("sunflower harvest report");

        let suggestions = spell.suggest("sunflowr", 5).unwrap();
        assert!(suggestions.contains(&"sunflower".to_string()));

        let none = spell.suggest("zzzzzzzzzz", 5).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn concurrent_updates_both_land() {
        let (_dir, spell) = spell_index();
        let spell = Arc::new(spell);

        let first = spell.clone();
        let second = spell.clone();
        let h1 = std::thread::spawn(move || first.update_incremental("sunflower harvest"));
        let h2 = std::thread::spawn(move || second.update_incremental("moonlight harbor"));
        h1.join().unwrap();
        h2.join().unwrap();

        assert_eq!(spell.num_words().unwrap(), 4);
        assert!(spell
            .suggest("harvest", 5)
            .unwrap()
            .contains(&"harvest".to_string()));
    }

    #[test]
    fn rebuild_replaces_dictionary_from_primary() {
        use crate::models::{DocumentVersion, ExtractionOutcome};
        use chrono::Utc;

        let primary_dir = tempfile::tempdir().unwrap();
        let primary = SearchIndex::open_or_create(primary_dir.path()).unwrap();
        let version = DocumentVersion {
            id: 1,
            document_id: "doc-1".to_string(),
            content_hash: "hash".to_string(),
            file_path: "/tmp/x".into(),
            file_size: 1,
            mime_type: "text/plain".to_string(),
            encoding: None,
            text: "lighthouse keeper logbook".to_string(),
            outcome: ExtractionOutcome::Success,
            error: None,
            created_at: Utc::now(),
        };
        primary.index_version(&version, "Log").unwrap();

        let (_dir, spell) = spell_index();
        spell.update_incremental("staleword");

        spell.rebuild_full(&primary).unwrap();

        let suggestions = spell.suggest("lighthouse", 5).unwrap();
        assert!(suggestions.contains(&"lighthouse".to_string()));
        assert!(spell.suggest("staleword", 5).unwrap().is_empty());
    }
}
