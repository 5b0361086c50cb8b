use std::fs;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use parking_lot::RwLock;
use crate::aggregate::{AggregateMaintainer, AggregateReport, OverallTotals};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::stats::CorpusStats;
use crate::core::types::{LemmaId, Totals};
use crate::corpus::labels::CatalogLabels;
use crate::corpus::models::Lemma;
use crate::corpus::store::CorpusStore;
use crate::loader::{self, CoreMarkReport, ImportReport};
use crate::ranking::{LemmaDetail, LemmaQuery, Page, RankingEngine, TextGroup, WordList, WordListQuery};
use crate::storage::wal::WAL;

/// Corpus store plus the batch jobs that feed it and the read contract served
/// from it
pub struct CorpusDatabase {
    store: Arc<CorpusStore>,
    totals: Arc<OverallTotals>,
    ranking: RankingEngine,
    labels: RwLock<CatalogLabels>,
}

impl CorpusDatabase {
    pub fn open(config: Config) -> Result<Self> {
        Ok(Self::with_store(CorpusStore::open(config)?))
    }

    pub fn open_read_only(config: Config) -> Result<Self> {
        Ok(Self::with_store(CorpusStore::open_read_only(config)?))
    }

    fn with_store(store: CorpusStore) -> Self {
        let store = Arc::new(store);
        let totals = Arc::new(OverallTotals::new());
        let ranking = RankingEngine::new(store.clone(), totals.clone());
        CorpusDatabase {
            store,
            totals,
            ranking,
            labels: RwLock::new(CatalogLabels::new()),
        }
    }

    pub fn store(&self) -> &CorpusStore {
        &self.store
    }

    pub fn ranking(&self) -> &RankingEngine {
        &self.ranking
    }

    // Batch jobs

    pub fn import_data<P: AsRef<Path>>(
        &self,
        editions: P,
        dictionary: P,
        passage_lemmas: P,
        source: &str,
    ) -> Result<ImportReport> {
        loader::import_files(&self.store, editions, dictionary, passage_lemmas, source)
    }

    pub fn mark_core<R: BufRead>(&self, reader: R) -> Result<CoreMarkReport> {
        loader::mark_core(&self.store, reader)
    }

    pub fn mark_core_file<P: AsRef<Path>>(&self, path: P) -> Result<CoreMarkReport> {
        loader::mark_core_file(&self.store, path)
    }

    /// Recompute every aggregate. The word-list cache is dropped with the
    /// totals; other processes still need a restart or `clear_caches`.
    pub fn recompute_aggregates(&self) -> Result<AggregateReport> {
        let report = AggregateMaintainer::new(&self.store)?.recompute_all(&self.totals)?;
        self.ranking.clear_caches();
        Ok(report)
    }

    pub fn aggregates(&self) -> Result<AggregateMaintainer<'_>> {
        AggregateMaintainer::new(&self.store)
    }

    /// Delete every passage fact so the next import does not duplicate them
    pub fn truncate_passages(&self) -> Result<usize> {
        self.store.truncate_passages()
    }

    pub fn checkpoint(&self) -> Result<()> {
        self.store.checkpoint()
    }

    pub fn clear_caches(&self) {
        self.ranking.clear_caches();
    }

    pub fn load_labels<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let labels = CatalogLabels::from_path(path)?;
        let count = labels.len();
        *self.labels.write() = labels;
        Ok(count)
    }

    // Read contract

    pub fn get_lemma(&self, id: LemmaId) -> Result<Lemma> {
        self.ranking.get_lemma(id)
    }

    pub fn find_lemma_by_text(&self, text: &str) -> Result<Lemma> {
        self.ranking.find_lemma_by_text(text)
    }

    pub fn list_lemmas(&self, query: &LemmaQuery) -> Result<Page<Lemma>> {
        self.ranking.list_lemmas(query)
    }

    pub fn list_editions(&self, core_only: bool) -> Vec<TextGroup> {
        self.ranking.list_editions(&self.labels.read(), core_only)
    }

    pub fn word_list(&self, query: &WordListQuery) -> Result<Arc<WordList>> {
        self.ranking.word_list(query)
    }

    pub fn lemma_detail(&self, id: LemmaId, filter_edition: Option<&str>) -> Result<LemmaDetail> {
        self.ranking.lemma_detail(id, filter_edition)
    }

    pub fn totals(&self) -> Totals {
        self.ranking.totals()
    }

    pub fn stats(&self) -> Result<CorpusStats> {
        let (lemma_count, definition_count, edition_count, core_edition_count, passage_lemma_count, segments) = {
            let tables = self.store.read();
            (
                tables.lemma_count(),
                tables.definitions.len(),
                tables.edition_count(),
                tables.core_editions.len(),
                tables.passage_count(),
                tables.fact_segments.clone(),
            )
        };

        let mut fact_size_bytes = 0;
        for id in &segments {
            fact_size_bytes += fs::metadata(self.store.storage.fact_path(id))?.len();
        }
        let mut wal_size_bytes = 0;
        for sequence in WAL::find_wal_files(&self.store.storage)? {
            wal_size_bytes += fs::metadata(self.store.storage.wal_path(sequence))?.len();
        }

        Ok(CorpusStats {
            lemma_count,
            definition_count,
            edition_count,
            core_edition_count,
            passage_lemma_count,
            fact_segment_count: segments.len(),
            fact_size_bytes,
            wal_size_bytes,
            writable: self.store.is_writable(),
            totals_cached: self.totals.is_cached(),
            word_list_cache: self.ranking.cache_stats(),
        })
    }
}
