pub mod cache;
pub mod detail;
pub mod editions;
pub mod frequency;
pub mod lemma_list;
pub mod pagination;
pub mod word_list;

pub use cache::{CacheStats, WordListCache};
pub use detail::{lemma_detail, LemmaDetail};
pub use editions::{list_editions, TextGroup};
pub use frequency::{log_ratio, per_10k, round1, CoreBand};
pub use lemma_list::{LemmaOrder, LemmaQuery};
pub use pagination::{Page, PageRequest};
pub use word_list::{WordList, WordListEntry, WordListQuery, WordOrder};

use std::sync::Arc;
use crate::aggregate::OverallTotals;
use crate::core::error::{Error, Result};
use crate::core::types::{LemmaId, Totals};
use crate::corpus::labels::CatalogLabels;
use crate::corpus::models::Lemma;
use crate::corpus::store::CorpusStore;

/// Read-only queries over a store. Normalization denominators come from the
/// injected totals cache, so results reflect the totals as last computed.
pub struct RankingEngine {
    store: Arc<CorpusStore>,
    totals: Arc<OverallTotals>,
    cache: WordListCache,
}

impl RankingEngine {
    pub fn new(store: Arc<CorpusStore>, totals: Arc<OverallTotals>) -> Self {
        let cache = WordListCache::new(store.config.result_cache_size);
        RankingEngine { store, totals, cache }
    }

    pub fn totals(&self) -> Totals {
        self.totals.get(&self.store)
    }

    pub fn get_lemma(&self, id: LemmaId) -> Result<Lemma> {
        self.store
            .read()
            .lemma(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("lemma {}", id)))
    }

    pub fn find_lemma_by_text(&self, text: &str) -> Result<Lemma> {
        self.store
            .read()
            .lemma_by_text(text)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("lemma '{}'", text)))
    }

    pub fn list_lemmas(&self, query: &LemmaQuery) -> Result<Page<Lemma>> {
        let totals = self.totals();
        let index = self.store.lemma_index()?;
        let tables = self.store.read();
        Ok(lemma_list::list_lemmas(&tables, &index, totals, query, self.store.config.page_size))
    }

    pub fn list_editions(&self, labels: &CatalogLabels, core_only: bool) -> Vec<TextGroup> {
        list_editions(&self.store.read(), labels, core_only)
    }

    pub fn word_list(&self, query: &WordListQuery) -> Result<Arc<WordList>> {
        if let Some(list) = self.cache.get(self.store.generation(), query) {
            return Ok(list);
        }
        let totals = self.totals();
        let (generation, list) = {
            let tables = self.store.read();
            let generation = self.store.generation();
            let list = word_list::word_list(
                &tables,
                totals,
                query,
                self.store.config.preferred_definition_source.as_deref(),
            )?;
            (generation, list)
        };
        tracing::debug!(
            edition = %query.cts_urn,
            scope = query.scope.as_deref().unwrap_or("*"),
            entries = list.entries.len(),
            "computed word list"
        );
        let list = Arc::new(list);
        self.cache.put(generation, query.clone(), list.clone());
        Ok(list)
    }

    pub fn lemma_detail(&self, id: LemmaId, filter_edition: Option<&str>) -> Result<LemmaDetail> {
        let totals = self.totals();
        lemma_detail(&self.store.read(), totals, id, filter_edition)
    }

    /// Drop the memoized totals and every cached word list
    pub fn clear_caches(&self) {
        self.totals.invalidate();
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
