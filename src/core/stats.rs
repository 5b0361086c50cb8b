use serde::Serialize;
use crate::ranking::cache::CacheStats;

/// Store statistics for operators
#[derive(Debug, Clone, Serialize)]
pub struct CorpusStats {
    // Entities
    pub lemma_count: usize,
    pub definition_count: usize,
    pub edition_count: usize,
    pub core_edition_count: u64,
    pub passage_lemma_count: usize,

    // Storage
    pub fact_segment_count: usize,
    pub fact_size_bytes: u64,
    pub wal_size_bytes: u64,
    pub writable: bool,

    // Read side
    pub totals_cached: bool,
    pub word_list_cache: CacheStats,
}
