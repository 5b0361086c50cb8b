pub mod totals;

pub use totals::OverallTotals;

use std::time::Instant;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use crate::analysis::normalize_lemma;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{EditionId, LemmaId, Totals};
use crate::corpus::store::CorpusStore;
use crate::corpus::tables::Tables;

/// Passage rows summed per parallel task
const CHUNK_ROWS: usize = 64 * 1024;

/// Lemmas normalized per written batch
const UNACCENTED_CHUNK: usize = 1000;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateReport {
    pub lemmas_updated: usize,
    pub editions_updated: usize,
    pub unaccented_updated: usize,
    pub totals: Totals,
    pub elapsed_ms: u128,
}

/// Full-recompute passes over the passage facts. Every pass is idempotent and
/// writes only the values that changed; lemmas or editions without rows get 0.
pub struct AggregateMaintainer<'a> {
    store: &'a CorpusStore,
    pool: ThreadPool,
}

impl<'a> AggregateMaintainer<'a> {
    pub fn new(store: &'a CorpusStore) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(store.config.worker_threads.max(1))
            .thread_name(|i| format!("aggregate-{}", i))
            .build()
            .map_err(|e| Error::new(ErrorKind::Internal, format!("Failed to build thread pool: {}", e)))?;
        Ok(AggregateMaintainer { store, pool })
    }

    /// Set-based pass: corpus and core sums for every lemma at once
    pub fn recompute_lemma_counts(&self) -> Result<usize> {
        let changed = {
            let guard = self.store.read();
            let tables: &Tables = &guard;
            let sums = self.pool.install(|| lemma_sums(tables));

            tables
                .lemmas
                .iter()
                .zip(sums)
                .filter(|(lemma, (corpus, core))| lemma.corpus_count != *corpus || lemma.core_count != *core)
                .map(|(lemma, (corpus, core))| (lemma.id, corpus, core))
                .collect::<Vec<_>>()
        };

        let updated = changed.len();
        if updated > 0 {
            self.store.set_lemma_counts(changed)?;
        }
        tracing::info!(updated, "recomputed lemma counts");
        Ok(updated)
    }

    /// Per-lemma variant of `recompute_lemma_counts`
    pub fn recompute_lemma_counts_for(&self, id: LemmaId) -> Result<(u64, u64)> {
        let (corpus, core) = {
            let tables = self.store.read();
            if tables.lemma(id).is_none() {
                return Err(Error::not_found(format!("lemma {}", id)));
            }
            tables.passages_of_lemma(id).fold((0u64, 0u64), |(corpus, core), p| {
                let count = p.count as u64;
                let core_add = if tables.is_core(p.edition_id) { count } else { 0 };
                (corpus + count, core + core_add)
            })
        };
        self.store.set_lemma_counts(vec![(id, corpus, core)])?;
        Ok((corpus, core))
    }

    pub fn recompute_edition_token_counts(&self) -> Result<usize> {
        let changed = {
            let guard = self.store.read();
            let tables: &Tables = &guard;
            let sums = self.pool.install(|| edition_sums(tables));

            tables
                .editions
                .iter()
                .zip(sums)
                .filter(|(edition, tokens)| edition.token_count != *tokens)
                .map(|(edition, tokens)| (edition.id, tokens))
                .collect::<Vec<(EditionId, u64)>>()
        };

        let updated = changed.len();
        if updated > 0 {
            self.store.set_token_counts(changed)?;
        }
        tracing::info!(updated, "recomputed edition token counts");
        Ok(updated)
    }

    /// Re-derive normalized forms in fixed-size chunks so only one chunk of
    /// changes is held at a time
    pub fn recompute_unaccented(&self) -> Result<usize> {
        let total = self.store.read().lemma_count();
        let mut updated = 0;

        for start in (0..total).step_by(UNACCENTED_CHUNK) {
            let end = (start + UNACCENTED_CHUNK).min(total);
            let changed: Vec<(LemmaId, String)> = self.store.read().lemmas[start..end]
                .iter()
                .filter_map(|lemma| {
                    let form = normalize_lemma(&lemma.text);
                    (form != lemma.unaccented).then_some((lemma.id, form))
                })
                .collect();

            if !changed.is_empty() {
                updated += changed.len();
                self.store.set_unaccented(changed)?;
            }
        }

        tracing::info!(updated, "recomputed normalized lemma forms");
        Ok(updated)
    }

    /// Every pass, then a fresh read of the overall totals
    pub fn recompute_all(&self, totals: &OverallTotals) -> Result<AggregateReport> {
        let start = Instant::now();
        let unaccented_updated = self.recompute_unaccented()?;
        let lemmas_updated = self.recompute_lemma_counts()?;
        let editions_updated = self.recompute_edition_token_counts()?;
        totals.invalidate();

        let report = AggregateReport {
            lemmas_updated,
            editions_updated,
            unaccented_updated,
            totals: totals.get(self.store),
            elapsed_ms: start.elapsed().as_millis(),
        };
        tracing::info!(
            corpus_total = report.totals.corpus,
            core_total = report.totals.core,
            elapsed_ms = report.elapsed_ms,
            "aggregates recomputed"
        );
        Ok(report)
    }
}

fn lemma_sums(tables: &Tables) -> Vec<(u64, u64)> {
    let n = tables.lemma_count();
    tables
        .passages
        .par_chunks(CHUNK_ROWS)
        .map(|chunk| {
            let mut sums = vec![(0u64, 0u64); n];
            for p in chunk {
                let count = p.count as u64;
                let slot = &mut sums[p.lemma_id.index()];
                slot.0 += count;
                if tables.is_core(p.edition_id) {
                    slot.1 += count;
                }
            }
            sums
        })
        .reduce(
            || vec![(0, 0); n],
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(b) {
                    x.0 += y.0;
                    x.1 += y.1;
                }
                a
            },
        )
}

fn edition_sums(tables: &Tables) -> Vec<u64> {
    let n = tables.edition_count();
    tables
        .passages
        .par_chunks(CHUNK_ROWS)
        .map(|chunk| {
            let mut sums = vec![0u64; n];
            for p in chunk {
                sums[p.edition_id.index()] += p.count as u64;
            }
            sums
        })
        .reduce(
            || vec![0; n],
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(b) {
                    *x += y;
                }
                a
            },
        )
}
