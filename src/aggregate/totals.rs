use parking_lot::RwLock;
use rayon::prelude::*;
use crate::core::types::Totals;
use crate::corpus::store::CorpusStore;
use crate::corpus::tables::Tables;

/// Memoized overall corpus/core occurrence sums, the denominators of every
/// per-10k frequency. Computed on first use and kept until `invalidate`; a load
/// does not refresh it.
#[derive(Debug, Default)]
pub struct OverallTotals {
    cached: RwLock<Option<Totals>>,
}

impl OverallTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, store: &CorpusStore) -> Totals {
        if let Some(totals) = *self.cached.read() {
            return totals;
        }
        let mut cached = self.cached.write();
        // Another reader may have filled it while we waited
        if let Some(totals) = *cached {
            return totals;
        }
        let totals = Self::compute(&store.read());
        tracing::debug!(corpus = totals.corpus, core = totals.core, "computed overall totals");
        *cached = Some(totals);
        totals
    }

    pub fn compute(tables: &Tables) -> Totals {
        tables
            .passages
            .par_iter()
            .map(|p| {
                let count = p.count as u64;
                let core = if tables.is_core(p.edition_id) { count } else { 0 };
                Totals { corpus: count, core }
            })
            .reduce(Totals::default, |a, b| Totals {
                corpus: a.corpus + b.corpus,
                core: a.core + b.core,
            })
    }

    pub fn invalidate(&self) {
        *self.cached.write() = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cached.read().is_some()
    }
}
