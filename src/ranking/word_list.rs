use std::collections::HashMap;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::core::types::{LemmaId, Totals};
use crate::corpus::models::TextEdition;
use crate::corpus::tables::Tables;
use crate::ranking::frequency::{log_ratio, per_10k, CoreBand};
use crate::reference::scope::RefScope;

/// Keyness used when ordering entries that have none
const NEUTRAL_KEYNESS: f64 = 1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WordOrder {
    #[default]
    Count,          // occurrences in scope, descending
    KeynessDesc,
    KeynessAsc,
}

impl FromStr for WordOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "count" | "" => Ok(WordOrder::Count),
            "keyness" | "-keyness" | "keyness-desc" => Ok(WordOrder::KeynessDesc),
            "+keyness" | "keyness-asc" => Ok(WordOrder::KeynessAsc),
            other => Err(Error::invalid_argument(format!("unknown word-list order '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct WordListQuery {
    pub cts_urn: String,
    pub scope: Option<String>,
    pub band: (Option<u64>, Option<u64>),
    pub order: WordOrder,
}

impl WordListQuery {
    pub fn new(cts_urn: impl Into<String>) -> Self {
        WordListQuery { cts_urn: cts_urn.into(), ..Default::default() }
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn band(mut self, band: CoreBand) -> Self {
        self.band = band.key();
        self
    }

    pub fn order(mut self, order: WordOrder) -> Self {
        self.order = order;
        self
    }

    pub fn core_band(&self) -> CoreBand {
        CoreBand::new(self.band.0.map(f64::from_bits), self.band.1.map(f64::from_bits))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WordListEntry {
    pub lemma_id: LemmaId,
    pub text: String,
    pub shortdef: Option<String>,
    pub count: u64,
    pub frequency: f64,         // per 10k tokens in scope
    pub corpus_freq: f64,
    pub core_freq: f64,
    pub keyness: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WordList {
    pub edition: TextEdition,
    pub scope: RefScope,
    pub token_total: u64,       // occurrences in scope
    pub entries: Vec<WordListEntry>,
}

/// Rank the lemmas of one edition (or one reference scope of it).
///
/// Keyness is only reported for the whole edition; a sub-range is too small a
/// sample to compare against the core baseline.
pub fn word_list(
    tables: &Tables,
    totals: Totals,
    query: &WordListQuery,
    preferred_source: Option<&str>,
) -> Result<WordList> {
    let edition = tables
        .edition_by_urn(&query.cts_urn)
        .ok_or_else(|| Error::not_found(format!("edition '{}'", query.cts_urn)))?;
    let scope = RefScope::parse(query.scope.as_deref())?;
    let band = query.core_band();

    let mut counts: HashMap<LemmaId, u64> = HashMap::new();
    let mut token_total = 0u64;
    for passage in tables.passages_in(edition.id, &scope.predicate) {
        *counts.entry(passage.lemma_id).or_default() += passage.count as u64;
        token_total += passage.count as u64;
    }

    let whole = scope.is_whole();
    let mut entries: Vec<WordListEntry> = counts
        .into_iter()
        .filter_map(|(lemma_id, count)| {
            let lemma = tables.lemma(lemma_id)?;
            if !band.contains(lemma.core_count, totals.core) {
                return None;
            }
            let keyness = if whole {
                log_ratio(count, token_total, lemma.core_count, totals.core)
            } else {
                None
            };
            Some(WordListEntry {
                lemma_id,
                text: lemma.text.clone(),
                shortdef: tables
                    .preferred_definition(lemma_id, preferred_source)
                    .map(|d| d.shortdef.clone()),
                count,
                frequency: per_10k(count, token_total),
                corpus_freq: per_10k(lemma.corpus_count, totals.corpus),
                core_freq: per_10k(lemma.core_count, totals.core),
                keyness,
            })
        })
        .collect();

    sort_entries(&mut entries, query.order);

    Ok(WordList {
        edition: edition.clone(),
        scope,
        token_total,
        entries,
    })
}

fn sort_entries(entries: &mut [WordListEntry], order: WordOrder) {
    let keyness = |e: &WordListEntry| e.keyness.unwrap_or(NEUTRAL_KEYNESS);
    let by_text = |a: &WordListEntry, b: &WordListEntry| a.text.cmp(&b.text);
    match order {
        WordOrder::Count => entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| by_text(a, b))),
        WordOrder::KeynessDesc => {
            entries.sort_by(|a, b| keyness(b).total_cmp(&keyness(a)).then_with(|| by_text(a, b)))
        }
        WordOrder::KeynessAsc => {
            entries.sort_by(|a, b| keyness(a).total_cmp(&keyness(b)).then_with(|| by_text(a, b)))
        }
    }
}
