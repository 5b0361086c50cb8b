use std::collections::BTreeMap;
use serde::Serialize;
use crate::core::error::{Error, Result};
use crate::core::types::{EditionId, LemmaId, Totals};
use crate::corpus::models::{Definition, Lemma};
use crate::corpus::query::PassageQuery;
use crate::corpus::tables::Tables;
use crate::ranking::frequency::{per_10k, round1};

#[derive(Debug, Clone, Serialize)]
pub struct PassageEntry {
    pub edition_id: EditionId,
    pub cts_urn: String,
    pub reference: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditionFrequency {
    pub edition_id: EditionId,
    pub cts_urn: String,
    pub is_core: bool,
    pub count: u64,
    pub token_count: u64,
    pub frequency: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LemmaDetail {
    pub lemma: Lemma,
    pub definitions: Vec<Definition>,
    pub corpus_freq: f64,       // per 10k, one decimal
    pub core_freq: f64,
    pub editions: Vec<EditionFrequency>,
    pub passages: Vec<PassageEntry>,
}

/// Corpus and core frequency of a lemma, rounded for display
pub fn lemma_frequencies(lemma: &Lemma, totals: Totals) -> (f64, f64) {
    (
        round1(per_10k(lemma.corpus_count, totals.corpus)),
        round1(per_10k(lemma.core_count, totals.core)),
    )
}

/// Passages of a lemma grouped by edition in reference order, plus its
/// frequency in each edition. `filter_edition` narrows both to one edition.
pub fn lemma_detail(
    tables: &Tables,
    totals: Totals,
    id: LemmaId,
    filter_edition: Option<&str>,
) -> Result<LemmaDetail> {
    let lemma = tables
        .lemma(id)
        .ok_or_else(|| Error::not_found(format!("lemma {}", id)))?;

    let mut query = PassageQuery::new().lemma(id).order_by_ref(false);
    if let Some(urn) = filter_edition {
        let edition = tables
            .edition_by_urn(urn)
            .ok_or_else(|| Error::not_found(format!("edition '{}'", urn)))?;
        query = query.edition(edition.id);
    }
    let mut rows = tables.query(&query);
    // Stable: reference order survives within each edition
    rows.sort_by_key(|p| p.edition_id);

    let mut per_edition: BTreeMap<EditionId, u64> = BTreeMap::new();
    let mut passages = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(edition) = tables.edition(row.edition_id) else { continue };
        *per_edition.entry(row.edition_id).or_default() += row.count as u64;
        passages.push(PassageEntry {
            edition_id: row.edition_id,
            cts_urn: edition.cts_urn.clone(),
            reference: row.reference.clone(),
            count: row.count,
        });
    }

    let editions = per_edition
        .into_iter()
        .filter_map(|(edition_id, count)| {
            let edition = tables.edition(edition_id)?;
            Some(EditionFrequency {
                edition_id,
                cts_urn: edition.cts_urn.clone(),
                is_core: edition.is_core,
                count,
                token_count: edition.token_count,
                frequency: round1(per_10k(count, edition.token_count)),
            })
        })
        .collect();

    let (corpus_freq, core_freq) = lemma_frequencies(lemma, totals);
    Ok(LemmaDetail {
        lemma: lemma.clone(),
        definitions: tables.definitions_for(id).cloned().collect(),
        corpus_freq,
        core_freq,
        editions,
        passages,
    })
}
