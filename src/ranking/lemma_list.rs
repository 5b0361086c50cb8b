use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::analysis::normalize_lemma;
use crate::core::error::{Error, Result};
use crate::core::types::{LemmaId, Totals};
use crate::corpus::lemma_index::LemmaIndex;
use crate::corpus::models::Lemma;
use crate::corpus::tables::Tables;
use crate::ranking::frequency::CoreBand;
use crate::ranking::pagination::{Page, PageRequest};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LemmaOrder {
    #[default]
    Core,       // core_count descending
    Corpus,     // corpus_count descending
    Text,       // display text ascending
}

impl FromStr for LemmaOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "core" | "" => Ok(LemmaOrder::Core),
            "corpus" => Ok(LemmaOrder::Corpus),
            "text" | "alpha" => Ok(LemmaOrder::Text),
            other => Err(Error::invalid_argument(format!("unknown lemma order '{}'", other))),
        }
    }
}

/// How a search string selects normalized forms
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMatch {
    Any,
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
}

impl FormMatch {
    /// `*` at the end selects a prefix match, at the start a suffix match,
    /// at both ends a substring match. The rest is normalized like stored forms.
    pub fn parse(query: &str) -> Self {
        let query = query.trim();
        let leading = query.starts_with('*');
        let trailing = query.len() > 1 && query.ends_with('*');
        let core = query.trim_matches('*');
        if core.is_empty() {
            return FormMatch::Any;
        }
        let form = normalize_lemma(core);
        match (leading, trailing) {
            (false, false) => FormMatch::Exact(form),
            (false, true) => FormMatch::Prefix(form),
            (true, false) => FormMatch::Suffix(form),
            (true, true) => FormMatch::Contains(form),
        }
    }

    pub fn lookup(&self, index: &LemmaIndex) -> Option<Vec<LemmaId>> {
        match self {
            FormMatch::Any => None,
            FormMatch::Exact(form) => Some(index.exact(form)),
            FormMatch::Prefix(form) => Some(index.prefix(form)),
            FormMatch::Suffix(form) => Some(index.suffix(form)),
            FormMatch::Contains(form) => Some(index.contains(form)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LemmaQuery {
    pub query: Option<String>,
    pub band: CoreBand,
    pub order: LemmaOrder,
    pub page: PageRequest,
}

pub fn list_lemmas(
    tables: &Tables,
    index: &LemmaIndex,
    totals: Totals,
    query: &LemmaQuery,
    page_size: usize,
) -> Page<Lemma> {
    let form = query.query.as_deref().map_or(FormMatch::Any, FormMatch::parse);
    let candidates: Box<dyn Iterator<Item = &Lemma>> = match form.lookup(index) {
        Some(ids) => Box::new(ids.into_iter().filter_map(|id| tables.lemma(id))),
        None => Box::new(tables.lemmas.iter()),
    };

    let mut lemmas: Vec<&Lemma> = candidates
        .filter(|lemma| query.band.contains(lemma.core_count, totals.core))
        .collect();

    match query.order {
        LemmaOrder::Core => lemmas.sort_by(|a, b| b.core_count.cmp(&a.core_count).then_with(|| a.text.cmp(&b.text))),
        LemmaOrder::Corpus => lemmas.sort_by(|a, b| b.corpus_count.cmp(&a.corpus_count).then_with(|| a.text.cmp(&b.text))),
        LemmaOrder::Text => lemmas.sort_by(|a, b| a.text.cmp(&b.text)),
    }

    Page::paginate(lemmas, query.page, page_size).map(Lemma::clone)
}
