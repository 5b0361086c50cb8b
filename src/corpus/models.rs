use serde::{Deserialize, Serialize};
use crate::analysis::normalize_lemma;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DefinitionId, EditionId, LemmaId};
use crate::corpus::labels::CatalogLabels;
use crate::reference::sort_key::RefKey;

/// Dictionary headword with denormalized occurrence counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lemma {
    pub id: LemmaId,
    pub text: String,
    pub unaccented: String,     // Derived from text, diacritic-insensitive search
    pub corpus_count: u64,      // Maintained by the aggregate pass
    pub core_count: u64,
}

impl Lemma {
    pub fn new(id: LemmaId, text: String) -> Self {
        Lemma {
            id,
            unaccented: normalize_lemma(&text),
            text,
            corpus_count: 0,
            core_count: 0,
        }
    }
}

/// Short gloss for a lemma from one source dictionary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub id: DefinitionId,
    pub lemma_id: LemmaId,
    pub shortdef: String,
    pub source: String,
}

/// Definition awaiting an id from the store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NewDefinition {
    pub lemma_id: LemmaId,
    pub shortdef: String,
    pub source: String,
}

/// One source text, identified by its CTS URN
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEdition {
    pub id: EditionId,
    pub cts_urn: String,
    pub is_core: bool,
    pub token_count: u64,
}

impl TextEdition {
    pub fn new(id: EditionId, cts_urn: String) -> Self {
        TextEdition {
            id,
            cts_urn,
            is_core: false,
            token_count: 0,
        }
    }

    /// `urn:cts:greekLit:tlg0012.tlg001.perseus-grc2` -> `urn:cts:greekLit:tlg0012`
    pub fn text_group_urn(&self) -> String {
        self.work_component_prefix(1)
    }

    /// `urn:cts:greekLit:tlg0012.tlg001.perseus-grc2` -> `urn:cts:greekLit:tlg0012.tlg001`
    pub fn work_urn(&self) -> String {
        self.work_component_prefix(2)
    }

    pub fn text_group_label<'a>(&self, labels: &'a CatalogLabels) -> &'a str {
        labels.label(&self.text_group_urn())
    }

    pub fn work_label<'a>(&self, labels: &'a CatalogLabels) -> &'a str {
        labels.label(&self.work_urn())
    }

    fn work_component_prefix(&self, components: usize) -> String {
        let parts: Vec<&str> = self.cts_urn.split(':').collect();
        if parts.len() < 4 {
            return self.cts_urn.clone();
        }
        let work: Vec<&str> = parts[3].split('.').take(components).collect();
        format!("{}:{}", parts[..3].join(":"), work.join("."))
    }
}

/// Occurrence fact: `lemma` occurs `count` times at `reference` in `edition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageLemma {
    pub edition_id: EditionId,
    pub reference: String,
    pub lemma_id: LemmaId,
    pub count: u32,
    pub ref_key: RefKey,        // ref1..ref4, always derived from `reference`
}

impl PassageLemma {
    /// Column order of the passage table, shared by the bulk-copy buffer
    pub const COLUMNS: [&'static str; 8] = [
        "text_edition_id",
        "reference",
        "lemma_id",
        "count",
        "ref1",
        "ref2",
        "ref3",
        "ref4",
    ];

    pub fn new(edition_id: EditionId, reference: &str, lemma_id: LemmaId, count: u32) -> Result<Self> {
        if count == 0 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("zero count for lemma {} at {}", lemma_id, reference),
            ));
        }
        Ok(PassageLemma {
            edition_id,
            reference: reference.to_string(),
            lemma_id,
            count,
            ref_key: RefKey::parse(reference)?,
        })
    }
}
