use std::collections::{BTreeMap, HashMap, HashSet};
use rayon::prelude::*;
use roaring::RoaringBitmap;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{EditionId, LemmaId};
use crate::corpus::models::{Definition, Lemma, PassageLemma, TextEdition};
use crate::corpus::query::{PassageQuery, RefOrder};
use crate::reference::predicate::RefPredicate;
use crate::storage::checkpoint::Catalog;
use crate::storage::fact_segment::SegmentId;
use crate::storage::wal::Operation;

/// Row ids of the passage table grouped by edition (sorted by reference key)
/// and by lemma (load order)
#[derive(Debug, Default)]
pub struct PassageIndex {
    pub by_edition: HashMap<EditionId, Vec<u32>>,
    pub by_lemma: HashMap<LemmaId, Vec<u32>>,
}

impl PassageIndex {
    pub fn build(passages: &[PassageLemma]) -> Self {
        let mut by_edition: HashMap<EditionId, Vec<u32>> = HashMap::new();
        let mut by_lemma: HashMap<LemmaId, Vec<u32>> = HashMap::new();
        for (row, passage) in passages.iter().enumerate() {
            by_edition.entry(passage.edition_id).or_default().push(row as u32);
            by_lemma.entry(passage.lemma_id).or_default().push(row as u32);
        }

        by_edition.par_iter_mut().for_each(|(_, rows)| {
            rows.sort_by(|a, b| passages[*a as usize].ref_key.cmp(&passages[*b as usize].ref_key));
        });

        PassageIndex { by_edition, by_lemma }
    }
}

/// In-memory image of the corpus store
#[derive(Debug, Default)]
pub struct Tables {
    pub lemmas: Vec<Lemma>,
    pub lemma_by_text: HashMap<String, LemmaId>,
    pub definitions: Vec<Definition>,
    pub definitions_by_lemma: HashMap<LemmaId, Vec<usize>>,
    pub definition_keys: HashSet<(LemmaId, String, String)>,
    pub editions: Vec<TextEdition>,
    pub edition_by_urn: BTreeMap<String, EditionId>,
    pub core_editions: RoaringBitmap,
    pub passages: Vec<PassageLemma>,
    pub fact_segments: Vec<SegmentId>,
    pub passage_index: PassageIndex,
}

impl Tables {
    pub fn from_catalog(catalog: Catalog) -> Result<Self> {
        let mut tables = Tables::default();
        for lemma in catalog.lemmas {
            tables.insert_lemma(lemma)?;
        }
        tables.insert_definitions(catalog.definitions)?;
        for edition in catalog.editions {
            tables.insert_edition(edition)?;
        }
        tables.fact_segments = catalog.fact_segments;
        Ok(tables)
    }

    pub fn to_catalog(&self) -> Catalog {
        Catalog {
            lemmas: self.lemmas.clone(),
            definitions: self.definitions.clone(),
            editions: self.editions.clone(),
            fact_segments: self.fact_segments.clone(),
        }
    }

    /// Apply a logged catalog mutation. Fact attachment and truncation need
    /// the segment files and are handled by the store.
    pub fn apply(&mut self, operation: Operation) -> Result<()> {
        match operation {
            Operation::CreateLemma(lemma) => self.insert_lemma(lemma),
            Operation::CreateDefinitions(definitions) => self.insert_definitions(definitions),
            Operation::CreateEdition(edition) => self.insert_edition(edition),
            Operation::SetCore { edition_id, is_core } => {
                let edition = self.edition_mut(edition_id)?;
                edition.is_core = is_core;
                if is_core {
                    self.core_editions.insert(edition_id.0);
                } else {
                    self.core_editions.remove(edition_id.0);
                }
                Ok(())
            }
            Operation::SetLemmaCounts(counts) => {
                for (id, corpus_count, core_count) in counts {
                    let lemma = self.lemma_mut(id)?;
                    lemma.corpus_count = corpus_count;
                    lemma.core_count = core_count;
                }
                Ok(())
            }
            Operation::SetTokenCounts(counts) => {
                for (id, token_count) in counts {
                    self.edition_mut(id)?.token_count = token_count;
                }
                Ok(())
            }
            Operation::SetUnaccented(forms) => {
                for (id, unaccented) in forms {
                    self.lemma_mut(id)?.unaccented = unaccented;
                }
                Ok(())
            }
            Operation::AttachFacts(_) | Operation::TruncateFacts => Err(Error::new(
                ErrorKind::Internal,
                "fact operations are applied by the store".to_string(),
            )),
        }
    }

    fn insert_lemma(&mut self, lemma: Lemma) -> Result<()> {
        if lemma.id.index() != self.lemmas.len() {
            return Err(Error::new(
                ErrorKind::Corrupted,
                format!("lemma id {} out of sequence (expected {})", lemma.id, self.lemmas.len()),
            ));
        }
        if self.lemma_by_text.contains_key(&lemma.text) {
            return Err(Error::new(
                ErrorKind::DuplicateConstraint,
                format!("lemma '{}' already exists", lemma.text),
            ));
        }
        self.lemma_by_text.insert(lemma.text.clone(), lemma.id);
        self.lemmas.push(lemma);
        Ok(())
    }

    fn insert_definitions(&mut self, definitions: Vec<Definition>) -> Result<()> {
        for definition in definitions {
            if self.lemma(definition.lemma_id).is_none() {
                return Err(Error::new(
                    ErrorKind::Corrupted,
                    format!("definition {} references missing lemma {}", definition.id.0, definition.lemma_id),
                ));
            }
            let row = self.definitions.len();
            self.definitions_by_lemma.entry(definition.lemma_id).or_default().push(row);
            self.definition_keys.insert((
                definition.lemma_id,
                definition.shortdef.clone(),
                definition.source.clone(),
            ));
            self.definitions.push(definition);
        }
        Ok(())
    }

    fn insert_edition(&mut self, edition: TextEdition) -> Result<()> {
        if edition.id.index() != self.editions.len() {
            return Err(Error::new(
                ErrorKind::Corrupted,
                format!("edition id {} out of sequence (expected {})", edition.id, self.editions.len()),
            ));
        }
        if self.edition_by_urn.contains_key(&edition.cts_urn) {
            return Err(Error::new(
                ErrorKind::DuplicateConstraint,
                format!("edition '{}' already exists", edition.cts_urn),
            ));
        }
        if edition.is_core {
            self.core_editions.insert(edition.id.0);
        }
        self.edition_by_urn.insert(edition.cts_urn.clone(), edition.id);
        self.editions.push(edition);
        Ok(())
    }

    /// Append a segment's rows after checking every foreign key. The index is
    /// stale until `reindex`.
    pub fn attach_facts(&mut self, id: SegmentId, rows: Vec<PassageLemma>) -> Result<()> {
        for row in &rows {
            if self.edition(row.edition_id).is_none() {
                return Err(Error::new(
                    ErrorKind::UnresolvedReference,
                    format!("fact references missing edition {}", row.edition_id),
                ));
            }
            if self.lemma(row.lemma_id).is_none() {
                return Err(Error::new(
                    ErrorKind::UnresolvedReference,
                    format!("fact references missing lemma {}", row.lemma_id),
                ));
            }
        }
        self.passages.extend(rows);
        if !self.fact_segments.contains(&id) {
            self.fact_segments.push(id);
        }
        Ok(())
    }

    /// Rebuild the passage index; call once after a run of `attach_facts`
    pub fn reindex(&mut self) {
        self.passage_index = PassageIndex::build(&self.passages);
    }

    pub fn truncate_facts(&mut self) -> Vec<SegmentId> {
        self.passages.clear();
        self.passage_index = PassageIndex::default();
        std::mem::take(&mut self.fact_segments)
    }

    fn lemma_mut(&mut self, id: LemmaId) -> Result<&mut Lemma> {
        self.lemmas
            .get_mut(id.index())
            .ok_or_else(|| Error::not_found(format!("lemma {}", id)))
    }

    fn edition_mut(&mut self, id: EditionId) -> Result<&mut TextEdition> {
        self.editions
            .get_mut(id.index())
            .ok_or_else(|| Error::not_found(format!("edition {}", id)))
    }

    pub fn lemma(&self, id: LemmaId) -> Option<&Lemma> {
        self.lemmas.get(id.index())
    }

    pub fn lemma_by_text(&self, text: &str) -> Option<&Lemma> {
        self.lemma_by_text.get(text).and_then(|id| self.lemma(*id))
    }

    pub fn definitions_for(&self, lemma: LemmaId) -> impl Iterator<Item = &Definition> + '_ {
        self.definitions_by_lemma
            .get(&lemma)
            .into_iter()
            .flatten()
            .map(move |row| &self.definitions[*row])
    }

    pub fn has_definition(&self, lemma: LemmaId, shortdef: &str, source: &str) -> bool {
        self.definition_keys
            .contains(&(lemma, shortdef.to_string(), source.to_string()))
    }

    /// Definition from `source` if present, else the first one loaded
    pub fn preferred_definition(&self, lemma: LemmaId, source: Option<&str>) -> Option<&Definition> {
        let preferred = source.and_then(|source| self.definitions_for(lemma).find(|d| d.source == source));
        preferred.or_else(|| self.definitions_for(lemma).next())
    }

    pub fn edition(&self, id: EditionId) -> Option<&TextEdition> {
        self.editions.get(id.index())
    }

    pub fn edition_by_urn(&self, urn: &str) -> Option<&TextEdition> {
        self.edition_by_urn.get(urn).and_then(|id| self.edition(*id))
    }

    pub fn editions_with_prefix(&self, prefix: &str) -> Vec<&TextEdition> {
        self.edition_by_urn
            .range(prefix.to_string()..)
            .take_while(|(urn, _)| urn.starts_with(prefix))
            .filter_map(|(_, id)| self.edition(*id))
            .collect()
    }

    pub fn is_core(&self, edition: EditionId) -> bool {
        self.core_editions.contains(edition.0)
    }

    /// Rows of one edition matching `predicate`, in reference order
    pub fn passages_in<'a>(
        &'a self,
        edition: EditionId,
        predicate: &RefPredicate,
    ) -> impl Iterator<Item = &'a PassageLemma> + use<'a> {
        let rows: &[u32] = self
            .passage_index
            .by_edition
            .get(&edition)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let range = predicate.scan(rows, |row| &self.passages[*row as usize].ref_key);
        rows[range].iter().map(move |row| &self.passages[*row as usize])
    }

    pub fn passages_of_lemma(&self, lemma: LemmaId) -> impl Iterator<Item = &PassageLemma> + '_ {
        self.passage_index
            .by_lemma
            .get(&lemma)
            .into_iter()
            .flatten()
            .map(move |row| &self.passages[*row as usize])
    }

    pub fn query(&self, query: &PassageQuery) -> Vec<&PassageLemma> {
        // The first include predicate drives the index seek
        let seek = query.include.first().cloned().unwrap_or(RefPredicate::All);
        let base: Box<dyn Iterator<Item = &PassageLemma>> = match (query.edition, query.lemma) {
            (Some(edition), _) => Box::new(self.passages_in(edition, &seek)),
            (None, Some(lemma)) => Box::new(self.passages_of_lemma(lemma)),
            (None, None) => Box::new(self.passages.iter()),
        };

        let mut rows: Vec<&PassageLemma> = base
            .filter(|p| query.lemma.is_none_or(|lemma| p.lemma_id == lemma))
            .filter(|p| query.include.iter().all(|pred| pred.matches(&p.ref_key)))
            .filter(|p| !query.exclude.iter().any(|pred| pred.matches(&p.ref_key)))
            .collect();

        match query.order {
            RefOrder::Unordered => {}
            RefOrder::Ascending => rows.sort_by(|a, b| a.ref_key.cmp(&b.ref_key)),
            RefOrder::Descending => rows.sort_by(|a, b| b.ref_key.cmp(&a.ref_key)),
        }
        rows
    }

    pub fn lemma_count(&self) -> usize {
        self.lemmas.len()
    }

    pub fn edition_count(&self) -> usize {
        self.editions.len()
    }

    pub fn passage_count(&self) -> usize {
        self.passages.len()
    }
}
