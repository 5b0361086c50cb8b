pub mod copy_buffer;
pub mod core_marking;
pub mod line;

pub use copy_buffer::CopyBuffer;
pub use core_marking::{mark_core, mark_core_file, CoreMarkReport};

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;
use serde::Serialize;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{EditionId, LemmaId};
use crate::corpus::models::{NewDefinition, PassageLemma};
use crate::corpus::store::CorpusStore;
use line::{parse_lemma_token, split_fields};

/// Row counts of one import run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub editions: usize,
    pub editions_created: usize,
    pub dictionary_rows: usize,
    pub lemmas_created: usize,
    pub definitions_created: usize,
    pub passages: usize,
    pub passage_lemmas: usize,
    pub elapsed_ms: u128,
}

/// Three-phase importer. External ids from the editions and dictionary files
/// are resolved in memory, so the phases must run in order against the same
/// loader.
pub struct BulkLoader<'a> {
    store: &'a CorpusStore,
    source: String,
    batch_size: usize,
    editions_by_id: HashMap<String, EditionId>,
    lemmas_by_id: HashMap<String, LemmaId>,
    lemmas_by_text: HashMap<String, LemmaId>,
    report: ImportReport,
}

impl<'a> BulkLoader<'a> {
    /// `source` tags every definition loaded by this run
    pub fn new(store: &'a CorpusStore, source: impl Into<String>) -> Self {
        BulkLoader {
            batch_size: store.config.definition_batch_size.max(1),
            store,
            source: source.into(),
            editions_by_id: HashMap::new(),
            lemmas_by_id: HashMap::new(),
            lemmas_by_text: HashMap::new(),
            report: ImportReport::default(),
        }
    }

    /// `external_id|cts_urn`
    pub fn load_editions<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        let mut count = 0;
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_fields(&line, 2, lineno)?;
            let (edition, created) = self.store.get_or_create_edition(fields[1])?;
            self.editions_by_id.insert(fields[0].to_string(), edition.id);
            if created {
                self.report.editions_created += 1;
            }
            count += 1;
        }

        self.report.editions += count;
        tracing::info!(editions = count, created = self.report.editions_created, "loaded editions");
        Ok(count)
    }

    /// `external_id|headword|shortdef`; definitions are flushed in batches
    pub fn load_dictionary<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        let mut count = 0;
        let mut batch = Vec::with_capacity(self.batch_size);

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_fields(&line, 3, lineno)?;
            let (external_id, headword, shortdef) = (fields[0], fields[1], fields[2]);

            let lemma_id = match self.lemmas_by_text.get(headword) {
                Some(id) => *id,
                None => {
                    let (lemma, created) = self.store.get_or_create_lemma(headword)?;
                    if created {
                        self.report.lemmas_created += 1;
                    }
                    self.lemmas_by_text.insert(headword.to_string(), lemma.id);
                    lemma.id
                }
            };

            batch.push(NewDefinition {
                lemma_id,
                shortdef: shortdef.to_string(),
                source: self.source.clone(),
            });
            self.lemmas_by_id.insert(external_id.to_string(), lemma_id);
            count += 1;

            if batch.len() >= self.batch_size {
                self.flush_definitions(&mut batch)?;
            }
        }
        self.flush_definitions(&mut batch)?;

        self.report.dictionary_rows += count;
        tracing::info!(
            lemmas = count,
            created = self.report.lemmas_created,
            definitions = self.report.definitions_created,
            "loaded dictionary"
        );
        Ok(count)
    }

    fn flush_definitions(&mut self, batch: &mut Vec<NewDefinition>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let submitted = batch.len();
        let inserted = self.store.bulk_create_definitions(std::mem::take(batch))?;
        if inserted < submitted {
            tracing::debug!(skipped = submitted - inserted, "skipped existing definitions");
        }
        self.report.definitions_created += inserted;
        Ok(())
    }

    /// `edition_id:reference|lemma_id[.count] ...`, buffered then bulk-copied
    pub fn load_passages<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        let mut buffer = CopyBuffer::new();
        let mut passages = 0;

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_fields(&line, 2, lineno)?;
            let (edition_ext, reference) = fields[0].split_once(':').ok_or_else(|| {
                Error::parse(format!("line {}: passage '{}' lacks an edition id", lineno + 1, fields[0]))
            })?;
            let edition_id = *self.editions_by_id.get(edition_ext).ok_or_else(|| {
                tracing::error!(edition = edition_ext, line = lineno + 1, "unresolved edition id");
                Error::new(
                    ErrorKind::UnresolvedReference,
                    format!("line {}: unknown edition id '{}'", lineno + 1, edition_ext),
                )
            })?;

            for token in fields[1].split_whitespace() {
                let (lemma_ext, count) = parse_lemma_token(token, lineno)?;
                let lemma_id = *self.lemmas_by_id.get(lemma_ext).ok_or_else(|| {
                    tracing::error!(lemma = lemma_ext, line = lineno + 1, "unresolved lemma id");
                    Error::new(
                        ErrorKind::UnresolvedReference,
                        format!("line {}: unknown lemma id '{}'", lineno + 1, lemma_ext),
                    )
                })?;
                buffer.push(&PassageLemma::new(edition_id, reference, lemma_id, count)?)?;
            }
            passages += 1;
        }

        let rows = buffer.len();
        if !buffer.is_empty() {
            tracing::debug!(rows, bytes = buffer.size_bytes(), "copying passage buffer");
            self.store.copy_passages(buffer.reader(), &CopyBuffer::COLUMNS)?;
        }

        self.report.passages += passages;
        self.report.passage_lemmas += rows;
        tracing::info!(passages, passage_lemmas = rows, "loaded passage lemmas");
        Ok(rows)
    }

    pub fn report(&self) -> &ImportReport {
        &self.report
    }

    pub fn into_report(self) -> ImportReport {
        self.report
    }
}

/// Run all three phases over files, in dependency order
pub fn import_files<P: AsRef<Path>>(
    store: &CorpusStore,
    editions: P,
    dictionary: P,
    passage_lemmas: P,
    source: &str,
) -> Result<ImportReport> {
    let start = Instant::now();
    let mut loader = BulkLoader::new(store, source);
    loader.load_editions(BufReader::new(File::open(editions)?))?;
    loader.load_dictionary(BufReader::new(File::open(dictionary)?))?;
    loader.load_passages(BufReader::new(File::open(passage_lemmas)?))?;

    let mut report = loader.into_report();
    report.elapsed_ms = start.elapsed().as_millis();
    tracing::info!(elapsed_ms = report.elapsed_ms, "import finished");
    Ok(report)
}
