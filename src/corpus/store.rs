use std::collections::HashSet;
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use chrono::Utc;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DefinitionId, EditionId, LemmaId};
use crate::corpus::lemma_index::LemmaIndex;
use crate::corpus::models::{Definition, Lemma, NewDefinition, PassageLemma, TextEdition};
use crate::corpus::tables::Tables;
use crate::reference::sort_key::{LevelKey, RefKey, MAX_DEPTH};
use crate::storage::checkpoint::Checkpoint;
use crate::storage::fact_segment::{Compression, FactSegment, FactSegmentReader, FactSegmentWriter, SegmentId};
use crate::storage::file_lock::FileLock;
use crate::storage::layout::StorageLayout;
use crate::storage::wal::{Operation, WAL};

/// Persistent corpus: catalog tables in memory, logged to the WAL, with the
/// passage-lemma facts in immutable segments.
///
/// One writer per storage directory (enforced with a file lock). Read-only
/// handles take no lock and see whatever had been logged when they opened.
pub struct CorpusStore {
    pub config: Config,
    pub storage: Arc<StorageLayout>,
    tables: RwLock<Tables>,
    wal: Mutex<Option<WAL>>,
    lemma_index: RwLock<Option<Arc<LemmaIndex>>>,
    generation: AtomicU64,
    _lock: Option<FileLock>,
}

impl CorpusStore {
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with(config, true)
    }

    pub fn open_read_only(config: Config) -> Result<Self> {
        Self::open_with(config, false)
    }

    fn open_with(config: Config, writable: bool) -> Result<Self> {
        let storage = Arc::new(StorageLayout::new(config.storage_path.clone())?);
        let lock = if writable { Some(FileLock::acquire(&storage)?) } else { None };

        let checkpoint = Checkpoint::load(&storage)?;
        let (mut tables, start_sequence) = match checkpoint {
            Some(cp) => (Tables::from_catalog(cp.catalog)?, cp.wal_sequence),
            None => (Tables::default(), 0),
        };
        let mut entries = Vec::new();
        let mut torn = Vec::new();
        for file_sequence in WAL::find_wal_files(&storage)? {
            let contents = WAL::read_entries(&storage, file_sequence)?;
            if contents.is_torn() {
                torn.push((file_sequence, contents.valid_len));
            }
            entries.extend(contents.entries.into_iter().filter(|e| e.sequence >= start_sequence));
        }

        // Segments attached before the last truncation are gone or going
        let last_truncate = entries
            .iter()
            .rposition(|e| matches!(e.operation, Operation::TruncateFacts));
        let mut orphaned = Vec::new();
        if last_truncate.is_some() {
            orphaned.extend(tables.truncate_facts());
        } else {
            for id in tables.fact_segments.clone() {
                let rows = FactSegmentReader::read_all(&storage, id)?;
                tables.attach_facts(id, rows)?;
            }
        }

        // Replay the WAL written since the checkpoint
        let mut next_sequence = start_sequence;
        let replayed = entries.len();
        for (i, entry) in entries.into_iter().enumerate() {
            next_sequence = next_sequence.max(entry.sequence + 1);
            match entry.operation {
                Operation::AttachFacts(id) if last_truncate.is_some_and(|t| i < t) => orphaned.push(id),
                Operation::AttachFacts(id) => {
                    let rows = FactSegmentReader::read_all(&storage, id)?;
                    tables.attach_facts(id, rows)?;
                }
                Operation::TruncateFacts => {}
                operation => tables.apply(operation)?,
            }
        }
        tables.reindex();

        let wal = if writable {
            // Segments truncated right before a crash may still be on disk
            for id in orphaned {
                FactSegmentReader::remove(&storage, id)?;
            }
            // New entries must not land behind a torn tail
            for (file_sequence, valid_len) in torn {
                WAL::truncate_torn(&storage, file_sequence, valid_len)?;
            }
            Some(WAL::open(&storage, next_sequence, config.wal_sync_mode)?)
        } else {
            None
        };

        tracing::info!(
            path = %storage.base_dir.display(),
            writable,
            lemmas = tables.lemma_count(),
            editions = tables.edition_count(),
            passages = tables.passage_count(),
            replayed,
            "opened corpus store"
        );

        Ok(CorpusStore {
            config,
            storage,
            tables: RwLock::new(tables),
            wal: Mutex::new(wal),
            lemma_index: RwLock::new(None),
            generation: AtomicU64::new(0),
            _lock: lock,
        })
    }

    pub fn is_writable(&self) -> bool {
        self.wal.lock().is_some()
    }

    /// Shared view of every table; hold it only for the duration of one read
    pub fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read()
    }

    /// Bumped by every logged write; results derived from the tables are
    /// valid only for the generation they were computed at
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn log(&self, operation: &Operation) -> Result<()> {
        let mut wal = self.wal.lock();
        let wal = wal.as_mut().ok_or_else(read_only)?;
        wal.append(operation)?;
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Log then apply. Callers validate first so the log never holds an
    /// operation that fails to apply.
    fn commit(&self, tables: &mut Tables, operation: Operation) -> Result<()> {
        self.log(&operation)?;
        tables.apply(operation)
    }

    fn invalidate_lemma_index(&self) {
        *self.lemma_index.write() = None;
    }

    /// FST over normalized lemma forms, rebuilt after lemma writes
    pub fn lemma_index(&self) -> Result<Arc<LemmaIndex>> {
        if let Some(index) = self.lemma_index.read().as_ref() {
            return Ok(index.clone());
        }
        let index = Arc::new(LemmaIndex::build(&self.tables.read().lemmas)?);
        *self.lemma_index.write() = Some(index.clone());
        Ok(index)
    }

    pub fn create_lemma(&self, text: &str) -> Result<Lemma> {
        let mut tables = self.tables.write();
        if tables.lemma_by_text(text).is_some() {
            return Err(Error::new(
                ErrorKind::DuplicateConstraint,
                format!("lemma '{}' already exists", text),
            ));
        }
        let lemma = Lemma::new(LemmaId(tables.lemma_count() as u32), text.to_string());
        self.commit(&mut tables, Operation::CreateLemma(lemma.clone()))?;
        drop(tables);
        self.invalidate_lemma_index();
        Ok(lemma)
    }

    /// Returns the lemma and whether it was created
    pub fn get_or_create_lemma(&self, text: &str) -> Result<(Lemma, bool)> {
        if let Some(lemma) = self.read().lemma_by_text(text) {
            return Ok((lemma.clone(), false));
        }
        match self.create_lemma(text) {
            Ok(lemma) => Ok((lemma, true)),
            Err(e) if e.kind == ErrorKind::DuplicateConstraint => {
                let tables = self.read();
                let lemma = tables
                    .lemma_by_text(text)
                    .ok_or_else(|| Error::not_found(format!("lemma '{}'", text)))?;
                Ok((lemma.clone(), false))
            }
            Err(e) => Err(e),
        }
    }

    /// Insert a batch of definitions in one log entry. Definitions identical in
    /// lemma, gloss and source to an existing one are skipped.
    pub fn bulk_create_definitions(&self, batch: Vec<NewDefinition>) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }
        let mut tables = self.tables.write();
        let mut seen = HashSet::new();
        let mut definitions = Vec::with_capacity(batch.len());
        let mut next_id = tables.definitions.len() as u32;

        for new in batch {
            if tables.lemma(new.lemma_id).is_none() {
                return Err(Error::not_found(format!("lemma {}", new.lemma_id)));
            }
            if tables.has_definition(new.lemma_id, &new.shortdef, &new.source) || !seen.insert(new.clone()) {
                continue;
            }
            definitions.push(Definition {
                id: DefinitionId(next_id),
                lemma_id: new.lemma_id,
                shortdef: new.shortdef,
                source: new.source,
            });
            next_id += 1;
        }

        let inserted = definitions.len();
        if inserted > 0 {
            self.commit(&mut tables, Operation::CreateDefinitions(definitions))?;
        }
        Ok(inserted)
    }

    pub fn create_edition(&self, cts_urn: &str) -> Result<TextEdition> {
        let mut tables = self.tables.write();
        if tables.edition_by_urn(cts_urn).is_some() {
            return Err(Error::new(
                ErrorKind::DuplicateConstraint,
                format!("edition '{}' already exists", cts_urn),
            ));
        }
        let edition = TextEdition::new(EditionId(tables.edition_count() as u32), cts_urn.to_string());
        self.commit(&mut tables, Operation::CreateEdition(edition.clone()))?;
        Ok(edition)
    }

    /// Returns the edition and whether it was created
    pub fn get_or_create_edition(&self, cts_urn: &str) -> Result<(TextEdition, bool)> {
        if let Some(edition) = self.read().edition_by_urn(cts_urn) {
            return Ok((edition.clone(), false));
        }
        match self.create_edition(cts_urn) {
            Ok(edition) => Ok((edition, true)),
            Err(e) if e.kind == ErrorKind::DuplicateConstraint => {
                let tables = self.read();
                let edition = tables
                    .edition_by_urn(cts_urn)
                    .ok_or_else(|| Error::not_found(format!("edition '{}'", cts_urn)))?;
                Ok((edition.clone(), false))
            }
            Err(e) => Err(e),
        }
    }

    pub fn set_core(&self, edition_id: EditionId, is_core: bool) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.edition(edition_id).is_none() {
            return Err(Error::not_found(format!("edition {}", edition_id)));
        }
        self.commit(&mut tables, Operation::SetCore { edition_id, is_core })
    }

    pub fn set_lemma_counts(&self, counts: Vec<(LemmaId, u64, u64)>) -> Result<()> {
        let mut tables = self.tables.write();
        if let Some((id, _, _)) = counts.iter().find(|(id, _, _)| tables.lemma(*id).is_none()) {
            return Err(Error::not_found(format!("lemma {}", id)));
        }
        self.commit(&mut tables, Operation::SetLemmaCounts(counts))
    }

    pub fn set_token_counts(&self, counts: Vec<(EditionId, u64)>) -> Result<()> {
        let mut tables = self.tables.write();
        if let Some((id, _)) = counts.iter().find(|(id, _)| tables.edition(*id).is_none()) {
            return Err(Error::not_found(format!("edition {}", id)));
        }
        self.commit(&mut tables, Operation::SetTokenCounts(counts))
    }

    pub fn set_unaccented(&self, forms: Vec<(LemmaId, String)>) -> Result<()> {
        {
            let mut tables = self.tables.write();
            if let Some((id, _)) = forms.iter().find(|(id, _)| tables.lemma(*id).is_none()) {
                return Err(Error::not_found(format!("lemma {}", id)));
            }
            self.commit(&mut tables, Operation::SetUnaccented(forms))?;
        }
        self.invalidate_lemma_index();
        Ok(())
    }

    /// Stream a tab-separated copy buffer into a new fact segment and attach it.
    ///
    /// `columns` must name the passage table's columns in schema order. Every
    /// row's sort-key columns must equal the codec's key for its reference and
    /// every edition/lemma id must exist. Nothing is attached on failure.
    pub fn copy_passages<R: BufRead>(&self, reader: R, columns: &[&str]) -> Result<FactSegment> {
        if columns != PassageLemma::COLUMNS {
            return Err(Error::invalid_argument(format!(
                "copy columns {:?} do not match passage table {:?}",
                columns,
                PassageLemma::COLUMNS
            )));
        }
        if !self.is_writable() {
            return Err(read_only());
        }

        let id = SegmentId::new();
        let compression = if self.config.compress_facts { Compression::Lz4 } else { Compression::None };
        let mut writer = FactSegmentWriter::new(&self.storage, id, compression)?;

        let rows = match self.parse_copy_rows(reader, &mut writer) {
            Ok(rows) => rows,
            Err(e) => {
                drop(writer);
                FactSegmentReader::remove(&self.storage, id)?;
                return Err(e);
            }
        };
        let segment = writer.finish()?;

        let mut tables = self.tables.write();
        self.log(&Operation::AttachFacts(id))?;
        tables.attach_facts(id, rows)?;
        tables.reindex();

        tracing::debug!(segment = %id.0, rows = segment.row_count, bytes = segment.size_bytes, "attached fact segment");
        Ok(segment)
    }

    fn parse_copy_rows<R: BufRead>(&self, reader: R, writer: &mut FactSegmentWriter) -> Result<Vec<PassageLemma>> {
        let tables = self.read();
        let mut rows = Vec::new();

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != PassageLemma::COLUMNS.len() {
                return Err(Error::parse(format!(
                    "copy line {}: expected {} columns, found {}",
                    lineno + 1,
                    PassageLemma::COLUMNS.len(),
                    fields.len()
                )));
            }

            let edition_id = EditionId(fields[0].parse()?);
            let lemma_id = LemmaId(fields[2].parse()?);
            if tables.edition(edition_id).is_none() {
                return Err(Error::new(
                    ErrorKind::UnresolvedReference,
                    format!("copy line {}: unknown edition {}", lineno + 1, edition_id),
                ));
            }
            if tables.lemma(lemma_id).is_none() {
                return Err(Error::new(
                    ErrorKind::UnresolvedReference,
                    format!("copy line {}: unknown lemma {}", lineno + 1, lemma_id),
                ));
            }

            let row = PassageLemma::new(edition_id, fields[1], lemma_id, fields[3].parse()?)?;
            let mut levels: [LevelKey; MAX_DEPTH] = Default::default();
            for (level, literal) in levels.iter_mut().zip(&fields[4..]) {
                *level = LevelKey::from_array_literal(literal)?;
            }
            if RefKey::from_levels(levels) != row.ref_key {
                return Err(Error::invalid_argument(format!(
                    "copy line {}: sort keys disagree with reference '{}'",
                    lineno + 1,
                    row.reference
                )));
            }

            writer.append(row.clone())?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Drop every fact row and segment file (the reload contract)
    pub fn truncate_passages(&self) -> Result<usize> {
        let mut tables = self.tables.write();
        let removed = tables.passage_count();
        self.log(&Operation::TruncateFacts)?;
        for id in tables.truncate_facts() {
            FactSegmentReader::remove(&self.storage, id)?;
        }
        tracing::info!(removed, "truncated passage facts");
        Ok(removed)
    }

    /// Fold the WAL into a catalog snapshot and start a new log
    pub fn checkpoint(&self) -> Result<()> {
        let tables = self.tables.read();
        let mut wal = self.wal.lock();
        let wal = wal.as_mut().ok_or_else(read_only)?;

        wal.sync()?;
        let checkpoint = Checkpoint {
            wal_sequence: wal.sequence,
            timestamp: Utc::now(),
            catalog: tables.to_catalog(),
        };
        checkpoint.save(&self.storage)?;
        wal.rotate(&self.storage)?;
        let pruned = checkpoint.prune_wal(&self.storage)?;

        tracing::info!(sequence = checkpoint.wal_sequence, pruned, "checkpoint written");
        Ok(())
    }
}

fn read_only() -> Error {
    Error::new(ErrorKind::InvalidState, "corpus store opened read-only".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> CorpusStore {
        CorpusStore::open(Config::default().with_storage_path(dir.path())).unwrap()
    }

    #[test]
    fn duplicate_headword_is_a_constraint_error() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.create_lemma("λόγος").unwrap();
        let err = store.create_lemma("λόγος").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateConstraint);

        let (lemma, created) = store.get_or_create_lemma("λόγος").unwrap();
        assert!(!created);
        assert_eq!(lemma.id, LemmaId(0));
    }

    #[test]
    fn identical_definitions_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let lemma = store.create_lemma("λόγος").unwrap();
        let def = NewDefinition { lemma_id: lemma.id, shortdef: "word".into(), source: "dodson".into() };

        assert_eq!(store.bulk_create_definitions(vec![def.clone(), def.clone()]).unwrap(), 1);
        assert_eq!(store.bulk_create_definitions(vec![def]).unwrap(), 0);
        assert_eq!(store.read().definitions_for(lemma.id).count(), 1);
    }

    #[test]
    fn copy_rejects_wrong_column_order() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let columns = ["lemma_id", "text_edition_id", "reference", "count", "ref1", "ref2", "ref3", "ref4"];
        let err = store.copy_passages("".as_bytes(), &columns).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn copy_rejects_inconsistent_sort_keys() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.create_edition("urn:cts:greekLit:tlg0001.tlg001").unwrap();
        store.create_lemma("καί").unwrap();

        let line = "0\t1.2\t0\t1\t{\"0001\"}\t{\"0003\"}\t{}\t{}\n";
        let err = store.copy_passages(line.as_bytes(), &PassageLemma::COLUMNS).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert_eq!(store.read().passage_count(), 0);
        assert!(std::fs::read_dir(&store.storage.facts_dir).unwrap().next().is_none());
    }

    #[test]
    fn second_writer_is_refused() {
        let dir = TempDir::new().unwrap();
        let _first = store(&dir);
        let err = CorpusStore::open(Config::default().with_storage_path(dir.path())).err().unwrap();
        assert_eq!(err.kind, ErrorKind::InvalidState);
        assert!(CorpusStore::open_read_only(Config::default().with_storage_path(dir.path())).is_ok());
    }

    #[test]
    fn read_only_store_rejects_writes() {
        let dir = TempDir::new().unwrap();
        drop(store(&dir));
        let ro = CorpusStore::open_read_only(Config::default().with_storage_path(dir.path())).unwrap();
        assert_eq!(ro.create_lemma("x").unwrap_err().kind, ErrorKind::InvalidState);
        // Read-only rejection must not leave the table changed
        assert_eq!(ro.read().lemma_count(), 0);
    }

    #[test]
    fn state_survives_checkpoint_and_replay() {
        let dir = TempDir::new().unwrap();
        {
            let store = store(&dir);
            let ed = store.create_edition("urn:cts:greekLit:tlg0012.tlg001.perseus-grc2").unwrap();
            store.create_lemma("μῆνις").unwrap();
            store.checkpoint().unwrap();
            store.set_core(ed.id, true).unwrap();
            store.create_lemma("ἀείδω").unwrap();
        }
        let store = store(&dir);
        let tables = store.read();
        assert_eq!(tables.lemma_count(), 2);
        assert!(tables.is_core(EditionId(0)));
        assert_eq!(tables.lemma_by_text("ἀείδω").unwrap().id, LemmaId(1));
    }

    #[test]
    fn writes_after_torn_wal_tail_survive_reopen() {
        use std::io::Write;

        let dir = TempDir::new().unwrap();
        {
            let store = store(&dir);
            store.create_lemma("μῆνις").unwrap();
            store.checkpoint().unwrap();
        }
        let storage = StorageLayout::new(dir.path().to_path_buf()).unwrap();
        let last = *WAL::find_wal_files(&storage).unwrap().last().unwrap();
        let mut file = std::fs::OpenOptions::new().append(true).open(storage.wal_path(last)).unwrap();
        file.write_all(&[200, 0, 0, 0, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7]).unwrap();
        drop(file);

        {
            let store = store(&dir);
            store.create_lemma("ἀείδω").unwrap();
            store.create_lemma("θεά").unwrap();
        }
        let store = store(&dir);
        let tables = store.read();
        assert_eq!(tables.lemma_count(), 3);
        assert_eq!(tables.lemma_by_text("θεά").unwrap().id, LemmaId(2));
    }
}
