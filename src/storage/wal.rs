use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{EditionId, LemmaId};
use crate::corpus::models::{Definition, Lemma, TextEdition};
use crate::storage::fact_segment::SegmentId;
use crate::storage::layout::StorageLayout;

const BATCH_SYNC_BYTES: u64 = 1024 * 1024;
const MAX_ENTRY_BYTES: usize = 256 * 1024 * 1024;

/// Write-ahead log of catalog mutations. Fact rows never pass through here;
/// they land in fact segments and only the attachment is logged.
pub struct WAL {
    pub file: File,
    pub position: u64,
    pub sync_mode: SyncMode,
    pub sequence: u64,
    pub unsynced: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    Immediate,  // fsync after every write
    Batch,      // fsync once a megabyte has accumulated
    None,       // Let OS handle it
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WALEntry {
    pub sequence: u64,
    pub operation: Operation,
    pub timestamp: DateTime<Utc>,
}

/// Serialized identically to `WALEntry`, without cloning the operation
#[derive(Serialize)]
struct WALEntryRef<'a> {
    sequence: u64,
    operation: &'a Operation,
    timestamp: DateTime<Utc>,
}

/// Decoded contents of one log file
#[derive(Debug)]
pub struct WALContents {
    pub entries: Vec<WALEntry>,
    /// Bytes covered by complete entries
    pub valid_len: u64,
    pub file_len: u64,
}

impl WALContents {
    pub fn is_torn(&self) -> bool {
        self.file_len > self.valid_len
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    CreateLemma(Lemma),
    CreateDefinitions(Vec<Definition>),
    CreateEdition(TextEdition),
    SetCore { edition_id: EditionId, is_core: bool },
    SetLemmaCounts(Vec<(LemmaId, u64, u64)>),
    SetTokenCounts(Vec<(EditionId, u64)>),
    SetUnaccented(Vec<(LemmaId, String)>),
    AttachFacts(SegmentId),
    TruncateFacts,
}

impl WAL {
    pub fn open(storage: &StorageLayout, sequence: u64, sync_mode: SyncMode) -> Result<Self> {
        let path = storage.wal_path(sequence);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let position = file.metadata()?.len();

        Ok(WAL {
            file,
            position,
            sync_mode,
            sequence,
            unsynced: 0,
        })
    }

    pub fn append(&mut self, operation: &Operation) -> Result<()> {
        let entry = WALEntryRef {
            sequence: self.sequence,
            operation,
            timestamp: Utc::now(),
        };

        let data = bincode::serialize(&entry)?;
        let len = data.len() as u32;

        // Write length + data
        self.file.write_all(&len.to_le_bytes())?;
        self.file.write_all(&data)?;

        self.sequence += 1;
        self.position += 4 + data.len() as u64;
        self.unsynced += 4 + data.len() as u64;

        match self.sync_mode {
            SyncMode::Immediate => self.sync()?,
            SyncMode::Batch if self.unsynced >= BATCH_SYNC_BYTES => self.sync()?,
            _ => {}
        }

        Ok(())
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Start a fresh log file at the current sequence
    pub fn rotate(&mut self, storage: &StorageLayout) -> Result<()> {
        self.sync()?;
        let new_wal = WAL::open(storage, self.sequence, self.sync_mode)?;
        *self = new_wal;
        Ok(())
    }

    /// Read every entry of one log file. A torn trailing entry (crash mid-append,
    /// or a reader racing the writer) ends the log; `valid_len` marks where it starts.
    pub fn read_entries(storage: &StorageLayout, sequence: u64) -> Result<WALContents> {
        let mut entries = Vec::new();
        let mut valid_len = 0u64;
        let mut file = File::open(storage.wal_path(sequence))?;

        loop {
            let mut len_buf = [0u8; 4];
            match file.read_exact(&mut len_buf) {
                Ok(_) => {},
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(Error::new(ErrorKind::Io, format!("Failed to read WAL: {}", e))),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_ENTRY_BYTES {
                return Err(Error::new(ErrorKind::Corrupted, "WAL entry too large, possibly corrupted".to_string()));
            }

            let mut data = vec![0u8; len];
            match file.read_exact(&mut data) {
                Ok(_) => {},
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            entries.push(bincode::deserialize::<WALEntry>(&data)?);
            valid_len += 4 + len as u64;
        }

        let file_len = file.metadata()?.len();
        if file_len > valid_len {
            tracing::warn!(sequence, torn_bytes = file_len - valid_len, "ignoring torn WAL tail");
        }
        Ok(WALContents { entries, valid_len, file_len })
    }

    /// Cut a torn tail off a log file so later appends follow the last
    /// complete entry. Returns whether anything was removed.
    pub fn truncate_torn(storage: &StorageLayout, sequence: u64, valid_len: u64) -> Result<bool> {
        let file = OpenOptions::new().write(true).open(storage.wal_path(sequence))?;
        if file.metadata()?.len() <= valid_len {
            return Ok(false);
        }
        file.set_len(valid_len)?;
        file.sync_all()?;
        Ok(true)
    }

    /// Start sequences of all WAL files, ascending
    pub fn find_wal_files(storage: &StorageLayout) -> Result<Vec<u64>> {
        let mut sequences = Vec::new();
        let wal_dir = storage.wal_dir();

        if wal_dir.exists() {
            for entry in std::fs::read_dir(wal_dir)? {
                let path = entry?.path();
                if path.extension().and_then(|s| s.to_str()) != Some("log") {
                    continue;
                }
                // wal_00000000.log
                let seq = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| stem.strip_prefix("wal_"))
                    .and_then(|seq| seq.parse::<u64>().ok());
                if let Some(seq) = seq {
                    sequences.push(seq);
                }
            }
        }

        sequences.sort();
        Ok(sequences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf()).unwrap();

        let mut wal = WAL::open(&storage, 0, SyncMode::None).unwrap();
        wal.append(&Operation::TruncateFacts).unwrap();
        wal.append(&Operation::SetCore { edition_id: EditionId(3), is_core: true }).unwrap();
        wal.sync().unwrap();

        let entries = WAL::read_entries(&storage, 0).unwrap().entries;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].sequence, 1);
        assert_eq!(entries[1].operation, Operation::SetCore { edition_id: EditionId(3), is_core: true });
    }

    #[test]
    fn torn_tail_is_dropped() {
        let dir = TempDir::new().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf()).unwrap();

        let mut wal = WAL::open(&storage, 0, SyncMode::None).unwrap();
        wal.append(&Operation::TruncateFacts).unwrap();
        wal.file.write_all(&100u32.to_le_bytes()).unwrap();
        wal.file.write_all(&[1, 2, 3]).unwrap();

        let contents = WAL::read_entries(&storage, 0).unwrap();
        assert_eq!(contents.entries.len(), 1);
        assert!(contents.is_torn());
    }

    #[test]
    fn appends_after_truncating_torn_tail_are_readable() {
        let dir = TempDir::new().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf()).unwrap();

        let mut wal = WAL::open(&storage, 0, SyncMode::None).unwrap();
        wal.file.write_all(&[9, 0, 0, 0, 1, 2]).unwrap();
        drop(wal);

        let contents = WAL::read_entries(&storage, 0).unwrap();
        assert!(contents.entries.is_empty());
        assert!(WAL::truncate_torn(&storage, 0, contents.valid_len).unwrap());
        assert!(!WAL::truncate_torn(&storage, 0, contents.valid_len).unwrap());

        let mut wal = WAL::open(&storage, 0, SyncMode::None).unwrap();
        assert_eq!(wal.position, 0);
        wal.append(&Operation::TruncateFacts).unwrap();
        wal.sync().unwrap();

        let contents = WAL::read_entries(&storage, 0).unwrap();
        assert_eq!(contents.entries.len(), 1);
        assert!(!contents.is_torn());
    }

    #[test]
    fn rotation_creates_new_file() {
        let dir = TempDir::new().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf()).unwrap();

        let mut wal = WAL::open(&storage, 0, SyncMode::Batch).unwrap();
        wal.append(&Operation::TruncateFacts).unwrap();
        wal.rotate(&storage).unwrap();
        wal.append(&Operation::TruncateFacts).unwrap();

        assert_eq!(WAL::find_wal_files(&storage).unwrap(), vec![0, 1]);
    }
}
