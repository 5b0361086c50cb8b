use std::fs;
use std::io::Write;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use crate::core::error::{Error, ErrorKind, Result};
use crate::corpus::models::{Definition, Lemma, TextEdition};
use crate::storage::fact_segment::SegmentId;
use crate::storage::layout::StorageLayout;
use crate::storage::wal::WAL;

/// Snapshot of every catalog table plus the attached fact segments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub lemmas: Vec<Lemma>,
    pub definitions: Vec<Definition>,
    pub editions: Vec<TextEdition>,
    pub fact_segments: Vec<SegmentId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub wal_sequence: u64,      // First WAL entry not folded into the catalog
    pub timestamp: DateTime<Utc>,
    pub catalog: Catalog,
}

impl Checkpoint {
    pub fn load(storage: &StorageLayout) -> Result<Option<Self>> {
        let path = storage.checkpoint_path();
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read(path)?;
        let checkpoint = bincode::deserialize(&data)?;
        Ok(Some(checkpoint))
    }

    /// Write via a temp file and rename so a crash never leaves a half catalog
    pub fn save(&self, storage: &StorageLayout) -> Result<()> {
        let data = bincode::serialize(self)?;
        let mut tmp = NamedTempFile::new_in(&storage.meta_dir)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(storage.checkpoint_path())
            .map_err(|e| Error::new(ErrorKind::Io, format!("Failed to persist checkpoint: {}", e)))?;
        Ok(())
    }

    /// Drop WAL files whose entries are all older than this checkpoint
    pub fn prune_wal(&self, storage: &StorageLayout) -> Result<usize> {
        let files = WAL::find_wal_files(storage)?;
        let mut removed = 0;
        // A file starting at `seq` holds entries up to the next file's start
        for pair in files.windows(2) {
            if pair[1] <= self.wal_sequence {
                fs::remove_file(storage.wal_path(pair[0]))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
