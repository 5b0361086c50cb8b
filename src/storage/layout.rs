use std::path::PathBuf;
use std::fs;
use crate::core::error::Result;
use crate::storage::fact_segment::SegmentId;

/// Directory structure for data files
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,      // Root directory
    pub facts_dir: PathBuf,     // Passage-lemma fact segments (.fct files)
    pub wal_dir: PathBuf,       // Write-ahead log location
    pub meta_dir: PathBuf,      // Catalog checkpoint location
}

impl StorageLayout {
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        let facts_dir = base_dir.join("facts");
        let wal_dir = base_dir.join("wal");
        let meta_dir = base_dir.join("meta");

        fs::create_dir_all(&facts_dir)?;
        fs::create_dir_all(&wal_dir)?;
        fs::create_dir_all(&meta_dir)?;

        Ok(StorageLayout {
            base_dir,
            facts_dir,
            wal_dir,
            meta_dir,
        })
    }

    pub fn fact_path(&self, id: &SegmentId) -> PathBuf {
        self.facts_dir.join(format!("{}.fct", id.0))
    }

    pub fn wal_path(&self, sequence: u64) -> PathBuf {
        self.wal_dir.join(format!("wal_{:08}.log", sequence))
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.meta_dir.join("catalog.bin")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.base_dir.join(".lock")
    }

    pub fn wal_dir(&self) -> &PathBuf {
        &self.wal_dir
    }
}
