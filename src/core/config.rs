use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::core::error::Result;
use crate::storage::wal::SyncMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_path: PathBuf,

    // Bulk loader
    pub definition_batch_size: usize,           // Definitions flushed per bulk insert
    pub wal_sync_mode: SyncMode,
    pub compress_facts: bool,                   // LZ4 fact segment bodies

    // Ranking
    pub page_size: usize,                       // Lemma listing page size
    pub preferred_definition_source: Option<String>,
    pub result_cache_size: usize,               // Word-list LRU entries

    pub worker_threads: usize,                  // Rayon pool for aggregate passes
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: PathBuf::from("./data"),
            definition_batch_size: 200,
            wal_sync_mode: SyncMode::Batch,
            compress_facts: true,
            page_size: 100,
            preferred_definition_source: None,
            result_cache_size: 64,
            worker_threads: num_cpus::get(),
        }
    }
}

impl Config {
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    /// Load a JSON config file; missing keys fall back to defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config = serde_json::from_str(&data)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{"page_size": 25}"#).unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.definition_batch_size, 200);
        assert!(config.compress_facts);
    }
}
