pub mod core;
pub mod reference;
pub mod analysis;
pub mod storage;
pub mod corpus;
pub mod loader;
pub mod aggregate;
pub mod ranking;

pub use crate::core::config::Config;
pub use crate::core::database::CorpusDatabase;
pub use crate::core::error::{Error, ErrorKind, Result};

/*
┌──────────────────────────────────────────────────────────────────────────────┐
│                           DEEPVOCAB DATA FLOW                                │
└──────────────────────────────────────────────────────────────────────────────┘

  editions.txt ─┐
  dictionary.txt├──► BulkLoader ──► CorpusStore ──► AggregateMaintainer
  passages.txt ─┘      │  (id maps)     │                 │
                       │                │                 ▼
                       ▼                │           OverallTotals (memoized)
                  CopyBuffer ───────────┤                 │
                  (tab text, 8 cols)    │                 ▼
                                        └──────────► RankingEngine ──► callers
                                                    list_lemmas / word_list /
                                                    lemma_detail / editions

┌────────────────────────────── CorpusStore ───────────────────────────────────┐
│  tables: RwLock<Tables>         lemmas, definitions, editions, passages      │
│  wal: WAL                       bincode, length-prefixed catalog ops         │
│  meta/catalog.bin               checkpoint snapshot (tempfile + rename)      │
│  facts/<id>.fct                 immutable passage segments (lz4, crc32)      │
│  .lock                          flock, one writer per directory              │
└──────────────────────────────────────────────────────────────────────────────┘

  PassageLemma.ref_key = [ref1, ref2, ref3, ref4]
    "1.12a" → [{"0001"}, {"0012","a"}, {}, {}]
*/
