use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use chrono::{DateTime, Utc};
use crc32fast::Hasher;
use memmap2::MmapOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::core::error::{Error, ErrorKind, Result};
use crate::corpus::models::PassageLemma;
use crate::storage::layout::StorageLayout;

/// Unique fact segment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    pub fn new() -> Self {
        SegmentId(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None = 0,
    Lz4 = 1,
}

/// Segment file header
///
/// ```text
/// [ magic "DVFS" | version u32 | row_count u64 | crc32 u32 | compression u8 | pad 3 ]
/// [ block: len u32 | bincode Vec<PassageLemma>, optionally lz4 ] ...
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactHeader {
    pub version: u32,
    pub row_count: u64,
    pub checksum: u32,
    pub compression: Compression,
}

/// Presizing the decode buffer assumes at least this many body bytes per row
const MIN_ROW_BYTES: usize = 16;

impl FactHeader {
    pub const MAGIC: [u8; 4] = *b"DVFS";
    pub const VERSION: u32 = 1;
    pub const SIZE: usize = 24;

    fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&Self::MAGIC);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..16].copy_from_slice(&self.row_count.to_le_bytes());
        buf[16..20].copy_from_slice(&self.checksum.to_le_bytes());
        buf[20] = self.compression as u8;
        buf
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE || buf[0..4] != Self::MAGIC {
            return Err(Error::new(ErrorKind::Corrupted, "not a fact segment".to_string()));
        }
        let word = |range: std::ops::Range<usize>| {
            let mut b = [0u8; 4];
            b.copy_from_slice(&buf[range]);
            u32::from_le_bytes(b)
        };
        let mut count = [0u8; 8];
        count.copy_from_slice(&buf[8..16]);
        let compression = match buf[20] {
            0 => Compression::None,
            1 => Compression::Lz4,
            other => {
                return Err(Error::new(ErrorKind::Corrupted, format!("unknown compression tag {}", other)));
            }
        };
        Ok(FactHeader {
            version: word(4..8),
            row_count: u64::from_le_bytes(count),
            checksum: word(16..20),
            compression,
        })
    }
}

/// Metadata of a finished segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactSegment {
    pub id: SegmentId,
    pub row_count: u64,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Streams passage rows into one immutable segment file
pub struct FactSegmentWriter {
    pub id: SegmentId,
    pub file: File,
    pub pending: Vec<PassageLemma>,
    pub hasher: Hasher,
    pub row_count: u64,
    pub compression: Compression,
    pub block_rows: usize,
}

impl FactSegmentWriter {
    pub const DEFAULT_BLOCK_ROWS: usize = 16 * 1024;

    pub fn new(storage: &StorageLayout, id: SegmentId, compression: Compression) -> Result<Self> {
        let mut file = File::create(storage.fact_path(&id))?;
        // Placeholder, rewritten by finish()
        file.write_all(&[0u8; FactHeader::SIZE])?;

        Ok(FactSegmentWriter {
            id,
            file,
            pending: Vec::with_capacity(Self::DEFAULT_BLOCK_ROWS),
            hasher: Hasher::new(),
            row_count: 0,
            compression,
            block_rows: Self::DEFAULT_BLOCK_ROWS,
        })
    }

    pub fn append(&mut self, row: PassageLemma) -> Result<()> {
        self.pending.push(row);
        self.row_count += 1;
        if self.pending.len() >= self.block_rows {
            self.flush_block()?;
        }
        Ok(())
    }

    fn flush_block(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let raw = bincode::serialize(&self.pending)?;
        let block = match self.compression {
            Compression::None => raw,
            Compression::Lz4 => lz4_flex::compress_prepend_size(&raw),
        };
        let len = (block.len() as u32).to_le_bytes();

        self.hasher.update(&len);
        self.hasher.update(&block);
        self.file.write_all(&len)?;
        self.file.write_all(&block)?;
        self.pending.clear();
        Ok(())
    }

    pub fn finish(mut self) -> Result<FactSegment> {
        self.flush_block()?;

        let header = FactHeader {
            version: FactHeader::VERSION,
            row_count: self.row_count,
            checksum: self.hasher.clone().finalize(),
            compression: self.compression,
        };
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header.encode())?;
        self.file.sync_all()?;

        Ok(FactSegment {
            id: self.id,
            row_count: self.row_count,
            size_bytes: self.file.metadata()?.len(),
            created_at: Utc::now(),
        })
    }
}

pub struct FactSegmentReader;

impl FactSegmentReader {
    /// Map the segment, verify its checksum and decode every row
    pub fn read_all(storage: &StorageLayout, id: SegmentId) -> Result<Vec<PassageLemma>> {
        let file = File::open(storage.fact_path(&id))?;
        let len = file.metadata()?.len() as usize;
        if len < FactHeader::SIZE {
            return Err(Error::new(ErrorKind::Corrupted, format!("fact segment {} is truncated", id.0)));
        }

        // SAFETY: segments are immutable once attached
        let mmap = unsafe { MmapOptions::new().len(len).map(&file)? };
        let header = FactHeader::decode(&mmap[..FactHeader::SIZE])?;
        if header.version != FactHeader::VERSION {
            return Err(Error::new(
                ErrorKind::Corrupted,
                format!("fact segment {} has version {}", id.0, header.version),
            ));
        }

        let body = &mmap[FactHeader::SIZE..];
        let mut hasher = Hasher::new();
        hasher.update(body);
        if hasher.finalize() != header.checksum {
            return Err(Error::new(ErrorKind::Corrupted, format!("fact segment {} checksum mismatch", id.0)));
        }

        // The row count sits outside the checksum, so the body bounds the allocation
        let mut rows = Vec::with_capacity((header.row_count as usize).min(body.len() / MIN_ROW_BYTES));
        let mut pos = 0;
        while pos < body.len() {
            if pos + 4 > body.len() {
                return Err(Error::new(ErrorKind::Corrupted, "dangling block length".to_string()));
            }
            let mut len_buf = [0u8; 4];
            len_buf.copy_from_slice(&body[pos..pos + 4]);
            let block_len = u32::from_le_bytes(len_buf) as usize;
            pos += 4;
            let block = body
                .get(pos..pos + block_len)
                .ok_or_else(|| Error::new(ErrorKind::Corrupted, "block overruns segment".to_string()))?;
            pos += block_len;

            let decoded: Vec<PassageLemma> = match header.compression {
                Compression::None => bincode::deserialize(block)?,
                Compression::Lz4 => bincode::deserialize(&lz4_flex::decompress_size_prepended(block)?)?,
            };
            rows.extend(decoded);
        }

        if rows.len() as u64 != header.row_count {
            return Err(Error::new(
                ErrorKind::Corrupted,
                format!("fact segment {} holds {} rows, header says {}", id.0, rows.len(), header.row_count),
            ));
        }
        Ok(rows)
    }

    pub fn remove(storage: &StorageLayout, id: SegmentId) -> Result<()> {
        let path = storage.fact_path(&id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
