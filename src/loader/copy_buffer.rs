use std::fmt::Write as _;
use std::io::Cursor;
use crate::core::error::{Error, Result};
use crate::corpus::models::PassageLemma;

/// Tab-separated text buffer in the passage table's column order, streamed
/// into the store in one bulk copy
#[derive(Debug, Default)]
pub struct CopyBuffer {
    text: String,
    rows: usize,
}

impl CopyBuffer {
    pub const COLUMNS: [&'static str; 8] = PassageLemma::COLUMNS;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: &PassageLemma) -> Result<()> {
        if row.reference.contains(['\t', '\n', '\r']) {
            return Err(Error::invalid_argument(format!(
                "reference {:?} contains a copy delimiter",
                row.reference
            )));
        }
        let [ref1, ref2, ref3, ref4] = row.ref_key.levels();
        // Writing to a String cannot fail
        let _ = writeln!(
            self.text,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.edition_id.0, row.reference, row.lemma_id.0, row.count, ref1, ref2, ref3, ref4
        );
        self.rows += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn size_bytes(&self) -> usize {
        self.text.len()
    }

    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.text.as_bytes())
    }
}
