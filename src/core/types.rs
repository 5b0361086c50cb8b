use serde::{Serialize, Deserialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LemmaId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EditionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DefinitionId(pub u32);

impl LemmaId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl EditionId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for LemmaId {
    fn from(id: u32) -> Self {
        LemmaId(id)
    }
}

impl From<u32> for EditionId {
    fn from(id: u32) -> Self {
        EditionId(id)
    }
}

impl fmt::Display for LemmaId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EditionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Occurrence totals over the whole corpus and over core editions only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub corpus: u64,
    pub core: u64,
}
