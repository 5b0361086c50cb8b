use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, ErrorKind, Result};

/// Hierarchy levels held by the passage table's sort-key columns
pub const MAX_DEPTH: usize = 4;

/// Digit runs are zero-padded to at least this width
pub const PAD_WIDTH: usize = 4;

static RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+|[^0-9]+").expect("static digit-run pattern"));

/// Natural sort key of one hierarchy level: alternating digit/non-digit runs,
/// digit runs zero-padded. Ordering is element-wise, shorter sequence first.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LevelKey(pub Vec<String>);

impl LevelKey {
    pub fn from_segment(segment: &str) -> Self {
        LevelKey(
            RUNS.find_iter(segment)
                .map(|m| {
                    let run = m.as_str();
                    if run.bytes().all(|b| b.is_ascii_digit()) {
                        pad_digits(run)
                    } else {
                        run.to_string()
                    }
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// Parse the `{"0001","a"}` array literal written into copy buffers.
    /// Tokens are always quoted; `\"` and `\\` escape inside a token.
    pub fn from_array_literal(literal: &str) -> Result<Self> {
        let malformed = || Error::parse(format!("malformed sort-key array '{}'", literal));
        let inner = literal
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(malformed)?;

        if inner.is_empty() {
            return Ok(LevelKey::default());
        }

        let mut tokens = Vec::new();
        let mut chars = inner.chars();
        loop {
            if chars.next() != Some('"') {
                return Err(malformed());
            }
            let mut token = String::new();
            loop {
                match chars.next() {
                    Some('\\') => token.push(chars.next().ok_or_else(malformed)?),
                    Some('"') => break,
                    Some(c) => token.push(c),
                    None => return Err(malformed()),
                }
            }
            tokens.push(token);

            match chars.next() {
                None => break,
                Some(',') => {}
                Some(_) => return Err(malformed()),
            }
        }
        Ok(LevelKey(tokens))
    }
}

impl fmt::Display for LevelKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "\"")?;
            for c in token.chars() {
                if c == '"' || c == '\\' {
                    write!(f, "\\")?;
                }
                write!(f, "{}", c)?;
            }
            write!(f, "\"")?;
        }
        write!(f, "}}")
    }
}

fn pad_digits(run: &str) -> String {
    format!("{:0>width$}", run, width = PAD_WIDTH)
}

/// Split a reference into at most `depth` levels and key each one.
/// Absent levels are padded with empty keys.
pub fn natural_sort_key(reference: &str, depth: usize) -> Result<Vec<LevelKey>> {
    let segments: Vec<&str> = reference.split('.').collect();
    if segments.len() > depth {
        return Err(Error::new(
            ErrorKind::SchemaDepthExceeded,
            format!(
                "reference '{}' has {} levels; schema holds {}",
                reference,
                segments.len(),
                depth
            ),
        ));
    }

    let mut keys: Vec<LevelKey> = segments.into_iter().map(LevelKey::from_segment).collect();
    keys.resize(depth, LevelKey::default());
    Ok(keys)
}

/// The four sort-key columns of a passage reference
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RefKey(pub [LevelKey; MAX_DEPTH]);

impl RefKey {
    pub fn parse(reference: &str) -> Result<Self> {
        let keys = natural_sort_key(reference, MAX_DEPTH)?;
        let mut levels: [LevelKey; MAX_DEPTH] = Default::default();
        for (slot, key) in levels.iter_mut().zip(keys) {
            *slot = key;
        }
        Ok(RefKey(levels))
    }

    pub fn from_levels(levels: [LevelKey; MAX_DEPTH]) -> Self {
        RefKey(levels)
    }

    pub fn level(&self, i: usize) -> &LevelKey {
        &self.0[i]
    }

    pub fn levels(&self) -> &[LevelKey; MAX_DEPTH] {
        &self.0
    }

    /// Number of levels up to and including the last non-empty one
    pub fn depth(&self) -> usize {
        self.0
            .iter()
            .rposition(|level| !level.is_empty())
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Compare only the first `depth` levels
    pub fn cmp_prefix(&self, other: &RefKey, depth: usize) -> Ordering {
        let depth = depth.min(MAX_DEPTH);
        self.0[..depth].cmp(&other.0[..depth])
    }
}
