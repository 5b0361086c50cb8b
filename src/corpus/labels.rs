use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use crate::core::error::{Error, Result};

pub const UNKNOWN_LABEL: &str = "unknown";

/// Display labels for text-group and work URNs
#[derive(Debug, Clone, Default)]
pub struct CatalogLabels {
    pub labels: HashMap<String, String>,
}

impl CatalogLabels {
    pub fn new() -> Self {
        CatalogLabels::default()
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Lines of `urn|label`
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut labels = HashMap::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (urn, label) = line
                .split_once('|')
                .ok_or_else(|| Error::parse(format!("labels line {}: expected urn|label", lineno + 1)))?;
            labels.insert(urn.to_string(), label.to_string());
        }
        Ok(CatalogLabels { labels })
    }

    pub fn insert(&mut self, urn: &str, label: &str) {
        self.labels.insert(urn.to_string(), label.to_string());
    }

    pub fn label(&self, urn: &str) -> &str {
        self.labels.get(urn).map(String::as_str).unwrap_or(UNKNOWN_LABEL)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_urns_fall_back() {
        let labels = CatalogLabels::from_reader("urn:cts:greekLit:tlg0012|Homer\n\n".as_bytes()).unwrap();
        assert_eq!(labels.label("urn:cts:greekLit:tlg0012"), "Homer");
        assert_eq!(labels.label("urn:cts:greekLit:tlg9999"), UNKNOWN_LABEL);
        assert!(CatalogLabels::from_reader("no-separator".as_bytes()).is_err());
    }
}
