use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use serde::Serialize;
use crate::core::error::Result;
use crate::corpus::store::CorpusStore;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoreMarkReport {
    pub prefixes: usize,
    pub marked: usize,          // Editions whose core flag was set
    pub unmatched: Vec<String>, // Prefixes that matched no edition
}

/// Set the core flag on every edition whose URN starts with one of the
/// prefixes. A prefix matching nothing is reported, not an error.
pub fn mark_core<R: BufRead>(store: &CorpusStore, reader: R) -> Result<CoreMarkReport> {
    let mut report = CoreMarkReport::default();

    for line in reader.lines() {
        let line = line?;
        let prefix = line.trim();
        if prefix.is_empty() {
            continue;
        }
        report.prefixes += 1;

        let matches: Vec<_> = store
            .read()
            .editions_with_prefix(prefix)
            .into_iter()
            .map(|edition| (edition.id, edition.is_core))
            .collect();
        if matches.is_empty() {
            tracing::warn!(prefix, "core prefix matched no edition");
            report.unmatched.push(prefix.to_string());
            continue;
        }

        for (id, is_core) in matches {
            if !is_core {
                store.set_core(id, true)?;
            }
            report.marked += 1;
        }
    }

    tracing::info!(
        prefixes = report.prefixes,
        marked = report.marked,
        unmatched = report.unmatched.len(),
        "core marking finished"
    );
    Ok(report)
}

pub fn mark_core_file<P: AsRef<Path>>(store: &CorpusStore, path: P) -> Result<CoreMarkReport> {
    mark_core(store, BufReader::new(File::open(path)?))
}
