use std::collections::BTreeMap;
use fst::{IntoStreamer, Map, MapBuilder, Streamer};
use crate::core::error::Result;
use crate::core::types::LemmaId;
use crate::corpus::models::Lemma;

/// FST over normalized lemma forms for exact, prefix and suffix lookup.
/// Several headwords can share one normalized form, so map values index `groups`.
pub struct LemmaIndex {
    forward: Map<Vec<u8>>,
    reversed: Map<Vec<u8>>,
    groups: Vec<Vec<LemmaId>>,
}

impl LemmaIndex {
    pub fn build(lemmas: &[Lemma]) -> Result<Self> {
        let mut by_form: BTreeMap<&str, Vec<LemmaId>> = BTreeMap::new();
        for lemma in lemmas {
            by_form.entry(lemma.unaccented.as_str()).or_default().push(lemma.id);
        }

        let mut forward = MapBuilder::memory();
        let mut reversed_keys = Vec::with_capacity(by_form.len());
        let mut groups = Vec::with_capacity(by_form.len());

        // BTreeMap iterates in byte order, which is what the FST requires
        for (group, (form, ids)) in by_form.into_iter().enumerate() {
            forward.insert(form.as_bytes(), group as u64)?;
            reversed_keys.push((form.chars().rev().collect::<String>(), group as u64));
            groups.push(ids);
        }
        reversed_keys.sort();

        let mut reversed = MapBuilder::memory();
        for (key, group) in &reversed_keys {
            reversed.insert(key.as_bytes(), *group)?;
        }

        Ok(LemmaIndex {
            forward: forward.into_map(),
            reversed: reversed.into_map(),
            groups,
        })
    }

    pub fn exact(&self, form: &str) -> Vec<LemmaId> {
        self.forward
            .get(form.as_bytes())
            .map(|group| self.groups[group as usize].clone())
            .unwrap_or_default()
    }

    pub fn prefix(&self, prefix: &str) -> Vec<LemmaId> {
        self.scan_prefix(&self.forward, prefix.as_bytes())
    }

    pub fn suffix(&self, suffix: &str) -> Vec<LemmaId> {
        let reversed: String = suffix.chars().rev().collect();
        self.scan_prefix(&self.reversed, reversed.as_bytes())
    }

    pub fn contains(&self, needle: &str) -> Vec<LemmaId> {
        let mut results = Vec::new();
        let mut stream = self.forward.stream();
        while let Some((form, group)) = stream.next() {
            if String::from_utf8_lossy(form).contains(needle) {
                results.extend_from_slice(&self.groups[group as usize]);
            }
        }
        results
    }

    fn scan_prefix(&self, map: &Map<Vec<u8>>, prefix: &[u8]) -> Vec<LemmaId> {
        let mut results = Vec::new();
        let mut stream = map.range().ge(prefix).into_stream();
        while let Some((form, group)) = stream.next() {
            if !form.starts_with(prefix) {
                break;
            }
            results.extend_from_slice(&self.groups[group as usize]);
        }
        results
    }

    pub fn form_count(&self) -> usize {
        self.groups.len()
    }
}
