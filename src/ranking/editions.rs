use std::collections::BTreeMap;
use serde::Serialize;
use crate::core::types::EditionId;
use crate::corpus::labels::CatalogLabels;
use crate::corpus::tables::Tables;

#[derive(Debug, Clone, Serialize)]
pub struct EditionEntry {
    pub id: EditionId,
    pub cts_urn: String,
    pub work_urn: String,
    pub work_label: String,
    pub is_core: bool,
    pub token_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextGroup {
    pub urn: String,
    pub label: String,
    pub editions: Vec<EditionEntry>,
}

/// Editions grouped by text group, both in URN order
pub fn list_editions(tables: &Tables, labels: &CatalogLabels, core_only: bool) -> Vec<TextGroup> {
    let mut groups: BTreeMap<String, Vec<EditionEntry>> = BTreeMap::new();

    // edition_by_urn is a BTreeMap, so entries arrive sorted
    for id in tables.edition_by_urn.values() {
        let Some(edition) = tables.edition(*id) else { continue };
        if core_only && !edition.is_core {
            continue;
        }
        groups.entry(edition.text_group_urn()).or_default().push(EditionEntry {
            id: edition.id,
            cts_urn: edition.cts_urn.clone(),
            work_urn: edition.work_urn(),
            work_label: edition.work_label(labels).to_string(),
            is_core: edition.is_core,
            token_count: edition.token_count,
        });
    }

    groups
        .into_iter()
        .map(|(urn, editions)| TextGroup {
            label: labels.label(&urn).to_string(),
            urn,
            editions,
        })
        .collect()
}
