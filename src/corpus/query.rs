use crate::core::error::Result;
use crate::core::types::{EditionId, LemmaId};
use crate::reference::predicate::RefPredicate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefOrder {
    #[default]
    Unordered,
    Ascending,
    Descending,
}

/// Filter over passage-lemma rows, executed by `Tables::query`
#[derive(Debug, Clone, Default)]
pub struct PassageQuery {
    pub edition: Option<EditionId>,
    pub lemma: Option<LemmaId>,
    pub include: Vec<RefPredicate>,
    pub exclude: Vec<RefPredicate>,
    pub order: RefOrder,
}

impl PassageQuery {
    pub fn new() -> Self {
        PassageQuery::default()
    }

    pub fn edition(mut self, edition: EditionId) -> Self {
        self.edition = Some(edition);
        self
    }

    pub fn lemma(mut self, lemma: LemmaId) -> Self {
        self.lemma = Some(lemma);
        self
    }

    /// Keep rows whose leading levels equal the levels `reference` gives
    pub fn filter_by_ref(mut self, reference: &str) -> Result<Self> {
        self.include.push(RefPredicate::prefix(reference)?);
        Ok(self)
    }

    pub fn exclude_by_ref(mut self, reference: &str) -> Result<Self> {
        self.exclude.push(RefPredicate::prefix(reference)?);
        Ok(self)
    }

    pub fn filter(mut self, predicate: RefPredicate) -> Self {
        self.include.push(predicate);
        self
    }

    pub fn order_by_ref(mut self, desc: bool) -> Self {
        self.order = if desc { RefOrder::Descending } else { RefOrder::Ascending };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::error::ErrorKind;
    use crate::corpus::store::CorpusStore;
    use crate::corpus::tables::Tables;
    use crate::loader::BulkLoader;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> CorpusStore {
        let store = CorpusStore::open(Config::default().with_storage_path(dir.path())).unwrap();
        let mut loader = BulkLoader::new(&store, "lsj");
        loader
            .load_editions("E1|urn:cts:greekLit:tlg0012.tlg001\nE2|urn:cts:greekLit:tlg0012.tlg002\n".as_bytes())
            .unwrap();
        loader.load_dictionary("D1|μῆνις|wrath\nD2|θεά|goddess\n".as_bytes()).unwrap();
        loader
            .load_passages("E1:1.20|D1\nE1:1.2.7|D1\nE1:2.1|D1 D2\nE1:1.1|D1\nE1:1.2|D1 D2\nE2:1.2|D1\n".as_bytes())
            .unwrap();
        store
    }

    fn refs(tables: &Tables, query: &PassageQuery) -> Vec<String> {
        tables.query(query).iter().map(|p| p.reference.clone()).collect()
    }

    #[test]
    fn filter_by_ref_keeps_descendants() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let tables = store.read();
        let e1 = tables.edition_by_urn("urn:cts:greekLit:tlg0012.tlg001").unwrap().id;

        let query = PassageQuery::new()
            .edition(e1)
            .lemma(LemmaId(0))
            .filter_by_ref("1.2")
            .unwrap()
            .order_by_ref(false);
        assert_eq!(refs(&tables, &query), vec!["1.2", "1.2.7"]);

        // Without an edition the lemma's rows from every edition are filtered
        let query = PassageQuery::new().lemma(LemmaId(0)).filter_by_ref("1.2").unwrap().order_by_ref(false);
        assert_eq!(refs(&tables, &query).len(), 3);
    }

    #[test]
    fn exclude_by_ref_drops_a_subtree() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let tables = store.read();
        let e1 = tables.edition_by_urn("urn:cts:greekLit:tlg0012.tlg001").unwrap().id;

        let query = PassageQuery::new()
            .edition(e1)
            .lemma(LemmaId(0))
            .filter_by_ref("1")
            .unwrap()
            .exclude_by_ref("1.2")
            .unwrap()
            .order_by_ref(false);
        assert_eq!(refs(&tables, &query), vec!["1.1", "1.20"]);
    }

    #[test]
    fn descending_order_reverses_natural_order() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let tables = store.read();
        let e1 = tables.edition_by_urn("urn:cts:greekLit:tlg0012.tlg001").unwrap().id;

        let query = PassageQuery::new().edition(e1).lemma(LemmaId(0)).order_by_ref(true);
        assert_eq!(refs(&tables, &query), vec!["2.1", "1.20", "1.2.7", "1.2", "1.1"]);

        let query = PassageQuery::new()
            .edition(e1)
            .filter(RefPredicate::range("1.2", "1.20").unwrap())
            .order_by_ref(true);
        assert_eq!(refs(&tables, &query), vec!["1.20", "1.2.7", "1.2", "1.2"]);
    }

    #[test]
    fn filter_by_ref_rejects_too_deep_reference() {
        let err = PassageQuery::new().filter_by_ref("1.2.3.4.5").unwrap_err();
        assert_eq!(err.kind, ErrorKind::SchemaDepthExceeded);
    }
}
