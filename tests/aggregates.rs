use tempfile::TempDir;
use deepvocab::aggregate::{AggregateMaintainer, OverallTotals};
use deepvocab::core::types::{EditionId, LemmaId, Totals};
use deepvocab::loader::BulkLoader;
use deepvocab::ranking::{per_10k, LemmaQuery};
use deepvocab::{Config, CorpusDatabase};

fn loaded(dir: &TempDir) -> CorpusDatabase {
    let db = CorpusDatabase::open(Config::default().with_storage_path(dir.path())).unwrap();
    let mut loader = BulkLoader::new(db.store(), "lsj");
    loader
        .load_editions("E1|urn:cts:greekLit:tlg0012.tlg001\nE2|urn:cts:greekLit:tlg0012.tlg002\nE3|urn:cts:latinLit:phi0690.phi003\n".as_bytes())
        .unwrap();
    loader
        .load_dictionary("D1|ἀνήρ|man\nD2|μοῦσα|muse\nD3|πολύτροπος|of many turns\nD4|ἄγω2|lead\n".as_bytes())
        .unwrap();
    loader
        .load_passages("E1:1.1|D1 D2.2\nE1:1.2|D1.4\nE2:1.1|D1 D3\n".as_bytes())
        .unwrap();
    db.mark_core("urn:cts:greekLit:tlg0012.tlg001\n".as_bytes()).unwrap();
    db
}

fn snapshot(db: &CorpusDatabase) -> (Vec<(u64, u64)>, Vec<u64>) {
    let tables = db.store().read();
    (
        tables.lemmas.iter().map(|l| (l.corpus_count, l.core_count)).collect(),
        tables.editions.iter().map(|e| e.token_count).collect(),
    )
}

#[test]
fn recompute_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let db = loaded(&dir);

    let report = db.recompute_aggregates().unwrap();
    assert_eq!(report.totals, Totals { corpus: 9, core: 7 });
    let first = snapshot(&db);
    assert_eq!(first.0, vec![(6, 5), (2, 2), (1, 0), (0, 0)]);
    assert_eq!(first.1, vec![7, 2, 0]);

    let report = db.recompute_aggregates().unwrap();
    assert_eq!((report.lemmas_updated, report.editions_updated), (0, 0));
    assert_eq!(snapshot(&db), first);
}

#[test]
fn zero_occurrence_lemmas_report_zero() {
    let dir = TempDir::new().unwrap();
    let db = loaded(&dir);
    db.recompute_aggregates().unwrap();

    let lemma = db.find_lemma_by_text("ἄγω2").unwrap();
    assert_eq!((lemma.corpus_count, lemma.core_count), (0, 0));
    assert_eq!(lemma.unaccented, "αγω");

    let detail = db.lemma_detail(lemma.id, None).unwrap();
    assert_eq!((detail.corpus_freq, detail.core_freq), (0.0, 0.0));
    assert!(detail.passages.is_empty());

    // An edition without tokens divides by zero nowhere
    assert_eq!(per_10k(0, 0), 0.0);
    let latin = db.word_list(&deepvocab::ranking::WordListQuery::new("urn:cts:latinLit:phi0690.phi003")).unwrap();
    assert!(latin.entries.is_empty());
}

#[test]
fn empty_store_recomputes_to_zero() {
    let dir = TempDir::new().unwrap();
    let db = CorpusDatabase::open(Config::default().with_storage_path(dir.path())).unwrap();
    let report = db.recompute_aggregates().unwrap();
    assert_eq!(report.totals, Totals::default());
    assert_eq!(db.list_lemmas(&LemmaQuery::default()).unwrap().num_pages, 1);
}

#[test]
fn core_change_needs_recompute_and_cache_clear() {
    let dir = TempDir::new().unwrap();
    let db = loaded(&dir);
    db.recompute_aggregates().unwrap();
    assert_eq!(db.totals().core, 7);

    db.store().set_core(EditionId(1), true).unwrap();
    // Memoized until cleared
    assert_eq!(db.totals().core, 7);
    assert_eq!(db.get_lemma(LemmaId(2)).unwrap().core_count, 0);

    db.recompute_aggregates().unwrap();
    assert_eq!(db.totals().core, 9);
    assert_eq!(db.get_lemma(LemmaId(2)).unwrap().core_count, 1);
}

#[test]
fn injected_totals_are_independent() {
    let dir = TempDir::new().unwrap();
    let db = loaded(&dir);
    let maintainer = AggregateMaintainer::new(db.store()).unwrap();

    let totals = OverallTotals::new();
    assert!(!totals.is_cached());
    let report = maintainer.recompute_all(&totals).unwrap();
    assert!(totals.is_cached());
    assert_eq!(report.totals.corpus, 9);

    totals.invalidate();
    assert!(!totals.is_cached());
    assert_eq!(maintainer.recompute_lemma_counts_for(LemmaId(0)).unwrap(), (6, 5));
}
