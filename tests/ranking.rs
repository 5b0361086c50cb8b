use std::fmt::Write as _;
use tempfile::TempDir;
use deepvocab::core::types::LemmaId;
use deepvocab::corpus::models::NewDefinition;
use deepvocab::loader::BulkLoader;
use deepvocab::ranking::{CoreBand, LemmaOrder, LemmaQuery, PageRequest, WordListQuery, WordOrder};
use deepvocab::{Config, CorpusDatabase, ErrorKind};

const ILIAD: &str = "urn:cts:greekLit:tlg0012.tlg001.perseus-grc2";
const CORE: &str = "urn:cts:greekLit:tlg0059.tlg030.perseus-grc2";

fn open(dir: &TempDir) -> CorpusDatabase {
    CorpusDatabase::open(Config::default().with_storage_path(dir.path())).unwrap()
}

/// Target edition: L 5 times in 1000 tokens. Core edition: L 50 times in
/// 100000 tokens. Filler lemmas make up the remaining tokens.
fn keyness_corpus(db: &CorpusDatabase) {
    let mut loader = BulkLoader::new(db.store(), "lsj");
    loader
        .load_editions(format!("A|{}\nC|{}\n", ILIAD, CORE).as_bytes())
        .unwrap();
    loader
        .load_dictionary("L|λόγος|word\nF|καί|and\nG|δέ|but\nH|ἅπαξ|once\n".as_bytes())
        .unwrap();

    let mut passages = String::new();
    writeln!(passages, "A:1.1|L.2 F.400").unwrap();
    writeln!(passages, "A:1.2|L.3 G.400").unwrap();
    writeln!(passages, "A:2.1|F.194 H").unwrap();
    writeln!(passages, "C:1|L.50 F.49950").unwrap();
    writeln!(passages, "C:2|G.50000").unwrap();
    loader.load_passages(passages.as_bytes()).unwrap();

    db.mark_core(format!("{}\n", CORE).as_bytes()).unwrap();
    db.recompute_aggregates().unwrap();
}

#[test]
fn keyness_for_whole_edition() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    keyness_corpus(&db);
    assert_eq!(db.totals().core, 100_000);

    let list = db.word_list(&WordListQuery::new(ILIAD)).unwrap();
    assert_eq!(list.token_total, 1000);

    let logos = list.entries.iter().find(|e| e.text == "λόγος").unwrap();
    assert_eq!(logos.count, 5);
    assert!((logos.frequency - 50.0).abs() < 1e-9);
    assert!((logos.core_freq - 5.0).abs() < 1e-9);
    assert!((logos.keyness.unwrap() - 10f64.log2()).abs() < 1e-9);

    // Once in scope and never in core: no keyness either way
    let hapax = list.entries.iter().find(|e| e.text == "ἅπαξ").unwrap();
    assert!(hapax.keyness.is_none());
    assert_eq!(hapax.core_freq, 0.0);

    assert_eq!(list.entries[0].text, "καί");
}

#[test]
fn sub_range_has_no_keyness() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    keyness_corpus(&db);

    for scope in ["1.1-1.2", "1*", "1.2"] {
        let list = db.word_list(&WordListQuery::new(ILIAD).scope(scope)).unwrap();
        assert!(list.entries.iter().all(|e| e.keyness.is_none()), "scope {}", scope);
    }

    let list = db.word_list(&WordListQuery::new(ILIAD).scope("1*")).unwrap();
    assert_eq!(list.token_total, 805);
    let list = db.word_list(&WordListQuery::new(ILIAD).scope("1.2-2")).unwrap();
    assert_eq!(list.token_total, 598);
    let list = db.word_list(&WordListQuery::new(ILIAD).scope("3*")).unwrap();
    assert!(list.entries.is_empty());
    assert_eq!(list.token_total, 0);
}

#[test]
fn keyness_ordering_puts_absent_in_the_middle() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    keyness_corpus(&db);

    let list = db.word_list(&WordListQuery::new(ILIAD).order(WordOrder::KeynessDesc)).unwrap();
    let texts: Vec<&str> = list.entries.iter().map(|e| e.text.as_str()).collect();
    // λόγος 3.32, ἅπαξ absent (1), καί 0.25, δέ -0.32
    assert_eq!(texts, vec!["λόγος", "ἅπαξ", "καί", "δέ"]);

    let list = db.word_list(&WordListQuery::new(ILIAD).order(WordOrder::KeynessAsc)).unwrap();
    assert_eq!(list.entries[0].text, "δέ");
}

#[test]
fn word_list_band_and_unknown_edition() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    keyness_corpus(&db);

    // Core freq per 10k: λόγος 5, καί 4995, δέ 5000, ἅπαξ 0
    let query = WordListQuery::new(ILIAD).band(CoreBand::new(Some(1.0), Some(10.0)));
    let list = db.word_list(&query).unwrap();
    let texts: Vec<&str> = list.entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["λόγος"]);

    let err = db.word_list(&WordListQuery::new("urn:cts:greekLit:tlg9999.tlg001")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn cached_word_list_is_reused_until_cleared() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    keyness_corpus(&db);

    let query = WordListQuery::new(ILIAD);
    db.word_list(&query).unwrap();
    db.word_list(&query).unwrap();
    let stats = db.ranking().cache_stats();
    assert_eq!((stats.hit_count, stats.size), (1, 1));

    db.clear_caches();
    assert_eq!(db.ranking().cache_stats().size, 0);
    assert!(!db.stats().unwrap().totals_cached);
}

#[test]
fn word_list_follows_passage_writes() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    keyness_corpus(&db);

    let query = WordListQuery::new(ILIAD);
    assert_eq!(db.word_list(&query).unwrap().token_total, 1000);

    let mut loader = BulkLoader::new(db.store(), "lsj");
    loader.load_editions(format!("A|{}\n", ILIAD).as_bytes()).unwrap();
    loader.load_dictionary("L|λόγος|word\n".as_bytes()).unwrap();
    loader.load_passages("A:3.1|L.7\n".as_bytes()).unwrap();

    let list = db.word_list(&query).unwrap();
    assert_eq!(list.token_total, 1007);
    assert_eq!(list.entries.iter().find(|e| e.text == "λόγος").unwrap().count, 12);

    db.truncate_passages().unwrap();
    let list = db.word_list(&query).unwrap();
    assert_eq!(list.token_total, 0);
    assert!(list.entries.is_empty());
    assert_eq!(db.ranking().cache_stats().hit_count, 0);
}

#[test]
fn listing_pages_clamp() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    for i in 0..250 {
        db.store().create_lemma(&format!("λημμα{:03}", i)).unwrap();
    }

    let page = |p: &str| {
        let query = LemmaQuery { page: PageRequest::parse(p), order: LemmaOrder::Text, ..Default::default() };
        db.list_lemmas(&query).unwrap()
    };
    assert_eq!(page("0").number, 1);
    assert_eq!(page("x").number, 1);
    let last = page("99");
    assert_eq!((last.number, last.num_pages, last.items.len()), (3, 3, 50));
    assert_eq!(page("2").items[0].text, "λημμα100");
}

#[test]
fn wildcard_search_uses_normalized_forms() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    for word in ["λόγος", "λογίζομαι", "ἄνθρωπος", "λέγω", "θεός"] {
        db.store().create_lemma(word).unwrap();
    }

    let search = |q: &str| {
        let query = LemmaQuery { query: Some(q.to_string()), order: LemmaOrder::Text, ..Default::default() };
        let mut texts: Vec<String> = db.list_lemmas(&query).unwrap().items.into_iter().map(|l| l.text).collect();
        texts.sort();
        texts
    };
    assert_eq!(search("*ος"), vec!["θεός", "λόγος", "ἄνθρωπος"]);
    assert_eq!(search("λογ*"), vec!["λογίζομαι", "λόγος"]);
    assert_eq!(search("λογος"), vec!["λόγος"]);
    assert!(search("λογ").is_empty());

    // New lemmas are visible to the next search
    db.store().create_lemma("λογικός").unwrap();
    assert_eq!(search("λογ*").len(), 3);
}

#[test]
fn lemma_lookups_and_detail() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    keyness_corpus(&db);
    db.store()
        .bulk_create_definitions(vec![NewDefinition {
            lemma_id: LemmaId(0),
            shortdef: "reason".to_string(),
            source: "dodson".to_string(),
        }])
        .unwrap();

    let logos = db.find_lemma_by_text("λόγος").unwrap();
    assert_eq!(db.get_lemma(logos.id).unwrap().corpus_count, 55);
    assert_eq!(db.get_lemma(LemmaId(999)).unwrap_err().kind, ErrorKind::NotFound);
    assert!(db.find_lemma_by_text("λογος").unwrap_err().is_not_found());

    let detail = db.lemma_detail(logos.id, None).unwrap();
    assert_eq!(detail.definitions.len(), 2);
    assert_eq!(detail.core_freq, 5.0);
    assert_eq!(detail.editions.len(), 2);
    assert_eq!(detail.editions[0].frequency, 50.0);
    let refs: Vec<&str> = detail.passages.iter().map(|p| p.reference.as_str()).collect();
    assert_eq!(refs, vec!["1.1", "1.2", "1"]);

    let detail = db.lemma_detail(logos.id, Some(CORE)).unwrap();
    assert_eq!(detail.passages.len(), 1);
    assert!(detail.passages.iter().all(|p| p.cts_urn == CORE));
}

#[test]
fn editions_grouped_by_text_group() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    keyness_corpus(&db);

    let all = db.list_editions(false);
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].urn, "urn:cts:greekLit:tlg0012");
    assert_eq!(all[0].label, "unknown");

    let core = db.list_editions(true);
    assert_eq!(core.len(), 1);
    assert_eq!(core[0].editions[0].cts_urn, CORE);
}
