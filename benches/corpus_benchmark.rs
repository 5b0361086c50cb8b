use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use deepvocab::core::config::Config;
use deepvocab::loader::BulkLoader;
use deepvocab::ranking::{CoreBand, LemmaQuery, PageRequest, WordListQuery, WordOrder};
use deepvocab::CorpusDatabase;
use rand::Rng;
use std::fmt::Write;
use tempfile::TempDir;

const EDITIONS: usize = 10;
const LEMMAS: usize = 2_000;
const PASSAGES: usize = 20_000;

fn urn(i: usize) -> String {
    format!("urn:cts:greekLit:tlg{:04}.tlg001.perseus-grc2", i)
}

/// Synthetic corpus with a Zipf-ish lemma distribution; the first half of the
/// editions are core
fn build_corpus() -> (TempDir, CorpusDatabase) {
    let dir = TempDir::new().unwrap();
    let db = CorpusDatabase::open(Config::default().with_storage_path(dir.path())).unwrap();
    let mut rng = rand::thread_rng();

    let editions: String = (0..EDITIONS).map(|i| format!("E{}|{}\n", i, urn(i))).collect();
    let dictionary: String = (0..LEMMAS).map(|i| format!("D{}|λεξις{:04}|gloss\n", i, i)).collect();
    let mut passages = String::new();
    for p in 0..PASSAGES {
        write!(passages, "E{}:{}.{}|", p % EDITIONS, p / 100 + 1, p % 100 + 1).unwrap();
        for t in 0..8 {
            if t > 0 {
                passages.push(' ');
            }
            let r: f64 = rng.gen_range(0.0..1.0);
            let lemma = ((r * r * r) * LEMMAS as f64) as usize;
            write!(passages, "D{}.{}", lemma, rng.gen_range(1..4)).unwrap();
        }
        passages.push('\n');
    }

    let mut loader = BulkLoader::new(db.store(), "bench");
    loader.load_editions(editions.as_bytes()).unwrap();
    loader.load_dictionary(dictionary.as_bytes()).unwrap();
    loader.load_passages(passages.as_bytes()).unwrap();

    let core: String = (0..EDITIONS / 2).map(|i| format!("{}\n", urn(i))).collect();
    db.mark_core(core.as_bytes()).unwrap();
    db.recompute_aggregates().unwrap();
    (dir, db)
}

fn bench_recompute(c: &mut Criterion) {
    let (_dir, db) = build_corpus();
    let mut group = c.benchmark_group("aggregates");
    group.sample_size(20);
    group.bench_function("recompute_all", |b| {
        b.iter(|| black_box(db.recompute_aggregates().unwrap()));
    });
    group.finish();
}

fn bench_word_list(c: &mut Criterion) {
    let (_dir, db) = build_corpus();
    let mut group = c.benchmark_group("word_list");

    for (name, scope) in [("whole", None), ("prefix", Some("3*")), ("range", Some("2.10-5.50"))] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &scope, |b, scope| {
            b.iter(|| {
                // Bypass the result cache so every iteration ranks
                db.clear_caches();
                let mut query = WordListQuery::new(urn(7)).order(WordOrder::KeynessDesc);
                if let Some(scope) = scope {
                    query = query.scope(*scope);
                }
                black_box(db.word_list(&query).unwrap());
            });
        });
    }
    group.finish();
}

fn bench_lemma_listing(c: &mut Criterion) {
    let (_dir, db) = build_corpus();
    let mut group = c.benchmark_group("list_lemmas");

    for query in ["*", "λεξις19*", "*9", "λεξις0042"] {
        group.bench_with_input(BenchmarkId::from_parameter(query), &query, |b, query| {
            let request = LemmaQuery {
                query: Some(query.to_string()),
                band: CoreBand::new(Some(0.5), None),
                page: PageRequest::Number(2),
                ..Default::default()
            };
            b.iter(|| black_box(db.list_lemmas(&request).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_recompute, bench_word_list, bench_lemma_listing);
criterion_main!(benches);
