use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use invertex_core::codec::encode_posting_list;
use invertex_core::{build_sequential, InvertedIndex, ParallelIndexBuilder, RawDocument, SimpleTokenizer};

const WORDS: &[&str] = &[
    "index", "posting", "term", "document", "query", "merge", "batch", "worker", "gap", "byte",
    "compression", "frequency", "search", "token", "collection", "snapshot",
];

fn corpus(n: u32) -> Vec<RawDocument> {
    (0..n)
        .map(|id| {
            let text: Vec<&str> = (0..60).map(|k| WORDS[((id * 7 + k * 13) as usize) % WORDS.len()]).collect();
            RawDocument::new(id, text.join(" "))
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for size in [20u32, 1_000, 20_000] {
        let docs = corpus(size);
        group.bench_with_input(BenchmarkId::new("sequential", size), &docs, |b, docs| {
            b.iter(|| build_sequential(docs, &SimpleTokenizer))
        });
        let builder = ParallelIndexBuilder::new(4).expect("workers");
        group.bench_with_input(BenchmarkId::new("parallel_4", size), &docs, |b, docs| {
            b.iter(|| builder.build(docs, &SimpleTokenizer).expect("build"))
        });
    }
    group.finish();
}

fn bench_maintenance(c: &mut Criterion) {
    let mut index: InvertedIndex = build_sequential(&corpus(5_000), &SimpleTokenizer);
    let tokens = ["fresh", "index", "term"];
    c.bench_function("add_remove_document", |b| {
        b.iter(|| {
            index.add_document(99_999, &tokens);
            index.remove_document(99_999);
        })
    });
}

fn bench_codec(c: &mut Criterion) {
    let ids: Vec<u32> = (0..100_000).map(|i| i * 3).collect();
    c.bench_function("encode_posting_list_100k", |b| b.iter(|| encode_posting_list(&ids).expect("sorted")));
}

criterion_group!(benches, bench_build, bench_maintenance, bench_codec);
criterion_main!(benches);
