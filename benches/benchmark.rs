use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use secrag::{IndexedChunk, Number, VectorStore};

const DIMENSIONS: usize = 1536;
const TOP_K: usize = 3;
const SEED: u64 = 42;

fn configure_criterion() -> Criterion {
    Criterion::default()
        .sample_size(20)
        .measurement_time(std::time::Duration::from_secs(10))
        .configure_from_args()
}

fn random_vector(rng: &mut StdRng, normal: &Normal<Number>) -> Vec<Number> {
    normal.sample_iter(rng).take(DIMENSIONS).collect()
}

fn synthetic_store(size: usize, rng: &mut StdRng, normal: &Normal<Number>) -> VectorStore {
    let records = (0..size)
        .map(|i| IndexedChunk {
            embedding: random_vector(rng, normal),
            chunk_text: format!("chunk {}", i),
            filename: format!("doc_{}.md", i % 8),
        })
        .collect();
    VectorStore::from_records(records, "synthetic").unwrap()
}

fn search_exact(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let normal = Normal::new(0.0, 1.0).unwrap();

    let mut group = c.benchmark_group("search_exact");
    for size in [100, 1_000, 10_000] {
        let store = synthetic_store(size, &mut rng, &normal);
        let query = random_vector(&mut rng, &normal);
        group.bench_with_input(BenchmarkId::new("top_3", size), &store, |b, store| {
            b.iter(|| store.search(black_box(&query), TOP_K).unwrap())
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = configure_criterion();
    targets = search_exact
}
criterion_main!(benches);
