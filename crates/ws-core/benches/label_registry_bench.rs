//! Label registry benchmarks (C1)
//!
//! Measures the hot paths an operator actually takes: interning a label by
//! name (`register`), promoting one to searchable (`search`), and resolving
//! an on-the-wire hash back to a label (`find_by_hash`).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ws_core::label::LabelRegistry;

fn bench_register(c: &mut Criterion) {
    let mut group = c.benchmark_group("label_register");

    group.bench_function("new_name", |b| {
        let registry = LabelRegistry::new(4096);
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            black_box(registry.register(&format!("LABEL_{i}")))
        })
    });

    group.bench_function("repeat_name", |b| {
        let registry = LabelRegistry::new(4096);
        registry.register("SRC_IP");
        b.iter(|| black_box(registry.register("SRC_IP")))
    });

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("label_search");

    for count in [10usize, 1_000] {
        group.bench_with_input(BenchmarkId::new("distinct_names", count), &count, |b, &count| {
            let registry = LabelRegistry::new((count as u32) + 16);
            for i in 0..count {
                registry.register(&format!("L{i}"));
            }
            let mut i = 0usize;
            b.iter(|| {
                i = (i + 1) % count;
                black_box(registry.search(&format!("L{i}")).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_find_by_hash(c: &mut Criterion) {
    let registry = LabelRegistry::new(4096);
    let label = registry.register("DST_PORT");
    let hash = label.hash();

    c.bench_function("label_find_by_hash", |b| {
        b.iter(|| black_box(registry.find_by_hash(hash)))
    });
}

criterion_group!(benches, bench_register, bench_search, bench_find_by_hash);
criterion_main!(benches);
