//! Record and tuple pool benchmarks (C3/C4/C6)
//!
//! Measures the allocate/drop round trip that dominates an operator's hot
//! path: popping an envelope (and its payload buffer) from a datatype's
//! free list, and growing a tuple's member array across bucket promotions.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ws_core::datatype::DatatypeRegistry;
use ws_core::tuple::TupleStore;
use ws_label::LabelTable;

fn bench_scalar_allocate_drop(c: &mut Criterion) {
    let registry = DatatypeRegistry::new(20);
    let dt = registry.register("uint32", 4, Default::default()).unwrap();

    c.bench_function("scalar_allocate_drop", |b| {
        b.iter(|| {
            let rec = dt.allocate().unwrap();
            black_box(&rec);
        })
    });
}

fn bench_alias_allocate_drop(c: &mut Criterion) {
    let registry = DatatypeRegistry::new(20);
    let dt = registry.register("bytes", 64, Default::default()).unwrap();
    let src = dt.allocate().unwrap();

    c.bench_function("alias_allocate_drop", |b| {
        b.iter(|| {
            let alias = dt.make_alias(&src).unwrap();
            black_box(&alias);
        })
    });
}

fn bench_tuple_fill_small_bucket(c: &mut Criterion) {
    let registry = DatatypeRegistry::new(20);
    let store = TupleStore::new(&registry, [16, 256, 2048], 4096).unwrap();
    let uint32 = registry.register("uint32", 4, Default::default()).unwrap();
    let labels = LabelTable::new(32);
    let member_labels: Vec<_> = (0..16).map(|i| labels.register(&format!("K{i}"))).collect();

    c.bench_function("tuple_fill_small_bucket", |b| {
        b.iter(|| {
            let mut tuple = store.allocate().unwrap();
            for label in &member_labels {
                let child = uint32.allocate().unwrap();
                tuple.add_member(&store, label.clone(), child).unwrap();
            }
            black_box(&tuple);
        })
    });
}

fn bench_tuple_promote(c: &mut Criterion) {
    let registry = DatatypeRegistry::new(20);
    let store = TupleStore::new(&registry, [4, 64, 1024], 4096).unwrap();
    let uint32 = registry.register("uint32", 4, Default::default()).unwrap();
    let labels = LabelTable::new(16);
    let member_labels: Vec<_> = (0..5).map(|i| labels.register(&format!("K{i}"))).collect();

    c.bench_function("tuple_promote_small_to_medium", |b| {
        b.iter(|| {
            let mut tuple = store.allocate().unwrap();
            for label in &member_labels {
                let child = uint32.allocate().unwrap();
                tuple.add_member(&store, label.clone(), child).unwrap();
            }
            black_box(&tuple);
        })
    });
}

criterion_group!(
    benches,
    bench_scalar_allocate_drop,
    bench_alias_allocate_drop,
    bench_tuple_fill_small_bucket,
    bench_tuple_promote,
);
criterion_main!(benches);
