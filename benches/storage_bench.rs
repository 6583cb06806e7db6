//! Benchmarks for LogKV storage operations

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use logkv::Engine;
use tempfile::TempDir;

fn populated_engine(keys: usize) -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(temp_dir.path()).unwrap();
    for i in 0..keys {
        engine
            .put(format!("key{:06}", i).as_bytes(), &[0xAB; 100])
            .unwrap();
    }
    (temp_dir, engine)
}

fn storage_benchmarks(c: &mut Criterion) {
    c.bench_function("put_100b", |b| {
        let (_temp, engine) = populated_engine(0);
        let mut i = 0u64;
        b.iter(|| {
            engine
                .put(format!("key{}", i).as_bytes(), black_box(&[0xCDu8; 100][..]))
                .unwrap();
            i += 1;
        });
    });

    c.bench_function("get_hit_10k", |b| {
        let (_temp, engine) = populated_engine(10_000);
        let mut i = 0usize;
        b.iter(|| {
            let key = format!("key{:06}", i % 10_000);
            black_box(engine.get(key.as_bytes()).unwrap());
            i += 1;
        });
    });

    c.bench_function("get_miss", |b| {
        let (_temp, engine) = populated_engine(1_000);
        b.iter(|| black_box(engine.get(b"missing").unwrap()));
    });

    c.bench_function("merge_10k_half_dead", |b| {
        b.iter_batched(
            || {
                let (temp, engine) = populated_engine(10_000);
                for i in (0..10_000).step_by(2) {
                    engine.delete(format!("key{:06}", i).as_bytes()).unwrap();
                }
                (temp, engine)
            },
            |(_temp, engine)| engine.merge().unwrap(),
            BatchSize::PerIteration,
        );
    });

    c.bench_function("recover_10k", |b| {
        let (temp, engine) = populated_engine(10_000);
        drop(engine);
        b.iter(|| Engine::open(temp.path()).unwrap());
    });
}

criterion_group!(benches, storage_benchmarks);
criterion_main!(benches);
