//! Engine operation benchmarks.

use caskdb_bench::{populated_engine, random_keys, random_value};
use caskdb_core::{Config, Engine};
use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use tempfile::TempDir;

/// Benchmark single puts into an in-memory engine.
fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("put");

    for size in [16, 256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let engine = Engine::open_in_memory(Config::default()).unwrap();
            let data = random_value(size);
            let mut key = 0i64;

            b.iter(|| {
                key += 1;
                engine.put(black_box(key), black_box(&data)).unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark puts into file-backed segments, fsync disabled.
fn bench_put_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_file");
    group.throughput(Throughput::Bytes(256));

    group.bench_function("256", |b| {
        let temp = TempDir::new().unwrap();
        let config = Config::new().sync_on_flush(false);
        let engine =
            Engine::open(&temp.path().join("logs"), &temp.path().join("hints"), config).unwrap();
        let data = random_value(256);
        let mut key = 0i64;

        b.iter(|| {
            key += 1;
            engine.put(black_box(key), black_box(&data)).unwrap();
        });
    });
    group.finish();
}

/// Benchmark reads from the write buffer and from durable segments.
fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    group.bench_function("buffered", |b| {
        let engine = Engine::open_in_memory(Config::default()).unwrap();
        engine.put(7, &random_value(64)).unwrap();

        b.iter(|| black_box(engine.get(black_box(7)).unwrap()));
    });

    group.bench_function("durable", |b| {
        let engine = populated_engine(1000, 1, 64).unwrap();
        let keys: Vec<i64> = (0..1000).collect();
        let mut i = 0;

        b.iter(|| {
            i = (i + 1) % keys.len();
            black_box(engine.get(black_box(keys[i])).unwrap())
        });
    });

    group.bench_function("missing", |b| {
        let engine = populated_engine(1000, 1, 64).unwrap();
        let keys = random_keys(1024);
        let mut i = 0;

        b.iter(|| {
            i = (i + 1) % keys.len();
            black_box(engine.get(black_box(keys[i] | (1 << 40))).unwrap())
        });
    });

    group.finish();
}

/// Benchmark compaction of overwritten keys.
fn bench_compact(c: &mut Criterion) {
    let mut group = c.benchmark_group("compact");
    group.sample_size(20);

    for versions in [2, 8].iter() {
        group.bench_with_input(
            BenchmarkId::new("versions", versions),
            versions,
            |b, &versions| {
                b.iter_batched(
                    || populated_engine(500, versions, 128).unwrap(),
                    |engine| black_box(engine.compact().unwrap()),
                    BatchSize::LargeInput,
                );
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_put, bench_put_file, bench_get, bench_compact);
criterion_main!(benches);
