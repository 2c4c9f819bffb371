//! Segment codec benchmarks.

use caskdb_bench::random_value;
use caskdb_codec::{decode_hints, encode_entry, encode_hints, HintEntry, LogEntryIter};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Build a segment buffer of `count` entries with `size`-byte values.
fn segment(count: usize, size: usize) -> Vec<u8> {
    let value = random_value(size);
    let mut buf = Vec::new();
    for key in 0..count as i64 {
        encode_entry(key, &value, &mut buf).unwrap();
    }
    buf
}

/// Benchmark entry encoding.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_entry");

    for size in [16, 256, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let value = random_value(size);
            let mut buf = Vec::with_capacity(size + 12);

            b.iter(|| {
                buf.clear();
                encode_entry(black_box(42), black_box(&value), &mut buf).unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark scanning a full segment.
fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_segment");

    for size in [16, 256].iter() {
        let data = segment(8192 / (size + 12), *size);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| {
                let count = LogEntryIter::new(black_box(data))
                    .filter_map(Result::ok)
                    .count();
                black_box(count)
            });
        });
    }
    group.finish();
}

/// Benchmark hint file encoding and decoding.
fn bench_hints(c: &mut Criterion) {
    let hints: Vec<HintEntry> = (0..680).map(|k| HintEntry::new(k, k as u32 * 12)).collect();
    let encoded = encode_hints(&hints);

    let mut group = c.benchmark_group("hints");
    group.throughput(Throughput::Elements(hints.len() as u64));
    group.bench_function("encode", |b| b.iter(|| black_box(encode_hints(black_box(&hints)))));
    group.bench_function("decode", |b| {
        b.iter(|| black_box(decode_hints(black_box(&encoded)).unwrap()))
    });
    group.finish();
}

criterion_group!(benches, bench_encode, bench_scan, bench_hints);
criterion_main!(benches);
