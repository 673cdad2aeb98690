//! Transcript store benchmarks for both representations.

use chatlog_bench::{runtime, serialized_len, transcript, TRANSCRIPT_SIZES};
use chatlog_storage::{InMemoryBackend, StoreConfig, TranscriptStore};
use chatlog_testkit::TestStore;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Benchmark saving to memory, which isolates compression cost.
fn bench_save_memory(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("save_memory");

    for (label, count, text_len) in TRANSCRIPT_SIZES {
        let records = transcript(count, text_len);
        let store = TranscriptStore::with_backend(
            "/bench/cline_messages",
            InMemoryBackend::new(),
            StoreConfig::default(),
        )
        .unwrap();

        group.throughput(Throughput::Bytes(serialized_len(&records)));
        group.bench_with_input(BenchmarkId::from_parameter(label), &records, |b, records| {
            b.iter(|| rt.block_on(store.save(black_box(records))).unwrap());
        });
    }

    group.finish();
}

/// Benchmark compressed saves to disk.
fn bench_save_compressed(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("save_compressed");
    group.sample_size(20);

    for (label, count, text_len) in TRANSCRIPT_SIZES {
        let records = transcript(count, text_len);
        let store = TestStore::file(StoreConfig::default());

        group.throughput(Throughput::Bytes(serialized_len(&records)));
        group.bench_with_input(BenchmarkId::from_parameter(label), &records, |b, records| {
            b.iter(|| rt.block_on(store.save(black_box(records))).unwrap());
        });
    }

    group.finish();
}

/// Benchmark the chunked fallback path on disk across slice sizes.
fn bench_save_chunked(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("save_chunked");
    group.sample_size(20);
    let records = transcript(2_000, 1_500);
    group.throughput(Throughput::Bytes(serialized_len(&records)));

    for chunk_size in [64 * 1024, 256 * 1024, 1024 * 1024] {
        let (store, backend) = TestStore::faulty(StoreConfig::new().chunk_size(chunk_size));

        group.bench_with_input(
            BenchmarkId::new("chunk_kib", chunk_size / 1024),
            &records,
            |b, records| {
                b.iter(|| {
                    backend.fail_compressed_writes(3);
                    rt.block_on(store.save(black_box(records))).unwrap()
                });
            },
        );
    }

    group.finish();
}

/// Benchmark loading from either representation.
fn bench_load(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("load");
    let records = transcript(2_000, 1_500);
    group.throughput(Throughput::Bytes(serialized_len(&records)));

    let compressed = TestStore::file(StoreConfig::default());
    rt.block_on(compressed.save(&records)).unwrap();
    group.bench_function("compressed", |b| {
        b.iter(|| black_box(rt.block_on(compressed.load())));
    });

    let (chunked, backend) = TestStore::faulty(StoreConfig::new().chunk_size(256 * 1024));
    backend.fail_compressed_writes(3);
    rt.block_on(chunked.save(&records)).unwrap();
    group.bench_function("chunked", |b| {
        b.iter(|| black_box(rt.block_on(chunked.load())));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_save_memory,
    bench_save_compressed,
    bench_save_chunked,
    bench_load
);
criterion_main!(benches);
