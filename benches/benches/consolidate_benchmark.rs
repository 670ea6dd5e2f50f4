//! Consolidation and history persistence benchmarks.
//!
//! Run with: `cargo bench --package eodsync-bench`

use chrono::NaiveDate;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use eodsync_bench::{BlockShape, synthetic_block, synthetic_day};
use eodsync_store::{HistoryStore, consolidate};
use std::hint::black_box;
use tempfile::TempDir;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
}

fn consolidate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("consolidate");
    group.sample_size(10);

    // A year of history per symbol, folded from 4-symbol artifacts.
    for batches in [10, 50, 100] {
        let blocks = synthetic_day(start(), 365, batches, 4);
        group.throughput(Throughput::Elements((batches * 4) as u64));
        group.bench_with_input(BenchmarkId::new("batches", batches), &blocks, |b, blocks| {
            let existing = eodsync_store::WideTable::new();
            b.iter(|| consolidate(black_box(&existing), black_box(blocks)));
        });
    }

    // One new day appended to a long existing table.
    let existing = synthetic_block(BlockShape {
        start: start(),
        days: 8_000,
        symbols: 200,
        first_symbol: 0,
    });
    let update = synthetic_day(NaiveDate::from_ymd_opt(2021, 11, 25).unwrap(), 1, 50, 4);
    group.bench_function("append_day_200_symbols", |b| {
        b.iter(|| consolidate(black_box(&existing), black_box(&update)));
    });

    group.finish();
}

fn history_io_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_io");
    group.sample_size(10);

    let table = synthetic_block(BlockShape {
        start: start(),
        days: 8_000,
        symbols: 200,
        first_symbol: 0,
    });
    let temp_dir = TempDir::new().unwrap();
    let store = HistoryStore::new(temp_dir.path().join("history.parquet"));

    group.bench_function("save", |b| {
        b.iter(|| store.save(black_box(&table)).unwrap());
    });

    store.save(&table).unwrap();
    group.bench_function("load", |b| {
        b.iter(|| black_box(store.load().unwrap()));
    });

    group.finish();
}

criterion_group!(benches, consolidate_benchmark, history_io_benchmark);
criterion_main!(benches);
