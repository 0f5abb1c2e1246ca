//! Benchmarks for the oscilloscope memory.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use patchbay::scope::memory;

use crate::BLOCK_SIZES;

pub fn bench_scope(c: &mut Criterion) {
    let mut group = c.benchmark_group("block/scope");

    for &size in BLOCK_SIZES {
        let (mut writer, reader) = memory(1024);
        let block: Vec<f32> = (0..size).map(|i| (i as f32 * 0.01).sin()).collect();

        group.bench_with_input(BenchmarkId::new("write_block", size), &size, |b, _| {
            b.iter(|| writer.write_block(black_box(&block)))
        });

        let mut out = vec![0.0f32; size];
        group.bench_with_input(BenchmarkId::new("snapshot_into", size), &size, |b, _| {
            b.iter(|| reader.snapshot_into(black_box(&mut out)))
        });
    }

    group.finish();
}
