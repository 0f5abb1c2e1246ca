//! Benchmarks for draining parameter edits at the top of a block.

use std::hint::black_box;

use criterion::Criterion;
use patchbay::{
    control::{channel, Notification},
    manifest::synth_manifest,
};

pub fn bench_params(c: &mut Criterion) {
    let mut group = c.benchmark_group("block/params");
    let (controls, _) = synth_manifest().build(1).unwrap();
    let (mut sender, mut receiver) = channel(&controls);

    // Nothing changed: the generation check skips the scan
    group.bench_function("drain_idle", |b| {
        b.iter(|| receiver.drain(|change| {
            black_box(change);
        }))
    });

    // A knob sweep: one edit per block
    group.bench_function("drain_one_edit", |b| {
        let mut value = 0.0f32;
        b.iter(|| {
            value = (value + 0.01) % 1.0;
            sender.send("filter_cutoff", value, Notification::Send).unwrap();
            receiver.drain(|change| {
                black_box(change);
            })
        })
    });

    group.finish();
}
