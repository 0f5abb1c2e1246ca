//! Benchmarks for effective value lookups through the compiled routing table.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use patchbay::{
    manifest::synth_manifest,
    modulation::{ModulationManager, VoiceContext},
};

const VOICES: usize = 8;

fn manager_with_routes(routes: usize) -> ModulationManager {
    let (controls, outputs) = synth_manifest().build(VOICES).unwrap();
    let mut manager = ModulationManager::new(controls, outputs);
    let candidates = [
        ("lfo1", "filter_cutoff", VoiceContext::Mono),
        ("env1", "filter_cutoff", VoiceContext::Poly),
        ("velocity", "filter_cutoff", VoiceContext::Poly),
        ("lfo2", "osc_tune", VoiceContext::Mono),
        ("note", "filter_resonance", VoiceContext::Poly),
        ("lfo2", "lfo1_frequency", VoiceContext::Mono),
        ("lfo1", "volume", VoiceContext::Mono),
    ];
    for &(source, destination, context) in candidates.iter().take(routes) {
        manager.connect(source, destination, 0.25, context).unwrap();
    }
    manager
}

pub fn bench_modulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("block/modulation");

    for routes in [0, 3, 7] {
        let manager = manager_with_routes(routes);
        let mut reader = manager.reader();
        reader.latch();
        let cutoff = manager.controls().id("filter_cutoff").unwrap();

        // One destination, every voice: the per-block cost of a poly parameter
        group.bench_with_input(
            BenchmarkId::new("poly_destination", routes),
            &routes,
            |b, _| {
                b.iter(|| {
                    let mut sum = 0.0;
                    for voice in 0..VOICES {
                        sum += reader.effective_value(black_box(cutoff), Some(voice));
                    }
                    sum
                })
            },
        );

        group.bench_with_input(BenchmarkId::new("latch_unchanged", routes), &routes, |b, _| {
            b.iter(|| black_box(reader.latch()))
        });
    }

    // Control-thread cost of a route edit: validate, compile, publish
    let mut manager = manager_with_routes(6);
    group.bench_function("connect_republish", |b| {
        let mut amount = 0.0f32;
        b.iter(|| {
            amount = if amount > 0.5 { 0.1 } else { amount + 0.01 };
            manager
                .connect("lfo1", "volume", black_box(amount), VoiceContext::Mono)
                .unwrap()
        })
    });

    group.finish();
}
