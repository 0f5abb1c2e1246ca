//! Benchmarks for the reference engine.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use patchbay::{synth::SynthMessage, EngineConfig, SynthEngine, VoiceContext};

use crate::BLOCK_SIZES;

pub fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/engine");

    for &size in BLOCK_SIZES {
        for notes in [1usize, 8] {
            let (mut engine, mut handles) =
                SynthEngine::new(EngineConfig::default().voices(8)).unwrap();
            handles
                .modulation
                .connect("env1", "filter_cutoff", 0.4, VoiceContext::Poly)
                .unwrap();
            handles
                .modulation
                .connect("lfo1", "osc_tune", 0.1, VoiceContext::Mono)
                .unwrap();
            for i in 0..notes {
                handles
                    .notes
                    .push(SynthMessage::NoteOn {
                        note: 48 + (i as u8) * 3,
                        velocity: 100,
                    })
                    .unwrap();
            }

            let mut buffer = vec![0.0f32; size];
            let id = format!("{notes}_voices");
            group.bench_with_input(BenchmarkId::new(id, size), &size, |b, _| {
                b.iter(|| engine.render_block(black_box(&mut buffer)))
            });
        }
    }

    group.finish();
}
