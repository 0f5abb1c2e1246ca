//! Benchmarks for the DSP primitives inside a voice.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use patchbay::dsp::{
    envelope::Envelope,
    filter::SVFilter,
    lfo::Lfo,
    oscillator::{Oscillator, Waveform},
};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

pub fn bench_dsp(c: &mut Criterion) {
    let mut group = c.benchmark_group("block/dsp");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Sine - uses sin() transcendental function
        let mut osc = Oscillator::new();
        group.bench_with_input(BenchmarkId::new("osc_sine", size), &size, |b, _| {
            b.iter(|| osc.render(black_box(&mut buffer), Waveform::Sine, 440.0, SAMPLE_RATE))
        });

        let mut osc = Oscillator::new();
        group.bench_with_input(BenchmarkId::new("osc_saw", size), &size, |b, _| {
            b.iter(|| osc.render(black_box(&mut buffer), Waveform::Saw, 440.0, SAMPLE_RATE))
        });

        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();
        let mut filter = SVFilter::new();
        group.bench_with_input(BenchmarkId::new("lowpass", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                filter.lowpass(black_box(&mut buffer), 1000.0, 0.5, SAMPLE_RATE);
            })
        });

        // Sustain phase (holding steady)
        let mut env = Envelope::adsr(0.001, 0.001, 0.7, 0.3);
        env.note_on();
        env.advance(200, SAMPLE_RATE);
        group.bench_with_input(BenchmarkId::new("envelope_advance", size), &size, |b, _| {
            b.iter(|| env.advance(black_box(size), SAMPLE_RATE))
        });

        let mut lfo = Lfo::new();
        group.bench_with_input(BenchmarkId::new("lfo_block", size), &size, |b, _| {
            b.iter(|| lfo.process_block(black_box(&mut buffer), Waveform::Triangle, 2.0, SAMPLE_RATE))
        });
    }

    group.finish();
}
