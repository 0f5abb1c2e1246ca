use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Naive (non band-limited) waveforms. Fine for LFOs and a reference voice;
/// the aliasing of the saw and square at high pitches is audible.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Saw,
    Square,
}

impl Waveform {
    /// Waveform selected by a stepped control value, wrapping past the end.
    pub fn from_index(index: usize, choices: &[Waveform]) -> Waveform {
        if choices.is_empty() {
            return Waveform::Sine;
        }
        choices[index % choices.len()]
    }

    /// Value at `phase` in [0, 1), in [-1, 1].
    #[inline]
    pub fn at(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (phase * TAU).sin(),
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            Waveform::Saw => 2.0 * phase - 1.0,
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}

/// Phase accumulator.
#[derive(Debug, Clone, Default)]
pub struct Oscillator {
    phase: f32,
}

impl Oscillator {
    pub fn new() -> Self {
        Self { phase: 0.0 }
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    #[inline]
    pub fn next_sample(&mut self, waveform: Waveform, frequency: f32, sample_rate: f32) -> f32 {
        let value = waveform.at(self.phase);
        self.phase = (self.phase + frequency / sample_rate).rem_euclid(1.0);
        value
    }

    pub fn render(&mut self, out: &mut [f32], waveform: Waveform, frequency: f32, sample_rate: f32) {
        for sample in out.iter_mut() {
            *sample = self.next_sample(waveform, frequency, sample_rate);
        }
    }
}

/// A4 = 440 Hz = MIDI note 69.
#[inline]
pub fn midi_note_to_freq(note: f32) -> f32 {
    440.0 * 2.0_f32.powf((note - 69.0) / 12.0)
}
