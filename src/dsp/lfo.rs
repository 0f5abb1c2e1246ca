//! Low frequency oscillators used as modulation sources.

use crate::dsp::{
    modulate::block_average,
    oscillator::{Oscillator, Waveform},
};

/*
An LFO is the same phase accumulator as an audio oscillator, run at 0.01 to
20 Hz and read once per block instead of once per sample. Its output is
bipolar (-1..1); a route can ask for unipolar (0..1) instead:

    bipolar   unipolar
    -1.0      0.0
     0.0      0.5
    +1.0      1.0

The block value is the average of the block's samples, which smooths the
steps between blocks without a separate smoothing filter.
*/

/// LFO shapes selectable from a stepped control, in control order.
pub const LFO_WAVEFORMS: [Waveform; 4] = [
    Waveform::Sine,
    Waveform::Triangle,
    Waveform::Saw,
    Waveform::Square,
];

#[inline]
pub fn bipolar_to_unipolar(bipolar: f32) -> f32 {
    (bipolar + 1.0) * 0.5
}

/// Free-running LFO producing one value per block.
#[derive(Debug, Clone, Default)]
pub struct Lfo {
    osc: Oscillator,
}

impl Lfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the LFO across a block (using `scratch` for the samples) and return
    /// the block's value.
    pub fn process_block(
        &mut self,
        scratch: &mut [f32],
        waveform: Waveform,
        frequency: f32,
        sample_rate: f32,
    ) -> f32 {
        self.osc.render(scratch, waveform, frequency, sample_rate);
        block_average(scratch)
    }
}
