use std::f32::consts::PI;

/*
Topology-preserving state-variable filter (trapezoidal integration).

    g = tan(π · cutoff / sample_rate)
    k = 2 − 2 · resonance          (k → 0 self-oscillates)

Only the lowpass tap is used by the reference voice; the other taps come for
free from the same two integrators.
*/

pub struct FilterOutputs {
    pub lowpass: f32,
    pub bandpass: f32,
    pub highpass: f32,
}

/// Resonance is capped below 1.0 so the filter never self-oscillates.
const MAX_RESONANCE: f32 = 0.97;

#[derive(Debug, Clone, Default)]
pub struct SVFilter {
    ic1eq: f32,
    ic2eq: f32,
}

impl SVFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coefficients for a cutoff in Hz, kept below Nyquist.
    #[inline]
    pub fn coefficients(cutoff_hz: f32, resonance: f32, sample_rate: f32) -> (f32, f32) {
        let cutoff = cutoff_hz.clamp(10.0, sample_rate * 0.45);
        let g = (PI * cutoff / sample_rate).tan();
        let k = 2.0 - 2.0 * resonance.clamp(0.0, MAX_RESONANCE);
        (g, k)
    }

    #[inline]
    pub fn next_sample(&mut self, sample: f32, g: f32, k: f32) -> FilterOutputs {
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;
        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        FilterOutputs {
            lowpass: v2,
            bandpass: v1,
            highpass: sample - k * v1 - v2,
        }
    }

    pub fn lowpass(&mut self, buffer: &mut [f32], cutoff_hz: f32, resonance: f32, sample_rate: f32) {
        let (g, k) = Self::coefficients(cutoff_hz, resonance, sample_rate);
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample, g, k).lowpass;
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

/// Map a normalized 0..1 control onto 20 Hz .. 20 kHz, exponentially.
#[inline]
pub fn normalized_to_cutoff(normalized: f32) -> f32 {
    20.0 * 1000.0_f32.powf(normalized.clamp(0.0, 1.0))
}
