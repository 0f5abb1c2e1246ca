//! Parameter modulation arithmetic.
//!
//! ```text
//! modulated = base + modulator × depth
//! ```
//!
//! The result is not clamped here; the destination's range is applied by
//! whoever owns the destination (see `RoutingTable::effective_value`).

#[inline]
pub fn apply_modulation(base_value: f32, modulator: f32, depth: f32) -> f32 {
    base_value + (modulator * depth)
}

/// Mean of a block of modulator samples; 0.0 for an empty block.
#[inline]
pub fn block_average(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f32>() / samples.len() as f32
}
