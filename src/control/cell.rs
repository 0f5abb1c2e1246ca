use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::modulation::VoiceContext;

/// An `f32` stored as its bit pattern so it can be shared between the
/// control thread and the audio thread without locking.
#[derive(Debug, Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

/// Stable handle to a control inside the registry that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ControlId(pub(crate) usize);

impl ControlId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Declaration of a single parameter: name, range, default and which voice
/// contexts may modulate it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSpec {
    pub name: String,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    /// Number of discrete positions across the range (e.g. a waveform selector).
    #[cfg_attr(feature = "serde", serde(default))]
    pub steps: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub mono_modulatable: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub poly_modulatable: bool,
}

impl ControlSpec {
    pub fn new(name: impl Into<String>, min: f32, max: f32, default: f32) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            default,
            steps: None,
            mono_modulatable: false,
            poly_modulatable: false,
        }
    }

    /// On/off switch stored as 0.0 or 1.0.
    pub fn toggle(name: impl Into<String>, on: bool) -> Self {
        Self::new(name, 0.0, 1.0, if on { 1.0 } else { 0.0 }).steps(2)
    }

    /// Snap values to `steps` evenly spaced positions between min and max.
    pub fn steps(mut self, steps: u32) -> Self {
        self.steps = Some(steps.max(2));
        self
    }

    /// Accept routes in mono context.
    pub fn mono_modulated(mut self) -> Self {
        self.mono_modulatable = true;
        self
    }

    /// Accept routes in both contexts. A per-voice destination still sums
    /// the shared mono routes.
    pub fn poly_modulated(mut self) -> Self {
        self.mono_modulatable = true;
        self.poly_modulatable = true;
        self
    }

    pub fn accepts(&self, context: VoiceContext) -> bool {
        match context {
            VoiceContext::Mono => self.mono_modulatable,
            VoiceContext::Poly => self.poly_modulatable,
        }
    }

    /// Clamp (and quantize, for stepped controls) a raw value into range.
    ///
    /// Returns `None` for NaN, which has no meaningful position in the range.
    pub fn constrain(&self, value: f32) -> Option<f32> {
        if value.is_nan() {
            return None;
        }
        let clamped = value.clamp(self.min, self.max);
        match self.steps {
            Some(steps) if steps >= 2 && self.max > self.min => {
                let last = (steps - 1) as f32;
                let position = ((clamped - self.min) / (self.max - self.min) * last).round();
                Some((self.min + position / last * (self.max - self.min)).clamp(self.min, self.max))
            }
            _ => Some(clamped),
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.min <= self.max
            && self.default.is_finite()
            && (self.min..=self.max).contains(&self.default)
            && self.steps.map_or(true, |steps| steps >= 2)
    }
}

/// A live parameter cell. The value is always inside the declared range.
#[derive(Debug)]
pub struct Control {
    spec: ControlSpec,
    value: AtomicF32,
    dirty: AtomicBool,
}

impl Control {
    pub(crate) fn new(spec: ControlSpec) -> Self {
        let initial = spec.constrain(spec.default).unwrap_or(spec.min);
        Self {
            spec,
            value: AtomicF32::new(initial),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &ControlSpec {
        &self.spec
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value.load()
    }

    pub fn min(&self) -> f32 {
        self.spec.min
    }

    pub fn max(&self) -> f32 {
        self.spec.max
    }

    pub fn default_value(&self) -> f32 {
        self.spec.default
    }

    /// Position of the current value inside the range, 0.0 to 1.0.
    pub fn normalized(&self) -> f32 {
        let span = self.spec.max - self.spec.min;
        if span <= 0.0 {
            0.0
        } else {
            (self.value() - self.spec.min) / span
        }
    }

    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.spec.min, self.spec.max)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Store a constrained value. NaN writes are dropped and return `None`.
    pub(crate) fn store(&self, value: f32) -> Option<f32> {
        let constrained = self.spec.constrain(value)?;
        self.value.store(constrained);
        Some(constrained)
    }

    pub(crate) fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Clear the dirty flag, returning whether it was set.
    pub(crate) fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constrain_clamps_into_range() {
        let spec = ControlSpec::new("cutoff", 0.0, 1.0, 0.5);
        assert_eq!(spec.constrain(2.0), Some(1.0));
        assert_eq!(spec.constrain(-3.0), Some(0.0));
        assert_eq!(spec.constrain(f32::INFINITY), Some(1.0));
        assert_eq!(spec.constrain(f32::NEG_INFINITY), Some(0.0));
        assert_eq!(spec.constrain(f32::NAN), None);
    }

    #[test]
    fn stepped_controls_snap_to_positions() {
        let spec = ControlSpec::new("waveform", 0.0, 2.0, 0.0).steps(3);
        assert_eq!(spec.constrain(0.4), Some(0.0));
        assert_eq!(spec.constrain(0.6), Some(1.0));
        assert_eq!(spec.constrain(1.7), Some(2.0));
    }

    #[test]
    fn fewer_than_two_steps_is_continuous() {
        for steps in [0, 1] {
            let mut spec = ControlSpec::new("mode", 0.0, 1.0, 0.0);
            spec.steps = Some(steps);
            assert_eq!(spec.constrain(0.3), Some(0.3));
            assert_eq!(spec.constrain(4.0), Some(1.0));
            assert!(!spec.is_valid());
        }
    }

    #[test]
    fn toggle_is_zero_or_one() {
        let spec = ControlSpec::toggle("arp_on", false);
        assert_eq!(spec.constrain(0.3), Some(0.0));
        assert_eq!(spec.constrain(0.7), Some(1.0));
    }

    #[test]
    fn nan_write_keeps_previous_value() {
        let control = Control::new(ControlSpec::new("gain", 0.0, 1.0, 0.25));
        assert_eq!(control.store(f32::NAN), None);
        assert_eq!(control.value(), 0.25);
    }

    #[test]
    fn dirty_flag_is_taken_once() {
        let control = Control::new(ControlSpec::new("gain", 0.0, 1.0, 0.25));
        assert!(!control.take_dirty());
        control.mark_dirty();
        assert!(control.take_dirty());
        assert!(!control.take_dirty());
    }

    #[test]
    fn poly_modulated_accepts_both_contexts() {
        let spec = ControlSpec::new("cutoff", 0.0, 1.0, 0.5).poly_modulated();
        assert!(spec.accepts(VoiceContext::Mono));
        assert!(spec.accepts(VoiceContext::Poly));

        let spec = ControlSpec::new("bpm", 20.0, 300.0, 120.0).mono_modulated();
        assert!(spec.accepts(VoiceContext::Mono));
        assert!(!spec.accepts(VoiceContext::Poly));
    }

    #[test]
    fn invalid_ranges_are_detected() {
        assert!(!ControlSpec::new("a", 1.0, 0.0, 0.5).is_valid());
        assert!(!ControlSpec::new("b", 0.0, 1.0, 2.0).is_valid());
        assert!(!ControlSpec::new("c", f32::NAN, 1.0, 0.5).is_valid());
        assert!(ControlSpec::new("d", 0.0, 0.0, 0.0).is_valid());
    }
}
