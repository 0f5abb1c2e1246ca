//! Low-level DSP primitives used by the reference engine.
//!
//! These components are allocation-free and realtime-safe, so they can live
//! directly inside voice structs.

/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// State-variable filter.
pub mod filter;
/// Low frequency oscillators for modulation.
pub mod lfo;
/// Modulation arithmetic shared with the routing table.
pub mod modulate;
/// Waveforms and phase accumulation.
pub mod oscillator;

pub use envelope::EnvelopeState;
