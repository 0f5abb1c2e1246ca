//! Benchmarks for the per-block building blocks.

mod dsp;
mod modulation;
mod params;
mod scope;

pub use dsp::bench_dsp;
pub use modulation::bench_modulation;
pub use params::bench_params;
pub use scope::bench_scope;
