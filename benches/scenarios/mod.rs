//! Real-world scenario benchmarks.
//!
//! Full engine blocks with held notes and live modulation routes.

mod engine;

pub use engine::bench_engine;
