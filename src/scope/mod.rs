//! Oscilloscope feed: recent output samples for display.

/// Lock-free overwrite ring shared between the engine and a display.
pub mod memory;

pub use memory::{memory, MemoryReader, MemoryWriter};
