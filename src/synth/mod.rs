// Purpose: Voice management and the reference engine that drives the
// control/modulation core once per processing block.

pub mod arp;
pub mod engine;
pub mod message;
pub mod poly;
pub mod tempo;
pub mod voice;

pub use engine::{EngineConfig, EngineHandles, SynthEngine};
pub use message::SynthMessage;
