pub mod control; // Named parameters and the UI -> engine channel
pub mod dsp;
pub mod error;
pub mod io;
pub mod manifest; // Declarative control and source lists
pub mod modulation; // Sources, routes and the compiled routing table
pub mod patch;
pub mod scope; // Oscilloscope memory
pub mod synth; // Voice management and the reference engine

pub use control::{ControlRegistry, Notification, ParamSender};
pub use error::{PatchError, Result};
pub use modulation::{ModulationManager, OutputRegistry, RouteSpec, VoiceContext};
pub use synth::{EngineConfig, EngineHandles, SynthEngine};

pub const MAX_BLOCK_SIZE: usize = 2048;
pub const MAX_VOICES: usize = 32;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
