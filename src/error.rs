use crate::modulation::VoiceContext;

/// Errors surfaced to the control thread.
///
/// None of these are fatal to the engine: the audio thread never sees them.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchError {
    /// A control name is not present in the registry.
    NotFound { name: String },
    /// A route refers to a source or destination that does not exist.
    UnknownReference { name: String },
    /// The source (or destination) does not support the requested voice context.
    InvalidContext {
        source: String,
        destination: String,
        context: VoiceContext,
    },
    /// Connecting would let a source depend on its own output.
    Cycle { source: String, destination: String },
    /// Modulation amounts must be finite.
    InvalidAmount { amount: f32 },
    /// Two manifest entries share a name.
    DuplicateName { name: String },
    /// A manifest control has `min > max`, a non-finite bound, or a default outside its range.
    InvalidRange { name: String, min: f32, max: f32 },
    /// A voice index past the configured voice count.
    VoiceOutOfRange { voice: usize, voices: usize },
}

impl std::fmt::Display for PatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchError::NotFound { name } => write!(f, "no control named '{}'", name),
            PatchError::UnknownReference { name } => {
                write!(f, "unknown modulation source or destination '{}'", name)
            }
            PatchError::InvalidContext {
                source,
                destination,
                context,
            } => write!(
                f,
                "cannot route '{}' to '{}' in {} context",
                source, destination, context
            ),
            PatchError::Cycle {
                source,
                destination,
            } => write!(
                f,
                "routing '{}' to '{}' would feed '{}' back into itself",
                source, destination, source
            ),
            PatchError::InvalidAmount { amount } => {
                write!(f, "modulation amount must be finite, got {}", amount)
            }
            PatchError::DuplicateName { name } => write!(f, "duplicate name '{}'", name),
            PatchError::InvalidRange { name, min, max } => {
                write!(f, "invalid range for '{}': [{}, {}]", name, min, max)
            }
            PatchError::VoiceOutOfRange { voice, voices } => {
                write!(f, "voice {} out of range (engine has {} voices)", voice, voices)
            }
        }
    }
}

impl std::error::Error for PatchError {}

pub type Result<T, E = PatchError> = std::result::Result<T, E>;
