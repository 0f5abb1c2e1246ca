//! Routing modulation sources onto controls.
//!
//! The [`ModulationManager`] lives on the control thread and owns the
//! connection set. Each change is compiled into a [`RoutingTable`] that the
//! audio thread reads through a [`ModulationReader`].

/// Connection bookkeeping, validation and publishing.
pub mod manager;
/// Voice contexts, polarity and connection identity.
pub mod route;
/// Modulation source declarations and their streaming outputs.
pub mod source;
/// Compiled routing used on the audio thread.
pub mod table;

pub use manager::ModulationManager;
pub use route::{ConnectionKey, Polarity, RouteSpec, VoiceContext};
pub use source::{ModulationSource, OutputRegistry, SourceId, SourceKind, SourceSpec};
pub use table::{ModulationReader, RoutingTable};
