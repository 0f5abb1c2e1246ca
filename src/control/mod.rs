//! Named, range-bounded parameters and the path UI edits take to reach them.
//!
//! Values live in atomic cells so the audio thread reads them every block
//! without locking, and any thread may observe them for display.

/// Parameter cells and their declarations.
pub mod cell;
/// Last-write-wins hand-off from UI edits to the engine.
pub mod channel;
/// Name-keyed registry of controls.
pub mod registry;

pub use cell::{AtomicF32, Control, ControlId, ControlSpec};
pub use channel::{channel, ParamChange, ParamReceiver, ParamSender};
pub use registry::ControlRegistry;

/// Whether a write should notify the engine that the control changed.
///
/// `Silent` exists to break update loops: a value echoed back to a widget, or
/// restored from a patch, should not bounce back as a fresh edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Send,
    Silent,
}
