//! Patch snapshots: control values plus modulation routing, by name.
//!
//! Reading and writing patch files is left to the caller; with the `serde`
//! feature these types serialize to whatever format it chooses.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    control::Notification,
    error::Result,
    modulation::{ModulationManager, RouteSpec},
};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchSnapshot {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub controls: BTreeMap<String, f32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub modulations: Vec<RouteSpec>,
}

impl PatchSnapshot {
    /// Record every control value and connection currently in `manager`.
    pub fn capture(name: impl Into<String>, manager: &ModulationManager) -> Self {
        Self {
            name: name.into(),
            controls: manager
                .controls()
                .iter()
                .map(|(_, control)| (control.name().to_string(), control.value()))
                .collect(),
            modulations: manager.connections(),
        }
    }

    /// Load this patch: routing is replaced in one publish, then every control
    /// takes its stored value (or its default when the patch omits it).
    ///
    /// Everything is validated before anything changes; an unknown control
    /// or a bad route leaves the current state untouched.
    pub fn apply(&self, manager: &mut ModulationManager) -> Result<()> {
        let controls = manager.controls().clone();
        for name in self.controls.keys() {
            controls.id(name)?;
        }

        manager.replace_all(&self.modulations)?;

        for (id, control) in controls.iter() {
            let value = self
                .controls
                .get(control.name())
                .copied()
                .unwrap_or_else(|| control.default_value());
            controls.set_by_id(id, value, Notification::Send);
        }

        info!(
            patch = %self.name,
            controls = self.controls.len(),
            routes = self.modulations.len(),
            "applied patch"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::PatchError, manifest::synth_manifest, modulation::VoiceContext};

    fn manager() -> ModulationManager {
        let (controls, outputs) = synth_manifest().build(4).unwrap();
        ModulationManager::new(controls, outputs)
    }

    #[test]
    fn capture_then_apply_restores_state() {
        let mut manager = manager();
        manager
            .controls()
            .set("filter_cutoff", 0.25, Notification::Send)
            .unwrap();
        manager
            .connect("lfo1", "filter_cutoff", 0.3, VoiceContext::Mono)
            .unwrap();
        let patch = PatchSnapshot::capture("wobble", &manager);

        manager.clear();
        manager
            .controls()
            .set("filter_cutoff", 0.9, Notification::Send)
            .unwrap();

        patch.apply(&mut manager).unwrap();
        assert_eq!(manager.controls().value("filter_cutoff").unwrap(), 0.25);
        assert_eq!(manager.connections(), patch.modulations);
    }

    #[test]
    fn missing_controls_fall_back_to_defaults() {
        let mut manager = manager();
        manager
            .controls()
            .set("volume", 0.1, Notification::Send)
            .unwrap();
        PatchSnapshot::default().apply(&mut manager).unwrap();
        assert_eq!(manager.controls().value("volume").unwrap(), 0.6);
    }

    #[test]
    fn unknown_control_leaves_state_untouched() {
        let mut manager = manager();
        manager
            .connect("lfo2", "filter_cutoff", 0.1, VoiceContext::Mono)
            .unwrap();
        let mut patch = PatchSnapshot::default();
        patch.controls.insert("portamento".into(), 0.5);

        let err = patch.apply(&mut manager).unwrap_err();
        assert_eq!(err, PatchError::NotFound { name: "portamento".into() });
        assert_eq!(manager.len(), 1);
    }
}
