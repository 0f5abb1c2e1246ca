//! Declarative parameter and source lists.
//!
//! A manifest is the single place names are introduced. Widgets, patches and
//! the engine all bind to the names declared here instead of hand-wiring one
//! field per parameter.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    control::{ControlRegistry, ControlSpec},
    error::Result,
    modulation::{OutputRegistry, SourceSpec},
};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub controls: Vec<ControlSpec>,
    pub sources: Vec<SourceSpec>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn control(mut self, spec: ControlSpec) -> Self {
        self.controls.push(spec);
        self
    }

    pub fn source(mut self, spec: SourceSpec) -> Self {
        self.sources.push(spec);
        self
    }

    /// Validate the manifest and create live registries with `voices` per-voice
    /// slots on every source.
    pub fn build(&self, voices: usize) -> Result<(ControlRegistry, OutputRegistry)> {
        let controls = ControlRegistry::new(self.controls.iter().cloned())?;
        let outputs = OutputRegistry::new(self.sources.iter().cloned(), voices, &controls)?;
        info!(
            controls = controls.len(),
            sources = outputs.len(),
            voices,
            "built registries from manifest"
        );
        Ok((controls, outputs))
    }
}

/// Parameters and sources of the reference subtractive voice.
pub fn synth_manifest() -> Manifest {
    let envelope = |prefix: &str, attack: f32, decay: f32, sustain: f32, release: f32| {
        [
            ControlSpec::new(format!("{prefix}_attack"), 0.001, 4.0, attack),
            ControlSpec::new(format!("{prefix}_decay"), 0.001, 4.0, decay),
            ControlSpec::new(format!("{prefix}_sustain"), 0.0, 1.0, sustain),
            ControlSpec::new(format!("{prefix}_release"), 0.001, 8.0, release),
        ]
    };

    let mut manifest = Manifest::new()
        .control(ControlSpec::new("volume", 0.0, 1.0, 0.6).mono_modulated())
        .control(ControlSpec::new("osc_waveform", 0.0, 2.0, 1.0).steps(3))
        .control(ControlSpec::new("osc_tune", -24.0, 24.0, 0.0).poly_modulated())
        .control(ControlSpec::new("filter_cutoff", 0.0, 1.0, 0.6).poly_modulated())
        .control(ControlSpec::new("filter_resonance", 0.0, 1.0, 0.2).poly_modulated())
        .control(ControlSpec::new("lfo1_frequency", 0.01, 20.0, 2.0).mono_modulated())
        .control(ControlSpec::new("lfo1_waveform", 0.0, 3.0, 0.0).steps(4))
        .control(ControlSpec::new("lfo2_frequency", 0.01, 20.0, 0.25).mono_modulated())
        .control(ControlSpec::new("lfo2_waveform", 0.0, 3.0, 1.0).steps(4))
        .control(ControlSpec::new("beats_per_minute", 20.0, 300.0, 120.0))
        .control(ControlSpec::toggle("arp_on", false))
        .control(ControlSpec::new("arp_frequency", 0.25, 20.0, 4.0).mono_modulated())
        .control(ControlSpec::new("arp_gate", 0.05, 1.0, 0.5).mono_modulated())
        .control(ControlSpec::new("arp_octaves", 1.0, 4.0, 1.0).steps(4))
        .control(ControlSpec::new("arp_pattern", 0.0, 4.0, 0.0).steps(5))
        // free, tempo, dotted, triplet
        .control(ControlSpec::new("arp_sync", 0.0, 3.0, 0.0).steps(4))
        // index into the tempo divisions; 6 is a sixteenth
        .control(ControlSpec::new("arp_tempo", 0.0, 8.0, 6.0).steps(9));

    for spec in envelope("amp", 0.01, 0.2, 0.7, 0.3)
        .into_iter()
        .chain(envelope("env1", 0.05, 0.4, 0.3, 0.5))
    {
        manifest = manifest.control(spec);
    }

    manifest
        .source(SourceSpec::mono("lfo1").reads(["lfo1_frequency", "lfo1_waveform"]))
        .source(SourceSpec::mono("lfo2").reads(["lfo2_frequency", "lfo2_waveform"]))
        .source(SourceSpec::poly("env1").reads([
            "env1_attack",
            "env1_decay",
            "env1_sustain",
            "env1_release",
        ]))
        .source(SourceSpec::poly("velocity"))
        .source(SourceSpec::poly("note"))
}
