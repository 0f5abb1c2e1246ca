use std::{collections::BTreeMap, sync::Arc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    control::{AtomicF32, ControlId, ControlRegistry},
    error::{PatchError, Result},
    modulation::VoiceContext,
};

/// Whether a source produces one shared value or one value per voice.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// One value for the whole instrument (free-running LFO, step sequencer).
    Mono,
    /// One value per active voice (envelopes, velocity, key tracking).
    Poly,
}

impl SourceKind {
    /// Mono sources drive mono routes only, poly sources poly routes only.
    pub fn supports(self, context: VoiceContext) -> bool {
        matches!(
            (self, context),
            (SourceKind::Mono, VoiceContext::Mono) | (SourceKind::Poly, VoiceContext::Poly)
        )
    }
}

/// Declaration of a modulation source.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub name: String,
    pub kind: SourceKind,
    /// Controls this source reads while computing its output. Used to reject
    /// routes that would feed a source back into itself.
    #[cfg_attr(feature = "serde", serde(default))]
    pub inputs: Vec<String>,
}

impl SourceSpec {
    pub fn mono(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SourceKind::Mono,
            inputs: Vec::new(),
        }
    }

    pub fn poly(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SourceKind::Poly,
            inputs: Vec::new(),
        }
    }

    pub fn reads<I, S>(mut self, controls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(controls.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub(crate) usize);

impl SourceId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Streaming output of one source.
///
/// The engine overwrites it every block; readers get whatever was last
/// written. A poly source's mono cell mirrors the most recently triggered
/// voice so a UI has something to meter.
#[derive(Debug)]
pub struct ModulationSource {
    spec: SourceSpec,
    inputs: Vec<ControlId>,
    mono: AtomicF32,
    voices: Box<[AtomicF32]>,
}

impl ModulationSource {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn kind(&self) -> SourceKind {
        self.spec.kind
    }

    pub fn inputs(&self) -> &[ControlId] {
        &self.inputs
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.mono.load()
    }

    #[inline]
    pub fn voice_value(&self, voice: usize) -> f32 {
        self.voices.get(voice).map_or(0.0, AtomicF32::load)
    }
}

/// Name-keyed, read-mostly collection of modulation sources.
#[derive(Debug, Clone)]
pub struct OutputRegistry {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    sources: Box<[ModulationSource]>,
    index: BTreeMap<String, SourceId>,
    /// For each control id, the sources that read it.
    readers: Box<[Vec<SourceId>]>,
    voices: usize,
}

#[inline]
fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

impl OutputRegistry {
    /// Build the registry. Source inputs must name controls in `controls`.
    pub fn new(
        specs: impl IntoIterator<Item = SourceSpec>,
        voices: usize,
        controls: &ControlRegistry,
    ) -> Result<Self> {
        let mut sources = Vec::new();
        let mut index = BTreeMap::new();
        let mut readers = vec![Vec::new(); controls.len()];

        for spec in specs {
            let id = SourceId(sources.len());
            if index.insert(spec.name.clone(), id).is_some() {
                return Err(PatchError::DuplicateName { name: spec.name });
            }

            let mut inputs = Vec::with_capacity(spec.inputs.len());
            for input in &spec.inputs {
                let control = controls
                    .id(input)
                    .map_err(|_| PatchError::UnknownReference {
                        name: input.clone(),
                    })?;
                if !inputs.contains(&control) {
                    inputs.push(control);
                    readers[control.0].push(id);
                }
            }

            sources.push(ModulationSource {
                spec,
                inputs,
                mono: AtomicF32::new(0.0),
                voices: (0..voices).map(|_| AtomicF32::new(0.0)).collect(),
            });
        }

        Ok(Self {
            inner: Arc::new(Inner {
                sources: sources.into_boxed_slice(),
                index,
                readers: readers.into_boxed_slice(),
                voices,
            }),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.sources.is_empty()
    }

    /// Number of per-voice slots each source carries.
    pub fn voices(&self) -> usize {
        self.inner.voices
    }

    pub fn id(&self, name: &str) -> Result<SourceId> {
        self.inner
            .index
            .get(name)
            .copied()
            .ok_or_else(|| PatchError::UnknownReference {
                name: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Result<&ModulationSource> {
        let id = self.id(name)?;
        Ok(&self.inner.sources[id.0])
    }

    #[inline]
    pub fn source(&self, id: SourceId) -> Option<&ModulationSource> {
        self.inner.sources.get(id.0)
    }

    /// Sorted source names.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.inner.index.keys().map(String::as_str)
    }

    /// Sources in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &ModulationSource)> + '_ {
        self.inner
            .sources
            .iter()
            .enumerate()
            .map(|(i, s)| (SourceId(i), s))
    }

    /// Current shared value of a source.
    pub fn value(&self, name: &str) -> Result<f32> {
        Ok(self.get(name)?.value())
    }

    pub fn voice_value(&self, name: &str, voice: usize) -> Result<f32> {
        if voice >= self.inner.voices {
            return Err(PatchError::VoiceOutOfRange {
                voice,
                voices: self.inner.voices,
            });
        }
        Ok(self.get(name)?.voice_value(voice))
    }

    #[inline]
    pub(crate) fn mono_value_by_id(&self, id: SourceId) -> f32 {
        self.inner.sources.get(id.0).map_or(0.0, ModulationSource::value)
    }

    #[inline]
    pub(crate) fn voice_value_by_id(&self, id: SourceId, voice: usize) -> f32 {
        self.inner
            .sources
            .get(id.0)
            .map_or(0.0, |s| s.voice_value(voice))
    }

    /// Engine side: publish a source's shared value. Non-finite values become 0.
    #[inline]
    pub fn write_mono(&self, id: SourceId, value: f32) {
        if let Some(source) = self.inner.sources.get(id.0) {
            source.mono.store(sanitize(value));
        }
    }

    /// Engine side: publish one voice's value. Non-finite values become 0.
    #[inline]
    pub fn write_voice(&self, id: SourceId, voice: usize, value: f32) {
        if let Some(cell) = self
            .inner
            .sources
            .get(id.0)
            .and_then(|s| s.voices.get(voice))
        {
            cell.store(sanitize(value));
        }
    }

    /// Sources that read `control` while computing their output.
    pub(crate) fn readers_of(&self, control: ControlId) -> &[SourceId] {
        self.inner
            .readers
            .get(control.0)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
