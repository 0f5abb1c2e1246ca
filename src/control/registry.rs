use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use crate::{
    control::{Control, ControlId, ControlSpec, Notification},
    error::{PatchError, Result},
    modulation::VoiceContext,
};

/// Name-keyed collection of live controls.
///
/// Cloning is cheap and every clone sees the same cells: the UI, the
/// modulation manager and the engine each hold one. Topology (which names
/// exist) is fixed at construction; only values change afterwards.
#[derive(Debug, Clone)]
pub struct ControlRegistry {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    controls: Box<[Control]>,
    index: BTreeMap<String, ControlId>,
    /// Bumped on every notifying write so readers can skip the dirty scan.
    generation: AtomicU64,
}

impl ControlRegistry {
    /// Build a registry from control declarations, rejecting duplicate names
    /// and malformed ranges.
    pub fn new(specs: impl IntoIterator<Item = ControlSpec>) -> Result<Self> {
        let mut controls = Vec::new();
        let mut index = BTreeMap::new();

        for spec in specs {
            if !spec.is_valid() {
                return Err(PatchError::InvalidRange {
                    name: spec.name.clone(),
                    min: spec.min,
                    max: spec.max,
                });
            }
            let id = ControlId(controls.len());
            if index.insert(spec.name.clone(), id).is_some() {
                return Err(PatchError::DuplicateName { name: spec.name });
            }
            controls.push(Control::new(spec));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                controls: controls.into_boxed_slice(),
                index,
                generation: AtomicU64::new(0),
            }),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.controls.is_empty()
    }

    pub fn id(&self, name: &str) -> Result<ControlId> {
        self.inner
            .index
            .get(name)
            .copied()
            .ok_or_else(|| PatchError::NotFound {
                name: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Result<&Control> {
        let id = self.id(name)?;
        Ok(&self.inner.controls[id.0])
    }

    #[inline]
    pub fn control(&self, id: ControlId) -> Option<&Control> {
        self.inner.controls.get(id.0)
    }

    pub fn value(&self, name: &str) -> Result<f32> {
        Ok(self.get(name)?.value())
    }

    /// Write a value, clamped to the control's range.
    ///
    /// With [`Notification::Send`] the control is marked dirty so the engine
    /// picks it up at its next block. Returns the value actually stored.
    pub fn set(&self, name: &str, value: f32, notification: Notification) -> Result<f32> {
        let id = self.id(name)?;
        Ok(self.write(id, value, notification))
    }

    /// Same as [`ControlRegistry::set`] for callers that already resolved the name.
    pub fn set_by_id(&self, id: ControlId, value: f32, notification: Notification) -> f32 {
        self.write(id, value, notification)
    }

    fn write(&self, id: ControlId, value: f32, notification: Notification) -> f32 {
        let Some(control) = self.inner.controls.get(id.0) else {
            return value;
        };
        // NaN leaves the cell untouched; report what is actually stored.
        let stored = control.store(value).unwrap_or_else(|| control.value());
        if notification == Notification::Send {
            control.mark_dirty();
            self.inner.generation.fetch_add(1, Ordering::AcqRel);
        }
        stored
    }

    /// Sorted names of every control.
    pub fn all_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.inner.index.keys().map(String::as_str)
    }

    /// Names a routing UI may offer as destinations for the given context.
    pub fn modulatable_names(&self, context: VoiceContext) -> Vec<&str> {
        self.inner
            .index
            .iter()
            .filter(|(_, id)| self.inner.controls[id.0].spec().accepts(context))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Controls in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (ControlId, &Control)> + '_ {
        self.inner
            .controls
            .iter()
            .enumerate()
            .map(|(i, c)| (ControlId(i), c))
    }

    pub fn reset_to_defaults(&self, notification: Notification) {
        for (id, control) in self.iter() {
            self.write(id, control.default_value(), notification);
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ControlRegistry {
        ControlRegistry::new([
            ControlSpec::new("filter_cutoff", 0.0, 1.0, 0.5).poly_modulated(),
            ControlSpec::new("beats_per_minute", 20.0, 300.0, 120.0).mono_modulated(),
            ControlSpec::toggle("arp_on", false),
        ])
        .unwrap()
    }

    #[test]
    fn get_unknown_name_fails() {
        let registry = registry();
        assert_eq!(
            registry.get("resonance").unwrap_err(),
            PatchError::NotFound {
                name: "resonance".into()
            }
        );
    }

    #[test]
    fn set_clamps_and_returns_stored_value() {
        let registry = registry();
        assert_eq!(
            registry
                .set("beats_per_minute", 1000.0, Notification::Send)
                .unwrap(),
            300.0
        );
        assert_eq!(registry.value("beats_per_minute").unwrap(), 300.0);
        assert_eq!(
            registry.set("filter_cutoff", -1.0, Notification::Send).unwrap(),
            0.0
        );
    }

    #[test]
    fn values_stay_in_range_after_any_sequence_of_sets() {
        let registry = registry();
        let writes = [
            -1e9, 1e9, 0.3, f32::NAN, f32::INFINITY, -0.0, 42.0, f32::NEG_INFINITY, 0.999,
        ];
        for name in ["filter_cutoff", "beats_per_minute", "arp_on"] {
            for &w in &writes {
                registry.set(name, w, Notification::Send).unwrap();
                let control = registry.get(name).unwrap();
                assert!(
                    (control.min()..=control.max()).contains(&control.value()),
                    "{} escaped its range after writing {}",
                    name,
                    w
                );
            }
        }
    }

    #[test]
    fn silent_set_does_not_mark_dirty() {
        let registry = registry();
        let before = registry.generation();
        registry
            .set("filter_cutoff", 0.7, Notification::Silent)
            .unwrap();
        assert!(!registry.get("filter_cutoff").unwrap().is_dirty());
        assert_eq!(registry.generation(), before);

        registry.set("filter_cutoff", 0.8, Notification::Send).unwrap();
        assert!(registry.get("filter_cutoff").unwrap().is_dirty());
        assert!(registry.generation() > before);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = ControlRegistry::new([
            ControlSpec::new("gain", 0.0, 1.0, 0.5),
            ControlSpec::new("gain", 0.0, 2.0, 0.5),
        ])
        .unwrap_err();
        assert_eq!(err, PatchError::DuplicateName { name: "gain".into() });
    }

    #[test]
    fn degenerate_step_counts_are_rejected() {
        for steps in [0, 1] {
            let mut spec = ControlSpec::new("mode", 0.0, 1.0, 0.0);
            spec.steps = Some(steps);
            let err = ControlRegistry::new([spec]).unwrap_err();
            assert!(matches!(err, PatchError::InvalidRange { .. }), "steps {}", steps);
        }
    }

    #[test]
    fn all_names_are_sorted() {
        let registry = registry();
        let names: Vec<_> = registry.all_names().collect();
        assert_eq!(names, vec!["arp_on", "beats_per_minute", "filter_cutoff"]);
    }

    #[test]
    fn modulatable_names_follow_context() {
        let registry = registry();
        assert_eq!(
            registry.modulatable_names(VoiceContext::Mono),
            vec!["beats_per_minute", "filter_cutoff"]
        );
        assert_eq!(
            registry.modulatable_names(VoiceContext::Poly),
            vec!["filter_cutoff"]
        );
    }

    #[test]
    fn reset_restores_defaults() {
        let registry = registry();
        registry.set("filter_cutoff", 0.9, Notification::Send).unwrap();
        registry.reset_to_defaults(Notification::Silent);
        assert_eq!(registry.value("filter_cutoff").unwrap(), 0.5);
    }
}
