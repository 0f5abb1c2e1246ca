//! Route picker - choose a source and a destination, then toggle the route

use patchbay::{modulation::SourceKind, ModulationManager, Result, VoiceContext};

/// Amount given to routes created from the picker.
const ROUTE_AMOUNT: f32 = 0.3;

/// Cursor over the declared sources and the destinations that accept them.
///
/// Indices wrap, so the cursor stays valid when the destination list changes
/// length with the source's context.
#[derive(Debug, Default)]
pub struct RoutePicker {
    source: usize,
    destination: usize,
}

impl RoutePicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cycle_source(&mut self, modulation: &ModulationManager, step: isize) {
        let count = modulation.outputs().len();
        self.source = wrap(self.source, step, count);
        self.destination = 0;
    }

    pub fn cycle_destination(&mut self, modulation: &ModulationManager, step: isize) {
        let count = self
            .selection(modulation)
            .map_or(0, |(_, _, context)| modulation.controls().modulatable_names(context).len());
        self.destination = wrap(self.destination, step, count);
    }

    /// Selected source, destination and the context the source routes in.
    pub fn selection<'a>(
        &self,
        modulation: &'a ModulationManager,
    ) -> Option<(&'a str, &'a str, VoiceContext)> {
        let outputs = modulation.outputs();
        let source = outputs.names().nth(self.source)?;
        let context = match outputs.get(source).ok()?.kind() {
            SourceKind::Mono => VoiceContext::Mono,
            SourceKind::Poly => VoiceContext::Poly,
        };
        let destinations = modulation.controls().modulatable_names(context);
        let destination = *destinations.get(self.destination % destinations.len().max(1))?;
        Some((source, destination, context))
    }

    pub fn is_connected(&self, modulation: &ModulationManager) -> bool {
        self.selection(modulation)
            .and_then(|(source, destination, context)| {
                modulation.key(source, destination, context).ok()
            })
            .is_some_and(|key| modulation.connection(&key).is_some())
    }

    /// Connect the selected pair, or disconnect it if already routed.
    /// Returns whether the route exists afterwards.
    pub fn toggle(&self, modulation: &mut ModulationManager) -> Result<bool> {
        let Some((source, destination, context)) = self.selection(modulation) else {
            return Ok(false);
        };
        let key = modulation.key(source, destination, context)?;
        if modulation.connection(&key).is_some() {
            modulation.disconnect(&key);
            return Ok(false);
        }
        let (source, destination) = (source.to_string(), destination.to_string());
        modulation.connect(&source, &destination, ROUTE_AMOUNT, context)?;
        Ok(true)
    }

    pub fn label(&self, modulation: &ModulationManager) -> String {
        match self.selection(modulation) {
            Some((source, destination, _)) => {
                let state = if self.is_connected(modulation) { "on" } else { "off" };
                format!("{source} → {destination} [{state}]")
            }
            None => "no routes available".to_string(),
        }
    }
}

fn wrap(index: usize, step: isize, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    (index as isize + step).rem_euclid(count as isize) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay::{EngineConfig, SynthEngine};

    fn manager() -> ModulationManager {
        let (_, handles) = SynthEngine::new(EngineConfig::default().voices(2)).unwrap();
        handles.modulation
    }

    #[test]
    fn starts_on_the_first_source_and_destination() {
        let modulation = manager();
        let picker = RoutePicker::new();
        let first_source = modulation.outputs().names().next().unwrap();
        let (source, destination, context) = picker.selection(&modulation).unwrap();
        assert_eq!(source, first_source);
        assert_eq!(context, VoiceContext::Poly);
        assert_eq!(destination, modulation.controls().modulatable_names(context)[0]);
    }

    #[test]
    fn destinations_follow_the_source_context() {
        let modulation = manager();
        let mut picker = RoutePicker::new();
        // env1, lfo1: step onto the first mono source.
        picker.cycle_source(&modulation, 1);
        let (source, _, context) = picker.selection(&modulation).unwrap();
        assert_eq!(source, "lfo1");
        assert_eq!(context, VoiceContext::Mono);

        let mono = modulation.controls().modulatable_names(VoiceContext::Mono);
        for expected in mono.iter().chain(mono.first()) {
            assert_eq!(picker.selection(&modulation).unwrap().1, *expected);
            picker.cycle_destination(&modulation, 1);
        }
    }

    #[test]
    fn cycling_wraps_both_ways() {
        let modulation = manager();
        let mut picker = RoutePicker::new();
        picker.cycle_source(&modulation, -1);
        assert_eq!(picker.selection(&modulation).unwrap().0, "velocity");
        picker.cycle_source(&modulation, 1);
        assert_eq!(picker.selection(&modulation).unwrap().0, "env1");
    }

    #[test]
    fn toggle_connects_then_disconnects() {
        let mut modulation = manager();
        let mut picker = RoutePicker::new();
        picker.cycle_source(&modulation, 1);
        let (_, destination, _) = picker.selection(&modulation).unwrap();
        let destination = destination.to_string();

        assert!(picker.toggle(&mut modulation).unwrap());
        assert!(picker.is_connected(&modulation));
        let routes = modulation.connections_to(&destination).unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].amount, ROUTE_AMOUNT);
        assert!(picker.label(&modulation).ends_with("[on]"));

        assert!(!picker.toggle(&mut modulation).unwrap());
        assert!(modulation.is_empty());
    }
}
