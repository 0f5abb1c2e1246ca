use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use arc_swap::ArcSwap;
use tracing::{debug, info, warn};

use crate::{
    control::{ControlId, ControlRegistry},
    error::{PatchError, Result},
    modulation::{
        route::{ConnectionKey, RouteParams, RouteSpec},
        table::{ModulationReader, RoutingTable},
        OutputRegistry, SourceId, VoiceContext,
    },
};

/*
Modulation Manager
==================

Owns the set of connections (source → destination control, in mono or poly
context) on the control thread, and publishes an immutable RoutingTable for
the audio thread after every change.

    effective = clamp(base + Σ polarity(source) × amount, min, max)

Publishing
----------

Every mutation rebuilds the table and swaps it in with ArcSwap (copy on
write). The audio thread latches the current table once per block, so a
re-patch is visible at the next block boundary and never half-applied.
Rebuilding is O(routes); routes number in the tens, and rebuilding happens at
UI speed, not audio speed.

Retired tables are parked here until the audio thread has moved on, so the
final drop (and deallocation) always happens on the control thread.

Feedback
--------

A source may read controls (an LFO reads its own rate). Routing a source into
a control it reads, directly or through other sources, would make its output
depend on itself within a block. Such connections are rejected with
PatchError::Cycle. Because the graph stays acyclic, the table can carry a
topological source order and the engine evaluates sources before anything
that consumes them.

    lfo1 ──→ lfo2_frequency ──(read by)──→ lfo2 ──→ filter_cutoff     ok
    lfo1 ──→ lfo1_frequency ──(read by)──→ lfo1                       Cycle
*/

pub struct ModulationManager {
    controls: ControlRegistry,
    outputs: OutputRegistry,
    connections: BTreeMap<ConnectionKey, RouteParams>,
    shared: Arc<ArcSwap<RoutingTable>>,
    retired: Vec<Arc<RoutingTable>>,
    version: u64,
}

impl ModulationManager {
    pub fn new(controls: ControlRegistry, outputs: OutputRegistry) -> Self {
        let table = RoutingTable::empty(controls.len(), outputs.len(), 0);
        Self {
            controls,
            outputs,
            connections: BTreeMap::new(),
            shared: Arc::new(ArcSwap::from_pointee(table)),
            retired: Vec::new(),
            version: 0,
        }
    }

    /// Audio-thread handle sharing this manager's published tables.
    pub fn reader(&self) -> ModulationReader {
        ModulationReader::new(
            self.shared.clone(),
            self.controls.clone(),
            self.outputs.clone(),
        )
    }

    pub fn controls(&self) -> &ControlRegistry {
        &self.controls
    }

    pub fn outputs(&self) -> &OutputRegistry {
        &self.outputs
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Route `source` into `destination` with a bipolar scale.
    pub fn connect(
        &mut self,
        source: &str,
        destination: &str,
        amount: f32,
        context: VoiceContext,
    ) -> Result<ConnectionKey> {
        self.connect_route(&RouteSpec {
            source: source.to_string(),
            destination: destination.to_string(),
            amount,
            context,
            polarity: Default::default(),
        })
    }

    /// Add or update a connection. On error nothing changes.
    pub fn connect_route(&mut self, route: &RouteSpec) -> Result<ConnectionKey> {
        let (key, params) = self.validate(route, &self.connections)?;
        let previous = self.connections.insert(key, params);
        if previous != Some(params) {
            self.publish();
        }
        debug!(
            source = %route.source,
            destination = %route.destination,
            amount = route.amount,
            context = %route.context,
            "connected modulation"
        );
        Ok(key)
    }

    /// Remove a connection. Removing one that does not exist is a no-op.
    pub fn disconnect(&mut self, key: &ConnectionKey) -> bool {
        if self.connections.remove(key).is_none() {
            return false;
        }
        self.publish();
        debug!(
            source = key.source.index(),
            destination = key.destination.index(),
            context = %key.context,
            "disconnected modulation"
        );
        true
    }

    /// Name-based [`ModulationManager::disconnect`]; unknown names are a no-op too.
    pub fn disconnect_named(
        &mut self,
        source: &str,
        destination: &str,
        context: VoiceContext,
    ) -> bool {
        match (self.outputs.id(source), self.controls.id(destination)) {
            (Ok(source), Ok(destination)) => self.disconnect(&ConnectionKey {
                source,
                destination,
                context,
            }),
            _ => false,
        }
    }

    /// Drop every route into `destination`. Returns how many were removed.
    pub fn disconnect_all_for(&mut self, destination: &str) -> Result<usize> {
        let destination = self.destination_id(destination)?;
        let before = self.connections.len();
        self.connections.retain(|key, _| key.destination != destination);
        let removed = before - self.connections.len();
        if removed > 0 {
            self.publish();
        }
        Ok(removed)
    }

    pub fn clear(&mut self) {
        if !self.connections.is_empty() {
            self.connections.clear();
            self.publish();
        }
    }

    /// Swap the whole connection set in one publish (patch load).
    ///
    /// Routes are validated in order against the routes before them; the
    /// first failure aborts and leaves the current set untouched.
    pub fn replace_all(&mut self, routes: &[RouteSpec]) -> Result<()> {
        let mut next = BTreeMap::new();
        for route in routes {
            let (key, params) = self.validate(route, &next)?;
            next.insert(key, params);
        }
        self.connections = next;
        self.publish();
        info!(routes = self.connections.len(), "replaced modulation routing");
        Ok(())
    }

    pub fn key(&self, source: &str, destination: &str, context: VoiceContext) -> Result<ConnectionKey> {
        Ok(ConnectionKey {
            source: self.outputs.id(source)?,
            destination: self.destination_id(destination)?,
            context,
        })
    }

    pub fn connection(&self, key: &ConnectionKey) -> Option<RouteSpec> {
        self.connections
            .get(key)
            .and_then(|params| self.describe(key, params))
    }

    /// Every connection by name, in key order.
    pub fn connections(&self) -> Vec<RouteSpec> {
        self.connections
            .iter()
            .filter_map(|(key, params)| self.describe(key, params))
            .collect()
    }

    /// Routes feeding one destination.
    pub fn connections_to(&self, destination: &str) -> Result<Vec<RouteSpec>> {
        let id = self.destination_id(destination)?;
        Ok(self
            .connections
            .iter()
            .filter(|(key, _)| key.destination == id)
            .filter_map(|(key, params)| self.describe(key, params))
            .collect())
    }

    /// Modulated value of `destination`: shared value for `None`, one voice's
    /// value for `Some(voice)`.
    pub fn effective_value(&self, destination: &str, voice: Option<usize>) -> Result<f32> {
        let id = self.destination_id(destination)?;
        self.check_voice(voice)?;
        Ok(self
            .shared
            .load()
            .effective_value(id, voice, &self.controls, &self.outputs))
    }

    /// Summed modulation on `destination`, without the base value.
    pub fn modulation_total(&self, destination: &str, voice: Option<usize>) -> Result<f32> {
        let id = self.destination_id(destination)?;
        self.check_voice(voice)?;
        Ok(self
            .shared
            .load()
            .modulation_total(id, voice, &self.outputs))
    }

    /// Names of sources in the order the engine evaluates them.
    pub fn source_order(&self) -> Vec<&str> {
        self.shared
            .load()
            .source_order()
            .iter()
            .filter_map(|id| self.outputs.source(*id).map(|s| s.name()))
            .collect()
    }

    /// Route endpoints that do not exist are unknown references, not
    /// missing controls.
    fn destination_id(&self, name: &str) -> Result<ControlId> {
        self.controls
            .id(name)
            .map_err(|_| PatchError::UnknownReference {
                name: name.to_string(),
            })
    }

    fn check_voice(&self, voice: Option<usize>) -> Result<()> {
        match voice {
            Some(v) if v >= self.outputs.voices() => Err(PatchError::VoiceOutOfRange {
                voice: v,
                voices: self.outputs.voices(),
            }),
            _ => Ok(()),
        }
    }

    fn describe(&self, key: &ConnectionKey, params: &RouteParams) -> Option<RouteSpec> {
        Some(RouteSpec {
            source: self.outputs.source(key.source)?.name().to_string(),
            destination: self.controls.control(key.destination)?.name().to_string(),
            amount: params.amount,
            context: key.context,
            polarity: params.polarity,
        })
    }

    fn validate(
        &self,
        route: &RouteSpec,
        existing: &BTreeMap<ConnectionKey, RouteParams>,
    ) -> Result<(ConnectionKey, RouteParams)> {
        let key = self.key(&route.source, &route.destination, route.context)?;
        if !route.amount.is_finite() {
            return Err(PatchError::InvalidAmount {
                amount: route.amount,
            });
        }

        let source_ok = self
            .outputs
            .source(key.source)
            .is_some_and(|s| s.kind().supports(route.context));
        let destination_ok = self
            .controls
            .control(key.destination)
            .is_some_and(|c| c.spec().accepts(route.context));
        if !source_ok || !destination_ok {
            return Err(PatchError::InvalidContext {
                source: route.source.clone(),
                destination: route.destination.clone(),
                context: route.context,
            });
        }

        if feeds_back(existing, &self.outputs, key.source, key.destination) {
            warn!(
                source = %route.source,
                destination = %route.destination,
                "rejected modulation feedback loop"
            );
            return Err(PatchError::Cycle {
                source: route.source.clone(),
                destination: route.destination.clone(),
            });
        }

        Ok((
            key,
            RouteParams {
                amount: route.amount,
                polarity: route.polarity,
            },
        ))
    }

    fn publish(&mut self) {
        self.version += 1;
        let table = RoutingTable::compile(
            &self.connections,
            self.controls.len(),
            &self.outputs,
            self.version,
        );
        let previous = self.shared.swap(Arc::new(table));
        self.retired.push(previous);
        // Only this list still references a table once its strong count is 1.
        self.retired.retain(|table| Arc::strong_count(table) > 1);
    }
}

/// Would routing `source` into `destination` let `source` read its own output?
fn feeds_back(
    connections: &BTreeMap<ConnectionKey, RouteParams>,
    outputs: &OutputRegistry,
    source: SourceId,
    destination: ControlId,
) -> bool {
    let mut stack = vec![destination];
    let mut visited = BTreeSet::new();
    while let Some(control) = stack.pop() {
        if !visited.insert(control) {
            continue;
        }
        for &reader in outputs.readers_of(control) {
            if reader == source {
                return true;
            }
            stack.extend(
                connections
                    .keys()
                    .filter(|key| key.source == reader)
                    .map(|key| key.destination),
            );
        }
    }
    false
}
