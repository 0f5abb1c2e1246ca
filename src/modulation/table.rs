use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use arc_swap::{ArcSwap, Guard};

use crate::{
    control::{ControlId, ControlRegistry},
    dsp::modulate::apply_modulation,
    modulation::{
        route::{ConnectionKey, Polarity, RouteParams},
        OutputRegistry, SourceId, VoiceContext,
    },
};

#[derive(Debug, Clone, Copy)]
struct CompiledRoute {
    source: SourceId,
    context: VoiceContext,
    amount: f32,
    polarity: Polarity,
}

/// Immutable, audio-ready view of the connection set.
///
/// Routes are grouped by destination so evaluating one control touches a
/// contiguous slice. Within a destination they are ordered by source id, then
/// context, which fixes the summation order and keeps results reproducible.
#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: Vec<CompiledRoute>,
    /// `spans[control]` is the `start..end` range of that control's routes.
    spans: Vec<(u32, u32)>,
    /// Sources ordered so that every source comes before any source reading
    /// a control it modulates.
    source_order: Vec<SourceId>,
    version: u64,
}

impl RoutingTable {
    pub(crate) fn empty(controls: usize, sources: usize, version: u64) -> Self {
        Self {
            routes: Vec::new(),
            spans: vec![(0, 0); controls],
            source_order: (0..sources).map(SourceId).collect(),
            version,
        }
    }

    pub(crate) fn compile(
        connections: &BTreeMap<ConnectionKey, RouteParams>,
        controls: usize,
        outputs: &OutputRegistry,
        version: u64,
    ) -> Self {
        let mut ordered: Vec<_> = connections.iter().collect();
        ordered.sort_by_key(|(key, _)| (key.destination, key.source, key.context));

        let mut routes = Vec::with_capacity(ordered.len());
        let mut spans = vec![(0u32, 0u32); controls];
        let mut i = 0;
        while i < ordered.len() {
            let destination = ordered[i].0.destination;
            let start = routes.len();
            while i < ordered.len() && ordered[i].0.destination == destination {
                let (key, params) = ordered[i];
                routes.push(CompiledRoute {
                    source: key.source,
                    context: key.context,
                    amount: params.amount,
                    polarity: params.polarity,
                });
                i += 1;
            }
            if let Some(span) = spans.get_mut(destination.0) {
                *span = (start as u32, routes.len() as u32);
            }
        }

        Self {
            routes,
            spans,
            source_order: evaluation_order(connections, outputs),
            version,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn source_order(&self) -> &[SourceId] {
        &self.source_order
    }

    /// Summed modulation on `destination`. `None` sums mono routes only; a
    /// voice sums mono routes plus that voice's poly routes.
    #[inline]
    pub fn modulation_total(
        &self,
        destination: ControlId,
        voice: Option<usize>,
        outputs: &OutputRegistry,
    ) -> f32 {
        let Some(&(start, end)) = self.spans.get(destination.0) else {
            return 0.0;
        };
        let mut total = 0.0;
        for route in &self.routes[start as usize..end as usize] {
            let raw = match (route.context, voice) {
                (VoiceContext::Mono, _) => outputs.mono_value_by_id(route.source),
                (VoiceContext::Poly, Some(v)) => outputs.voice_value_by_id(route.source, v),
                (VoiceContext::Poly, None) => continue,
            };
            let contribution = route.polarity.apply(raw) * route.amount;
            if contribution.is_finite() {
                total += contribution;
            }
        }
        total
    }

    /// Base value plus summed modulation, clamped to the control's range.
    #[inline]
    pub fn effective_value(
        &self,
        destination: ControlId,
        voice: Option<usize>,
        controls: &ControlRegistry,
        outputs: &OutputRegistry,
    ) -> f32 {
        let Some(control) = controls.control(destination) else {
            return 0.0;
        };
        let base = control.value();
        let modulated = apply_modulation(
            base,
            self.modulation_total(destination, voice, outputs),
            1.0,
        );
        if modulated.is_finite() {
            control.clamp(modulated)
        } else {
            base
        }
    }
}

/// Topological order of sources: an edge `a -> b` exists when `a` is routed
/// into a control that `b` reads. Ties go to the lower id so the order is
/// stable. Connect-time validation keeps the graph acyclic; anything left
/// over is appended in id order.
fn evaluation_order(
    connections: &BTreeMap<ConnectionKey, RouteParams>,
    outputs: &OutputRegistry,
) -> Vec<SourceId> {
    let count = outputs.len();
    let mut edges: Vec<BTreeSet<SourceId>> = vec![BTreeSet::new(); count];
    for key in connections.keys() {
        for &reader in outputs.readers_of(key.destination) {
            if let Some(out) = edges.get_mut(key.source.0) {
                out.insert(reader);
            }
        }
    }

    let mut indegree = vec![0usize; count];
    for targets in &edges {
        for target in targets {
            indegree[target.0] += 1;
        }
    }

    let mut ready: BTreeSet<SourceId> = (0..count)
        .filter(|&i| indegree[i] == 0)
        .map(SourceId)
        .collect();
    let mut order = Vec::with_capacity(count);
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for target in &edges[next.0] {
            indegree[target.0] -= 1;
            if indegree[target.0] == 0 {
                ready.insert(*target);
            }
        }
    }

    if order.len() < count {
        for i in 0..count {
            if !order.contains(&SourceId(i)) {
                order.push(SourceId(i));
            }
        }
    }
    order
}

/// Audio-thread view of the routing.
///
/// Call [`ModulationReader::latch`] once at the start of each block; every
/// lookup in that block then sees the same table, so a re-patch from the
/// control thread is never observed half-applied. Lookups neither lock nor
/// allocate.
pub struct ModulationReader {
    shared: Arc<ArcSwap<RoutingTable>>,
    table: Arc<RoutingTable>,
    controls: ControlRegistry,
    outputs: OutputRegistry,
}

impl ModulationReader {
    pub(crate) fn new(
        shared: Arc<ArcSwap<RoutingTable>>,
        controls: ControlRegistry,
        outputs: OutputRegistry,
    ) -> Self {
        let table = shared.load_full();
        Self {
            shared,
            table,
            controls,
            outputs,
        }
    }

    /// Pick up the most recently published table. Returns true if it changed.
    pub fn latch(&mut self) -> bool {
        let latest = self.shared.load();
        if Arc::ptr_eq(&*latest, &self.table) {
            return false;
        }
        // The manager keeps retired tables alive until we let go, so the old
        // table is never freed here.
        self.table = Guard::into_inner(latest);
        true
    }

    #[inline]
    pub fn effective_value(&self, destination: ControlId, voice: Option<usize>) -> f32 {
        self.table
            .effective_value(destination, voice, &self.controls, &self.outputs)
    }

    #[inline]
    pub fn modulation_total(&self, destination: ControlId, voice: Option<usize>) -> f32 {
        self.table
            .modulation_total(destination, voice, &self.outputs)
    }

    pub fn source_order(&self) -> &[SourceId] {
        self.table.source_order()
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn controls(&self) -> &ControlRegistry {
        &self.controls
    }

    pub fn outputs(&self) -> &OutputRegistry {
        &self.outputs
    }
}
