//! Patchbay processing: an arbitrary DAG of audio/event connections.
//!
//! The control thread owns the connection set and publishes an evaluation
//! plan (topological order plus connection list) through an atomic swap;
//! the audio thread walks the plan, summing audio inputs and merging event
//! inputs per client, then hands each plugin its own port buffers.

use super::{EventMerger, EventSource};
use crate::callback::CallbackOpcode;
use crate::driver::DriverBlock;
use crate::error::{Error, Result};
use crate::mailbox::{ControlEventRecord, DeferredCallback, DeferredQueue};
use crate::port::EVENT_BUFFER_CAPACITY;
use crate::registry::{PluginId, Registry, Snapshot};
use arc_swap::ArcSwap;
use attacca_plugin::{EngineEvent, EventVec, PortCounts, ProcessContext, TimeInfo};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Pseudo plugin id for the engine's own backend I/O ports.
pub const SYSTEM_PLUGIN: PluginId = u32::MAX;

pub type ConnectionId = u32;

/// Which port family a connection endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortGroup {
    Audio,
    Event,
}

/// One endpoint of a connection. `index` counts within the group and the
/// endpoint's side: a source indexes output ports, a sink input ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRef {
    pub plugin: PluginId,
    pub group: PortGroup,
    pub index: u32,
}

impl PortRef {
    pub fn audio(plugin: PluginId, index: u32) -> Self {
        Self {
            plugin,
            group: PortGroup::Audio,
            index,
        }
    }

    pub fn event(plugin: PluginId, index: u32) -> Self {
        Self {
            plugin,
            group: PortGroup::Event,
            index,
        }
    }
}

/// A directed edge from an output port to an input port of matching kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub source: PortRef,
    pub sink: PortRef,
}

/// What the audio thread evaluates each cycle.
pub(crate) struct PatchPlan {
    pub order: Vec<PluginId>,
    pub connections: Vec<Connection>,
}

impl PatchPlan {
    fn empty() -> Self {
        Self {
            order: Vec::new(),
            connections: Vec::new(),
        }
    }
}

/// Control-side connection table with plan publication.
pub(crate) struct Patchbay {
    connections: Mutex<Vec<Connection>>,
    next_id: AtomicU32,
    plan: ArcSwap<PatchPlan>,
}

impl Patchbay {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(Vec::new()),
            next_id: AtomicU32::new(0),
            plan: ArcSwap::from_pointee(PatchPlan::empty()),
        }
    }

    /// Validate and store a connection, then publish a fresh plan.
    ///
    /// Rejected: unknown plugins or port indices, direction/kind mismatch,
    /// duplicate edges, and anything that would close a cycle.
    pub fn connect(&self, registry: &Registry, source: PortRef, sink: PortRef) -> Result<ConnectionId> {
        if source.group != sink.group {
            return Err(Error::InvalidArgument(
                "connection endpoints have different kinds".into(),
            ));
        }
        validate_endpoint(registry, &source, true)?;
        validate_endpoint(registry, &sink, false)?;
        // Capture-to-playback passthrough is fine; a plugin feeding itself
        // is not.
        if source.plugin == sink.plugin && source.plugin != SYSTEM_PLUGIN {
            return Err(Error::InvalidArgument(
                "connection would loop a plugin onto itself".into(),
            ));
        }

        let mut connections = self.connections.lock();
        if connections
            .iter()
            .any(|c| c.source == source && c.sink == sink)
        {
            return Err(Error::InvalidArgument("connection already exists".into()));
        }
        if source.plugin != SYSTEM_PLUGIN
            && sink.plugin != SYSTEM_PLUGIN
            && reaches(&connections, sink.plugin, source.plugin)
        {
            return Err(Error::InvalidArgument(
                "connection would create a cycle".into(),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::AcqRel);
        connections.push(Connection { id, source, sink });
        drop(connections);
        self.rebuild_plan(registry);
        Ok(id)
    }

    pub fn disconnect(&self, registry: &Registry, id: ConnectionId) -> Result<()> {
        {
            let mut connections = self.connections.lock();
            let index = connections
                .iter()
                .position(|c| c.id == id)
                .ok_or_else(|| Error::InvalidArgument(format!("no connection with id {id}")))?;
            connections.remove(index);
        }
        self.rebuild_plan(registry);
        Ok(())
    }

    /// Drop every connection touching `plugin`.
    pub fn disconnect_plugin(&self, registry: &Registry, plugin: PluginId) {
        self.connections
            .lock()
            .retain(|c| c.source.plugin != plugin && c.sink.plugin != plugin);
        self.rebuild_plan(registry);
    }

    pub fn clear(&self, registry: &Registry) {
        self.connections.lock().clear();
        self.rebuild_plan(registry);
    }

    pub fn connections(&self) -> Vec<Connection> {
        self.connections.lock().clone()
    }

    /// Follow a slot-order switch: connections keep tracking the plugins
    /// they were made for, at their new positions.
    pub fn remap_switch(&self, registry: &Registry, a: PluginId, b: PluginId) {
        {
            let mut connections = self.connections.lock();
            for connection in connections.iter_mut() {
                for endpoint in [&mut connection.source, &mut connection.sink] {
                    if endpoint.plugin == a {
                        endpoint.plugin = b;
                    } else if endpoint.plugin == b {
                        endpoint.plugin = a;
                    }
                }
            }
        }
        self.rebuild_plan(registry);
    }

    /// Recompute the topological order and publish. Called after any
    /// connection or registry mutation.
    pub fn rebuild_plan(&self, registry: &Registry) {
        let connections = self.connections.lock().clone();
        let order = topological_order(&registry.ids(), &connections);
        self.plan.store(Arc::new(PatchPlan { order, connections }));
    }

    /// Audio-thread view of the current plan.
    pub fn rt_plan(&self) -> Arc<PatchPlan> {
        self.plan.load_full()
    }
}

fn validate_endpoint(registry: &Registry, endpoint: &PortRef, is_source: bool) -> Result<()> {
    let available = if endpoint.plugin == SYSTEM_PLUGIN {
        // The engine exposes stereo I/O and one event stream each way.
        match endpoint.group {
            PortGroup::Audio => 2,
            PortGroup::Event => 1,
        }
    } else {
        let slot = registry.get(endpoint.plugin)?;
        let counts = slot.port_counts();
        match (endpoint.group, is_source) {
            (PortGroup::Audio, true) => counts.audio_out,
            (PortGroup::Audio, false) => counts.audio_in,
            (PortGroup::Event, true) => counts.midi_out,
            (PortGroup::Event, false) => counts.midi_in,
        }
    };
    if endpoint.index >= available {
        return Err(Error::InvalidArgument(format!(
            "port index {} out of range (plugin {}, {} ports)",
            endpoint.index, endpoint.plugin, available
        )));
    }
    Ok(())
}

/// Whether `from` reaches `to` following existing plugin-to-plugin edges.
fn reaches(connections: &[Connection], from: PluginId, to: PluginId) -> bool {
    if from == to {
        return true;
    }
    let mut stack = vec![from];
    let mut seen = vec![from];
    while let Some(node) = stack.pop() {
        for connection in connections {
            if connection.source.plugin == node {
                let next = connection.sink.plugin;
                if next == SYSTEM_PLUGIN {
                    continue;
                }
                if next == to {
                    return true;
                }
                if !seen.contains(&next) {
                    seen.push(next);
                    stack.push(next);
                }
            }
        }
    }
    false
}

/// Kahn's algorithm over the plugin ids, stable by ascending id.
fn topological_order(ids: &[PluginId], connections: &[Connection]) -> Vec<PluginId> {
    let mut order = Vec::with_capacity(ids.len());
    let mut emitted: Vec<PluginId> = Vec::with_capacity(ids.len());

    let indegree_satisfied = |id: PluginId, emitted: &[PluginId]| {
        connections.iter().all(|c| {
            c.sink.plugin != id
                || c.source.plugin == SYSTEM_PLUGIN
                || emitted.contains(&c.source.plugin)
        })
    };

    while order.len() < ids.len() {
        let mut progressed = false;
        for &id in ids {
            if !emitted.contains(&id) && indegree_satisfied(id, &emitted) {
                order.push(id);
                emitted.push(id);
                progressed = true;
            }
        }
        // Cycles are rejected at connect time; this guards a stale plan.
        if !progressed {
            for &id in ids {
                if !emitted.contains(&id) {
                    order.push(id);
                    emitted.push(id);
                }
            }
        }
    }
    order
}

/// First port index of each group in a client's port list. Clients are
/// built in the fixed order: audio-in, audio-out, event-in, event-out.
fn audio_in_base(_counts: &PortCounts) -> usize {
    0
}

fn audio_out_base(counts: &PortCounts) -> usize {
    counts.audio_in as usize
}

fn event_in_base(counts: &PortCounts) -> usize {
    (counts.audio_in + counts.audio_out) as usize
}

fn event_out_base(counts: &PortCounts) -> usize {
    (counts.audio_in + counts.audio_out + counts.midi_in) as usize
}

/// Pre-allocated state for the patchbay pipeline. Audio thread only.
pub(crate) struct PatchbayGraph {
    sys_out: [Vec<f32>; 2],
    merger: EventMerger,
    slot_events: Vec<EngineEvent>,
    produced: EventVec,
    sys_events_out: Vec<EngineEvent>,
}

impl PatchbayGraph {
    pub fn new(buffer_size: u32) -> Self {
        let frames = buffer_size as usize;
        Self {
            sys_out: [vec![0.0; frames], vec![0.0; frames]],
            merger: EventMerger::new(4 * EVENT_BUFFER_CAPACITY),
            slot_events: Vec::with_capacity(4 * EVENT_BUFFER_CAPACITY),
            produced: EventVec::new(),
            sys_events_out: Vec::with_capacity(EVENT_BUFFER_CAPACITY),
        }
    }

    pub fn set_block_size(&mut self, buffer_size: u32) {
        for channel in self.sys_out.iter_mut() {
            channel.resize(buffer_size as usize, 0.0);
        }
    }

    /// Run one patchbay cycle.
    pub fn process(
        &mut self,
        snapshot: &Snapshot,
        plan: &PatchPlan,
        block: &mut DriverBlock<'_, '_>,
        time: TimeInfo,
        control: &[ControlEventRecord],
        sample_rate: f64,
        deferred: &DeferredQueue,
    ) {
        let frames = (block.frames as usize).min(self.sys_out[0].len());
        let frames_u32 = frames as u32;

        for channel in self.sys_out.iter_mut() {
            channel[..frames].fill(0.0);
        }
        self.sys_events_out.clear();

        for &id in &plan.order {
            let slot = match snapshot.get(id) {
                Some(slot) => slot,
                None => continue,
            };
            if !slot.is_enabled() {
                continue;
            }
            let counts = slot.port_counts();

            // SAFETY: audio thread, slot taken from the active snapshot.
            let client = unsafe { slot.client_rt() };
            client.init_buffers();

            // Sum audio inputs from every connection landing on this slot.
            for connection in &plan.connections {
                if connection.sink.plugin != id || connection.sink.group != PortGroup::Audio {
                    continue;
                }
                let port_index = audio_in_base(&counts) + connection.sink.index as usize;
                let Some(dst) = client.port_mut(port_index).and_then(|p| p.audio_data_mut())
                else {
                    continue;
                };
                if connection.source.plugin == SYSTEM_PLUGIN {
                    if let Some(src) = block.audio_in.get(connection.source.index as usize) {
                        for (d, s) in dst[..frames].iter_mut().zip(&src[..frames]) {
                            *d += *s;
                        }
                    }
                } else if let Some(source_slot) = snapshot.get(connection.source.plugin) {
                    // SAFETY: topological order guarantees the source slot is
                    // not the one we hold mutably (self-edges are rejected).
                    let source_client = unsafe { source_slot.client_rt_ref() };
                    let source_counts = source_slot.port_counts();
                    let source_index =
                        audio_out_base(&source_counts) + connection.source.index as usize;
                    if let Some(src) =
                        source_client.port(source_index).and_then(|p| p.audio_data())
                    {
                        for (d, s) in dst[..frames].iter_mut().zip(&src[..frames]) {
                            *d += *s;
                        }
                    }
                }
            }

            // Merge event inputs: mailbox first, then backend, then upstream.
            self.merger.clear();
            for record in control {
                if record.plugin_id == id {
                    self.merger.add(
                        id,
                        record.event,
                        EventSource::ControlMailbox,
                        frames_u32,
                    );
                }
            }
            for connection in &plan.connections {
                if connection.sink.plugin != id || connection.sink.group != PortGroup::Event {
                    continue;
                }
                if connection.source.plugin == SYSTEM_PLUGIN {
                    for event in block.midi_in {
                        self.merger
                            .add(id, *event, EventSource::BackendMidi, frames_u32);
                    }
                } else if let Some(source_slot) = snapshot.get(connection.source.plugin) {
                    // SAFETY: see the audio branch above.
                    let source_client = unsafe { source_slot.client_rt_ref() };
                    let source_counts = source_slot.port_counts();
                    let source_index =
                        event_out_base(&source_counts) + connection.source.index as usize;
                    if let Some(events) =
                        source_client.port(source_index).and_then(|p| p.event_buffer())
                    {
                        for event in events.events() {
                            self.merger
                                .add(id, *event, EventSource::PluginOutput, frames_u32);
                        }
                    }
                }
            }
            self.slot_events.clear();
            for entry in self.merger.finish() {
                if self.slot_events.len() < self.slot_events.capacity() {
                    self.slot_events.push(entry.event);
                }
            }

            let mut instance = match slot.try_instance() {
                Some(guard) => guard,
                None => continue,
            };

            self.produced.clear();
            let n_in = counts.audio_in as usize;
            let n_out = counts.audio_out as usize;
            let fault = {
                let mut ctx = ProcessContext::new(
                    sample_rate,
                    frames_u32,
                    time,
                    &mut self.produced,
                    EVENT_BUFFER_CAPACITY,
                );

                let ports = client.ports_mut();
                let (in_ports, rest) = ports.split_at_mut(n_in);
                let out_ports = &mut rest[..n_out];

                let ins: SmallVec<[&[f32]; 8]> = in_ports
                    .iter()
                    .filter_map(|p| p.audio_data().map(|d| &d[..frames]))
                    .collect();
                let mut outs: SmallVec<[&mut [f32]; 8]> = out_ports
                    .iter_mut()
                    .filter_map(|p| p.audio_data_mut().map(|d| &mut d[..frames]))
                    .collect();

                for (channel, input) in ins.iter().take(2).enumerate() {
                    slot.peaks.update_channel(channel, input);
                }

                instance.process(&ins, &mut outs, frames_u32, &self.slot_events, &mut ctx);

                let mut fault = false;
                for (channel, output) in outs.iter().take(2).enumerate() {
                    if !slot.peaks.update_channel(2 + channel, output) {
                        fault = true;
                    }
                }
                if fault {
                    for output in outs.iter_mut() {
                        output.fill(0.0);
                    }
                }
                fault
            };
            drop(instance);

            if fault {
                slot.disable();
                deferred.push_rt(
                    DeferredCallback::new(CallbackOpcode::Error, id).string(slot.name_index()),
                );
                continue;
            }

            // Stage produced events on the client's first event output so
            // downstream sinks can read them.
            if counts.midi_out > 0 {
                let out_index = event_out_base(&counts);
                if let Some(buffer) = client.port_mut(out_index).and_then(|p| p.event_buffer_mut())
                {
                    for event in self.produced.iter() {
                        if buffer.push(*event).is_err() {
                            break;
                        }
                    }
                }
            }
        }

        // Final pass: connections landing on the system sink.
        for connection in &plan.connections {
            if connection.sink.plugin != SYSTEM_PLUGIN {
                continue;
            }
            if connection.source.plugin == SYSTEM_PLUGIN {
                // Capture wired straight to playback.
                match connection.sink.group {
                    PortGroup::Audio => {
                        if let (Some(src), Some(dst)) = (
                            block.audio_in.get(connection.source.index as usize),
                            self.sys_out.get_mut(connection.sink.index as usize),
                        ) {
                            for (d, s) in dst[..frames].iter_mut().zip(&src[..frames]) {
                                *d += *s;
                            }
                        }
                    }
                    PortGroup::Event => {
                        for event in block.midi_in {
                            if self.sys_events_out.len() < self.sys_events_out.capacity() {
                                self.sys_events_out.push(*event);
                            }
                        }
                    }
                }
                continue;
            }
            let Some(source_slot) = snapshot.get(connection.source.plugin) else {
                continue;
            };
            // SAFETY: processing is done; only shared reads remain.
            let source_client = unsafe { source_slot.client_rt_ref() };
            let source_counts = source_slot.port_counts();
            match connection.sink.group {
                PortGroup::Audio => {
                    let source_index =
                        audio_out_base(&source_counts) + connection.source.index as usize;
                    let Some(dst) = self.sys_out.get_mut(connection.sink.index as usize) else {
                        continue;
                    };
                    if let Some(src) =
                        source_client.port(source_index).and_then(|p| p.audio_data())
                    {
                        for (d, s) in dst[..frames].iter_mut().zip(&src[..frames]) {
                            *d += *s;
                        }
                    }
                }
                PortGroup::Event => {
                    let source_index =
                        event_out_base(&source_counts) + connection.source.index as usize;
                    if let Some(events) =
                        source_client.port(source_index).and_then(|p| p.event_buffer())
                    {
                        for event in events.events() {
                            if self.sys_events_out.len() < self.sys_events_out.capacity() {
                                self.sys_events_out.push(*event);
                            }
                        }
                    }
                }
            }
        }

        for (channel, output) in block.audio_out.iter_mut().take(2).enumerate() {
            output[..frames].copy_from_slice(&self.sys_out[channel][..frames]);
        }
        for event in &self.sys_events_out {
            block.midi_out.push(*event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::lockfree::Generation;
    use crate::port::{PortDirection, PortKind};
    use attacca_plugin::internal;

    const FRAMES: u32 = 128;

    fn build_client(counts: &PortCounts) -> Client {
        let mut client = Client::new(FRAMES);
        for i in 0..counts.audio_in {
            client
                .add_port(&format!("input_{}", i + 1), PortKind::Audio, PortDirection::Input)
                .unwrap();
        }
        for i in 0..counts.audio_out {
            client
                .add_port(
                    &format!("output_{}", i + 1),
                    PortKind::Audio,
                    PortDirection::Output,
                )
                .unwrap();
        }
        for i in 0..counts.midi_in {
            client
                .add_port(&format!("events-in_{}", i + 1), PortKind::Event, PortDirection::Input)
                .unwrap();
        }
        for i in 0..counts.midi_out {
            client
                .add_port(
                    &format!("events-out_{}", i + 1),
                    PortKind::Event,
                    PortDirection::Output,
                )
                .unwrap();
        }
        client
    }

    fn registry_with(labels: &[&str]) -> Registry {
        let registry = Registry::new(8, Arc::new(Generation::new()));
        for label in labels {
            let instance = internal::instantiate(label).unwrap();
            let client = build_client(&instance.port_counts());
            let slot = registry
                .reserve(label.to_string(), Default::default(), instance, client)
                .unwrap();
            registry.commit(slot.id()).unwrap();
        }
        registry
    }

    fn run(
        registry: &Registry,
        patchbay: &Patchbay,
        graph: &mut PatchbayGraph,
        audio_in: &[Vec<f32>],
        midi_in: &[EngineEvent],
    ) -> (Vec<Vec<f32>>, Vec<EngineEvent>) {
        let mut audio_out = vec![vec![0.0f32; FRAMES as usize]; 2];
        let mut midi_out = Vec::new();
        let deferred = DeferredQueue::new(16);

        let in_slices: Vec<&[f32]> = audio_in.iter().map(|c| c.as_slice()).collect();
        let mut out_slices: Vec<&mut [f32]> =
            audio_out.iter_mut().map(|c| c.as_mut_slice()).collect();
        let mut block = DriverBlock {
            audio_in: &in_slices,
            audio_out: &mut out_slices,
            midi_in,
            midi_out: &mut midi_out,
            frames: FRAMES,
            time: None,
        };

        let snapshot = registry.rt_snapshot();
        let plan = patchbay.rt_plan();
        graph.process(
            &snapshot,
            &plan,
            &mut block,
            TimeInfo::default(),
            &[],
            48000.0,
            &deferred,
        );
        drop(block);
        drop(out_slices);
        (audio_out, midi_out)
    }

    #[test]
    fn test_connect_validates_kinds_and_indices() {
        let registry = registry_with(&["gain"]);
        let patchbay = Patchbay::new();

        // Kind mismatch.
        let err = patchbay
            .connect(
                &registry,
                PortRef::audio(SYSTEM_PLUGIN, 0),
                PortRef::event(0, 0),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        // Gain has no event inputs.
        let err = patchbay
            .connect(
                &registry,
                PortRef::event(SYSTEM_PLUGIN, 0),
                PortRef::event(0, 0),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        // Valid stereo capture into the gain.
        patchbay
            .connect(
                &registry,
                PortRef::audio(SYSTEM_PLUGIN, 0),
                PortRef::audio(0, 0),
            )
            .unwrap();
    }

    #[test]
    fn test_cycles_are_rejected_at_connect() {
        let registry = registry_with(&["audio-pass", "audio-pass"]);
        let patchbay = Patchbay::new();

        patchbay
            .connect(&registry, PortRef::audio(0, 0), PortRef::audio(1, 0))
            .unwrap();
        let err = patchbay
            .connect(&registry, PortRef::audio(1, 0), PortRef::audio(0, 0))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        // Self loops are cycles too.
        let err = patchbay
            .connect(&registry, PortRef::audio(0, 0), PortRef::audio(0, 1))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_topological_order_follows_edges() {
        let registry = registry_with(&["audio-pass", "audio-pass"]);
        let patchbay = Patchbay::new();
        // 1 feeds 0, so 1 must run first.
        patchbay
            .connect(&registry, PortRef::audio(1, 0), PortRef::audio(0, 0))
            .unwrap();
        assert_eq!(patchbay.rt_plan().order, vec![1, 0]);
    }

    #[test]
    fn test_audio_flows_through_chain_to_system() {
        let registry = registry_with(&["gain", "audio-pass"]);
        registry.get(0).unwrap().instance().set_parameter(0, 0.5);

        let patchbay = Patchbay::new();
        for channel in 0..2 {
            patchbay
                .connect(
                    &registry,
                    PortRef::audio(SYSTEM_PLUGIN, channel),
                    PortRef::audio(0, channel),
                )
                .unwrap();
            patchbay
                .connect(
                    &registry,
                    PortRef::audio(0, channel),
                    PortRef::audio(1, channel),
                )
                .unwrap();
            patchbay
                .connect(
                    &registry,
                    PortRef::audio(1, channel),
                    PortRef::audio(SYSTEM_PLUGIN, channel),
                )
                .unwrap();
        }

        let mut graph = PatchbayGraph::new(FRAMES);
        let input = vec![vec![1.0f32; FRAMES as usize]; 2];
        let (output, _) = run(&registry, &patchbay, &mut graph, &input, &[]);
        assert!(output[0].iter().all(|&s| (s - 0.5).abs() < 1e-6));
        assert!(output[1].iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_unconnected_inputs_are_silent() {
        let registry = registry_with(&["gain"]);
        let patchbay = Patchbay::new();
        for channel in 0..2 {
            patchbay
                .connect(
                    &registry,
                    PortRef::audio(0, channel),
                    PortRef::audio(SYSTEM_PLUGIN, channel),
                )
                .unwrap();
        }

        let mut graph = PatchbayGraph::new(FRAMES);
        let input = vec![vec![1.0f32; FRAMES as usize]; 2];
        let (output, _) = run(&registry, &patchbay, &mut graph, &input, &[]);
        // Capture was never wired in, so the gain saw silence.
        assert!(output[0].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_events_route_between_plugins_and_system() {
        let registry = registry_with(&["midi-through"]);
        let patchbay = Patchbay::new();
        patchbay
            .connect(
                &registry,
                PortRef::event(SYSTEM_PLUGIN, 0),
                PortRef::event(0, 0),
            )
            .unwrap();
        patchbay
            .connect(
                &registry,
                PortRef::event(0, 0),
                PortRef::event(SYSTEM_PLUGIN, 0),
            )
            .unwrap();

        let mut graph = PatchbayGraph::new(FRAMES);
        let events = [EngineEvent::midi(3, 0, 0, &[0x90, 64, 90]).unwrap()];
        let (_, midi_out) = run(&registry, &patchbay, &mut graph, &[], &events);
        assert_eq!(midi_out, events.to_vec());
    }

    #[test]
    fn test_remap_switch_follows_plugins() {
        let registry = registry_with(&["gain", "audio-pass"]);
        let patchbay = Patchbay::new();
        let id = patchbay
            .connect(&registry, PortRef::audio(0, 0), PortRef::audio(1, 0))
            .unwrap();

        registry.switch(0, 1).unwrap();
        patchbay.remap_switch(&registry, 0, 1);

        let connections = patchbay.connections();
        let connection = connections.iter().find(|c| c.id == id).unwrap();
        // The gain moved to slot 1, the pass to slot 0.
        assert_eq!(connection.source.plugin, 1);
        assert_eq!(connection.sink.plugin, 0);
    }

    #[test]
    fn test_disconnect_unknown_id_fails() {
        let registry = registry_with(&[]);
        let patchbay = Patchbay::new();
        assert!(patchbay.disconnect(&registry, 42).is_err());
    }
}
