//! Graph dispatch: the per-block processing pipelines.
//!
//! Two topologies exist. The rack chains plugins in slot-id order through a
//! fixed stereo pair; the patchbay evaluates an arbitrary DAG of
//! connections. Both share the event-bus merge rule: events are ordered by
//! frame time, ties broken by source priority, then insertion order.

pub(crate) mod patchbay;
pub(crate) mod rack;

pub use patchbay::{Connection, ConnectionId, PortGroup, PortRef, SYSTEM_PLUGIN};

use attacca_plugin::EngineEvent;

/// Where an event on the internal bus came from. Lower wins ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum EventSource {
    ControlMailbox = 0,
    BackendMidi = 1,
    PluginOutput = 2,
}

/// Target for "deliver to every listening slot".
pub(crate) const BROADCAST: u32 = u32::MAX;

/// One merged bus entry: an event plus its addressing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BusEvent {
    pub target: u32,
    pub event: EngineEvent,
    priority: u8,
    seq: u32,
}

/// Pre-allocated merge buffer implementing the bus ordering rule.
pub(crate) struct EventMerger {
    entries: Vec<BusEvent>,
    dropped: u32,
    seq: u32,
}

impl EventMerger {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            dropped: 0,
            seq: 0,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dropped = 0;
        self.seq = 0;
    }

    /// Add an event, clamping its time into the block. Full buffers drop
    /// the event and count it; the audio thread never grows the storage.
    pub fn add(&mut self, target: u32, mut event: EngineEvent, source: EventSource, frames: u32) {
        if self.entries.len() >= self.entries.capacity() {
            self.dropped += 1;
            return;
        }
        if event.time >= frames {
            event.time = frames.saturating_sub(1);
        }
        let seq = self.seq;
        self.seq += 1;
        self.entries.push(BusEvent {
            target,
            event,
            priority: source as u8,
            seq,
        });
    }

    /// Sort into bus order and expose the merged view.
    pub fn finish(&mut self) -> &[BusEvent] {
        self.entries
            .sort_unstable_by_key(|e| (e.event.time, e.priority, e.seq));
        &self.entries
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_orders_by_time_then_source() {
        let mut merger = EventMerger::new(16);
        merger.add(
            BROADCAST,
            EngineEvent::all_notes_off(10, 0),
            EventSource::BackendMidi,
            256,
        );
        merger.add(
            BROADCAST,
            EngineEvent::all_notes_off(10, 1),
            EventSource::ControlMailbox,
            256,
        );
        merger.add(
            BROADCAST,
            EngineEvent::all_notes_off(0, 2),
            EventSource::BackendMidi,
            256,
        );

        let merged = merger.finish();
        let channels: Vec<u8> = merged.iter().map(|e| e.event.channel).collect();
        // Frame 0 first; at frame 10 the mailbox outranks backend MIDI.
        assert_eq!(channels, vec![2, 1, 0]);
    }

    #[test]
    fn test_merge_is_stable_within_source() {
        let mut merger = EventMerger::new(16);
        for channel in 0..4u8 {
            merger.add(
                BROADCAST,
                EngineEvent::all_notes_off(5, channel),
                EventSource::ControlMailbox,
                64,
            );
        }
        let channels: Vec<u8> = merger.finish().iter().map(|e| e.event.channel).collect();
        assert_eq!(channels, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_merge_clamps_time_into_block() {
        let mut merger = EventMerger::new(4);
        merger.add(
            BROADCAST,
            EngineEvent::all_notes_off(512, 0),
            EventSource::BackendMidi,
            256,
        );
        assert_eq!(merger.finish()[0].event.time, 255);
    }

    #[test]
    fn test_merge_drops_past_capacity() {
        let mut merger = EventMerger::new(2);
        for _ in 0..3 {
            merger.add(
                BROADCAST,
                EngineEvent::all_notes_off(0, 0),
                EventSource::BackendMidi,
                64,
            );
        }
        assert_eq!(merger.finish().len(), 2);
        assert_eq!(merger.dropped(), 1);
    }
}
