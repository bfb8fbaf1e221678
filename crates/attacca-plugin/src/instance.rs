//! Plugin instance trait and processing context.
//!
//! This module defines the uniform façade the host engine consumes, whatever
//! format a loader produced the instance from. The registry stores these as
//! boxed trait objects; the real-time path only ever calls [`PluginInstance::process`].

use crate::event::{EngineEvent, EventVec};
use crate::metadata::{
    CustomData, MidiProgramInfo, ParameterData, ParameterInfo, ParameterRanges, PortCounts,
};
use crate::time::TimeInfo;
use crate::{PluginError, Result};

/// Per-block context handed to [`PluginInstance::process`].
///
/// Event output goes through [`ProcessContext::write_midi_event`]; because the
/// context only exists for the duration of one `process` call, events cannot
/// be written outside of processing.
pub struct ProcessContext<'a> {
    pub sample_rate: f64,
    pub buffer_size: u32,
    pub time: TimeInfo,
    events_out: &'a mut EventVec,
    events_dropped: u32,
    capacity: usize,
}

impl<'a> ProcessContext<'a> {
    pub fn new(
        sample_rate: f64,
        buffer_size: u32,
        time: TimeInfo,
        events_out: &'a mut EventVec,
        capacity: usize,
    ) -> Self {
        Self {
            sample_rate,
            buffer_size,
            time,
            events_out,
            events_dropped: 0,
            capacity,
        }
    }

    /// Queue an event into the host's output stream for this block.
    ///
    /// Returns `false` when the output buffer is full; the event is dropped
    /// and the host reports the overrun after the block.
    pub fn write_midi_event(&mut self, event: EngineEvent) -> bool {
        if self.events_out.len() >= self.capacity {
            self.events_dropped += 1;
            return false;
        }
        self.events_out.push(event);
        true
    }

    /// Number of events dropped because the output buffer was full.
    pub fn events_dropped(&self) -> u32 {
        self.events_dropped
    }
}

/// Uniform contract every loaded plugin satisfies.
///
/// Split in three call classes:
/// - introspection and state: control thread only;
/// - `activate`/`deactivate`/`prepare_for_save`/UI: control thread only,
///   never concurrent with `process`;
/// - `process`: audio thread only. It must not allocate, block or take locks,
///   must consume all events handed to it, and must tolerate an empty event
///   slice.
pub trait PluginInstance: Send {
    // --- introspection -----------------------------------------------------

    /// The label this instance was created from (unique per loader).
    fn label(&self) -> &str;

    /// Human-readable plugin name.
    fn name(&self) -> &str;

    fn maker(&self) -> &str {
        ""
    }

    /// Plugin-level hint bits, see [`crate::metadata::plugin_hints`].
    fn hints(&self) -> u32 {
        0
    }

    fn port_counts(&self) -> PortCounts;

    /// Processing latency in samples.
    fn latency(&self) -> u32 {
        0
    }

    fn parameter_count(&self) -> u32;

    fn parameter_info(&self, index: u32) -> Result<ParameterInfo>;

    fn parameter_data(&self, index: u32) -> Result<ParameterData>;

    fn parameter_ranges(&self, index: u32) -> Result<ParameterRanges>;

    fn program_count(&self) -> u32 {
        0
    }

    fn program_name(&self, index: u32) -> Result<String> {
        let _ = index;
        Err(PluginError::Unsupported("programs"))
    }

    fn midi_program_count(&self) -> u32 {
        0
    }

    fn midi_program_info(&self, index: u32) -> Result<MidiProgramInfo> {
        let _ = index;
        Err(PluginError::Unsupported("midi programs"))
    }

    // --- state -------------------------------------------------------------

    /// Current real value of a parameter.
    fn get_parameter(&self, index: u32) -> f32;

    /// Set a parameter to a real value. The host clamps to the declared
    /// range before calling.
    fn set_parameter(&mut self, index: u32, value: f32);

    fn set_program(&mut self, index: u32) -> Result<()> {
        let _ = index;
        Err(PluginError::Unsupported("programs"))
    }

    fn current_program(&self) -> Option<u32> {
        None
    }

    fn set_midi_program(&mut self, index: u32) -> Result<()> {
        let _ = index;
        Err(PluginError::Unsupported("midi programs"))
    }

    fn current_midi_program(&self) -> Option<u32> {
        None
    }

    fn set_custom_data(&mut self, key: &str, value: &str) -> Result<()> {
        let _ = (key, value);
        Err(PluginError::Unsupported("custom data"))
    }

    fn custom_data(&self) -> Vec<CustomData> {
        Vec::new()
    }

    /// Opaque state blob, only meaningful when
    /// [`crate::metadata::plugin_hints::USES_CHUNKS`] is set.
    fn chunk_data(&mut self) -> Result<Vec<u8>> {
        Err(PluginError::Unsupported("chunk data"))
    }

    fn set_chunk_data(&mut self, data: &[u8]) -> Result<()> {
        let _ = data;
        Err(PluginError::Unsupported("chunk data"))
    }

    // --- control -----------------------------------------------------------

    fn activate(&mut self) {}

    fn deactivate(&mut self) {}

    /// Called before the host snapshots state into a project.
    fn prepare_for_save(&mut self) {}

    fn show_custom_ui(&mut self, show: bool) -> Result<()> {
        let _ = show;
        Err(PluginError::Unsupported("custom UI"))
    }

    fn ui_idle(&mut self) {}

    // --- real-time ---------------------------------------------------------

    /// Process one block of audio and events.
    ///
    /// `audio_in`/`audio_out` each hold one slice of `frames` samples per
    /// declared audio port. `events` is sorted by frame time and filtered to
    /// this instance.
    fn process(
        &mut self,
        audio_in: &[&[f32]],
        audio_out: &mut [&mut [f32]],
        frames: u32,
        events: &[EngineEvent],
        ctx: &mut ProcessContext<'_>,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventVec;

    #[test]
    fn test_process_context_caps_event_output() {
        let mut out = EventVec::new();
        let mut ctx = ProcessContext::new(48000.0, 64, TimeInfo::default(), &mut out, 2);

        assert!(ctx.write_midi_event(EngineEvent::all_notes_off(0, 0)));
        assert!(ctx.write_midi_event(EngineEvent::all_notes_off(1, 0)));
        assert!(!ctx.write_midi_event(EngineEvent::all_notes_off(2, 0)));
        assert_eq!(ctx.events_dropped(), 1);
        assert_eq!(out.len(), 2);
    }
}
