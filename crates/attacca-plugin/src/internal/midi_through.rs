//! MIDI pass-through plugin.

use crate::event::EngineEvent;
use crate::instance::{PluginInstance, ProcessContext};
use crate::metadata::{ParameterData, ParameterInfo, ParameterRanges, PortCounts};
use crate::{PluginError, Result};

/// Forwards every incoming MIDI event unchanged within the same block.
pub struct MidiThroughPlugin;

impl MidiThroughPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MidiThroughPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginInstance for MidiThroughPlugin {
    fn label(&self) -> &str {
        "midi-through"
    }

    fn name(&self) -> &str {
        "MIDI Through"
    }

    fn maker(&self) -> &str {
        "attacca"
    }

    fn port_counts(&self) -> PortCounts {
        PortCounts {
            midi_in: 1,
            midi_out: 1,
            ..Default::default()
        }
    }

    fn parameter_count(&self) -> u32 {
        0
    }

    fn parameter_info(&self, index: u32) -> Result<ParameterInfo> {
        Err(PluginError::BadParameterIndex(index))
    }

    fn parameter_data(&self, index: u32) -> Result<ParameterData> {
        Err(PluginError::BadParameterIndex(index))
    }

    fn parameter_ranges(&self, index: u32) -> Result<ParameterRanges> {
        Err(PluginError::BadParameterIndex(index))
    }

    fn get_parameter(&self, _index: u32) -> f32 {
        0.0
    }

    fn set_parameter(&mut self, _index: u32, _value: f32) {}

    fn process(
        &mut self,
        _audio_in: &[&[f32]],
        _audio_out: &mut [&mut [f32]],
        _frames: u32,
        events: &[EngineEvent],
        ctx: &mut ProcessContext<'_>,
    ) {
        for event in events {
            if event.is_midi() {
                ctx.write_midi_event(*event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventVec;
    use crate::time::TimeInfo;

    #[test]
    fn test_events_pass_through_unchanged() {
        let mut plugin = MidiThroughPlugin::new();
        let events = [
            EngineEvent::midi(0, 0, 0, &[0x90, 60, 100]).unwrap(),
            EngineEvent::midi(128, 0, 0, &[0x80, 60, 0]).unwrap(),
        ];

        let mut produced = EventVec::new();
        let mut ctx =
            ProcessContext::new(48000.0, 256, TimeInfo::default(), &mut produced, 512);
        plugin.process(&[], &mut [], 256, &events, &mut ctx);

        assert_eq!(produced.as_slice(), &events);
    }

    #[test]
    fn test_control_events_are_not_forwarded() {
        let mut plugin = MidiThroughPlugin::new();
        let events = [EngineEvent::parameter(0, 0, 1, 0.5)];

        let mut produced = EventVec::new();
        let mut ctx =
            ProcessContext::new(48000.0, 256, TimeInfo::default(), &mut produced, 512);
        plugin.process(&[], &mut [], 256, &events, &mut ctx);

        assert!(produced.is_empty());
    }
}
