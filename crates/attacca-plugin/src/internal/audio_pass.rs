//! Stereo audio pass-through plugin.

use crate::event::EngineEvent;
use crate::instance::{PluginInstance, ProcessContext};
use crate::metadata::{ParameterData, ParameterInfo, ParameterRanges, PortCounts};
use crate::{PluginError, Result};

/// Copies input to output unchanged. Useful for routing and latency tests.
pub struct AudioPassPlugin;

impl AudioPassPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AudioPassPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginInstance for AudioPassPlugin {
    fn label(&self) -> &str {
        "audio-pass"
    }

    fn name(&self) -> &str {
        "Audio Pass"
    }

    fn maker(&self) -> &str {
        "attacca"
    }

    fn port_counts(&self) -> PortCounts {
        PortCounts::stereo()
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
        audio_in: &[&[f32]],
        audio_out: &mut [&mut [f32]],
        frames: u32,
        _events: &[EngineEvent],
        _ctx: &mut ProcessContext<'_>,
    ) {
        let frames = frames as usize;
        for (channel, out) in audio_out.iter_mut().enumerate() {
            match audio_in.get(channel) {
                Some(input) => out[..frames].copy_from_slice(&input[..frames]),
                None => out[..frames].fill(0.0),
            }
        }
    }
}
