//! Parameter, program and port metadata exposed by plugin instances.

use serde::{Deserialize, Serialize};

/// Hints describing a whole plugin.
pub mod plugin_hints {
    pub const HAS_CUSTOM_UI: u32 = 1 << 0;
    pub const USES_CHUNKS: u32 = 1 << 1;
    pub const IS_SYNTH: u32 = 1 << 2;
    pub const CAN_PROGRAMS: u32 = 1 << 3;
}

/// Hints describing a single parameter.
pub mod param_hints {
    pub const ENABLED: u32 = 1 << 0;
    pub const AUTOMATABLE: u32 = 1 << 1;
    pub const BOOLEAN: u32 = 1 << 2;
    pub const INTEGER: u32 = 1 << 3;
    pub const LOGARITHMIC: u32 = 1 << 4;
    pub const READ_ONLY: u32 = 1 << 5;
}

/// A labelled point on a parameter's value scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalePoint {
    pub label: String,
    pub value: f32,
}

/// Static description of one parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: String,
    pub symbol: String,
    pub unit: String,
    pub scale_points: Vec<ScalePoint>,
}

/// Runtime data for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterData {
    pub hints: u32,
    /// Mapped MIDI CC, or -1 when unmapped.
    pub midi_cc: i16,
    /// MIDI channel the CC mapping listens on, 0..=15.
    pub midi_channel: u8,
}

impl Default for ParameterData {
    fn default() -> Self {
        Self {
            hints: param_hints::ENABLED | param_hints::AUTOMATABLE,
            midi_cc: -1,
            midi_channel: 0,
        }
    }
}

/// Value range of one parameter, in real (denormalised) units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRanges {
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub step: f32,
    pub step_small: f32,
    pub step_large: f32,
}

impl Default for ParameterRanges {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            default: 0.0,
            step: 0.01,
            step_small: 0.0001,
            step_large: 0.1,
        }
    }
}

impl ParameterRanges {
    /// Clamp `value` into the declared range.
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// Map a normalised 0..=1 value into the range.
    pub fn denormalise(&self, normalised: f32) -> f32 {
        self.min + normalised.clamp(0.0, 1.0) * (self.max - self.min)
    }

    /// Map a real value into 0..=1.
    pub fn normalise(&self, value: f32) -> f32 {
        if self.max <= self.min {
            return 0.0;
        }
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

/// One entry of a plugin's MIDI program list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MidiProgramInfo {
    pub bank: u32,
    pub program: u32,
    pub label: String,
}

/// How many ports of each kind a plugin exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortCounts {
    pub audio_in: u32,
    pub audio_out: u32,
    pub midi_in: u32,
    pub midi_out: u32,
    pub param_in: u32,
    pub param_out: u32,
}

impl PortCounts {
    pub fn stereo() -> Self {
        Self {
            audio_in: 2,
            audio_out: 2,
            ..Default::default()
        }
    }
}

/// A key/value pair of plugin-defined state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomData {
    pub key: String,
    pub value: String,
}
