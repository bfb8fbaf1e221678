//! Stereo gain plugin.

use crate::event::{ControlEventKind, EngineEvent, EventPayload};
use crate::instance::{PluginInstance, ProcessContext};
use crate::metadata::{
    param_hints, ParameterData, ParameterInfo, ParameterRanges, PortCounts,
};
use crate::{PluginError, Result};

const PARAM_VOLUME: u32 = 0;
const PARAM_APPLY_LEFT: u32 = 1;
const PARAM_APPLY_RIGHT: u32 = 2;
const PARAM_COUNT: u32 = 3;

/// Applies a volume factor to a stereo pair, per-channel switchable.
pub struct GainPlugin {
    volume: f32,
    apply_left: bool,
    apply_right: bool,
}

impl GainPlugin {
    pub fn new() -> Self {
        Self {
            volume: 1.0,
            apply_left: true,
            apply_right: true,
        }
    }

    fn ranges_for(index: u32) -> ParameterRanges {
        match index {
            PARAM_VOLUME => ParameterRanges {
                min: 0.0,
                max: 4.0,
                default: 1.0,
                step: 0.01,
                step_small: 0.0001,
                step_large: 0.1,
            },
            _ => ParameterRanges {
                min: 0.0,
                max: 1.0,
                default: 1.0,
                step: 1.0,
                step_small: 1.0,
                step_large: 1.0,
            },
        }
    }

    fn apply_event(&mut self, param: u16, normalised: f32) {
        let index = u32::from(param);
        if index < PARAM_COUNT {
            let value = Self::ranges_for(index).denormalise(normalised);
            self.set_parameter(index, value);
        }
    }
}

impl Default for GainPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginInstance for GainPlugin {
    fn label(&self) -> &str {
        "gain"
    }

    fn name(&self) -> &str {
        "Gain"
    }

    fn maker(&self) -> &str {
        "attacca"
    }

    fn port_counts(&self) -> PortCounts {
        PortCounts {
            param_in: PARAM_COUNT,
            ..PortCounts::stereo()
        }
    }

    fn parameter_count(&self) -> u32 {
        PARAM_COUNT
    }

    fn parameter_info(&self, index: u32) -> Result<ParameterInfo> {
        let (name, symbol) = match index {
            PARAM_VOLUME => ("Volume", "volume"),
            PARAM_APPLY_LEFT => ("Apply Left", "apply_l"),
            PARAM_APPLY_RIGHT => ("Apply Right", "apply_r"),
            _ => return Err(PluginError::BadParameterIndex(index)),
        };
        Ok(ParameterInfo {
            name: name.to_string(),
            symbol: symbol.to_string(),
            unit: String::new(),
            scale_points: Vec::new(),
        })
    }

    fn parameter_data(&self, index: u32) -> Result<ParameterData> {
        match index {
            PARAM_VOLUME => Ok(ParameterData::default()),
            PARAM_APPLY_LEFT | PARAM_APPLY_RIGHT => Ok(ParameterData {
                hints: param_hints::ENABLED | param_hints::AUTOMATABLE | param_hints::BOOLEAN,
                ..Default::default()
            }),
            _ => Err(PluginError::BadParameterIndex(index)),
        }
    }

    fn parameter_ranges(&self, index: u32) -> Result<ParameterRanges> {
        if index >= PARAM_COUNT {
            return Err(PluginError::BadParameterIndex(index));
        }
        Ok(Self::ranges_for(index))
    }

    fn get_parameter(&self, index: u32) -> f32 {
        match index {
            PARAM_VOLUME => self.volume,
            PARAM_APPLY_LEFT => {
                if self.apply_left {
                    1.0
                } else {
                    0.0
                }
            }
            PARAM_APPLY_RIGHT => {
                if self.apply_right {
                    1.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    fn set_parameter(&mut self, index: u32, value: f32) {
        match index {
            PARAM_VOLUME => self.volume = Self::ranges_for(index).clamp(value),
            PARAM_APPLY_LEFT => self.apply_left = value >= 0.5,
            PARAM_APPLY_RIGHT => self.apply_right = value >= 0.5,
            _ => {}
        }
    }

    fn process(
        &mut self,
        audio_in: &[&[f32]],
        audio_out: &mut [&mut [f32]],
        frames: u32,
        events: &[EngineEvent],
        _ctx: &mut ProcessContext<'_>,
    ) {
        for event in events {
            if let EventPayload::Control(ctrl) = &event.payload {
                if ctrl.kind == ControlEventKind::Parameter {
                    self.apply_event(ctrl.param, ctrl.value);
                }
            }
        }

        let frames = frames as usize;
        for (channel, out) in audio_out.iter_mut().enumerate() {
            let apply = match channel {
                0 => self.apply_left,
                _ => self.apply_right,
            };
            let factor = if apply { self.volume } else { 1.0 };
            match audio_in.get(channel) {
                Some(input) => {
                    for (dst, src) in out[..frames].iter_mut().zip(&input[..frames]) {
                        *dst = src * factor;
                    }
                }
                None => out[..frames].fill(0.0),
            }
        }
    }
}
