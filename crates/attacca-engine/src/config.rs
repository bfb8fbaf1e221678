//! Engine options and processing modes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Registry capacity in continuous-rack mode.
pub const MAX_RACK_PLUGINS: u32 = 64;
/// Registry capacity in patchbay and client modes.
pub const MAX_PATCHBAY_PLUGINS: u32 = 99;
/// Default cap on exposed parameters per plugin.
pub const MAX_DEFAULT_PARAMETERS: u32 = 200;

/// How plugins are wired to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessMode {
    /// One backend client for the whole engine.
    SingleClient,
    /// One backend client per plugin.
    MultipleClients,
    /// Fixed stereo rack, plugins chained in slot order.
    ContinuousRack,
    /// Arbitrary DAG of connections.
    Patchbay,
    /// Single-plugin bridge process.
    Bridge,
}

/// Who owns the transport clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportMode {
    /// The engine advances its own frame counter.
    Internal,
    /// The backend transport is authoritative; engine mirrors it.
    Jack,
}

/// Where a plugin binary runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryType {
    /// In-process, same architecture as the host.
    Native,
    /// Out-of-process bridge host.
    Bridge,
}

/// Plugin format. Only `Internal` has an in-core loader; the others are
/// satisfied by external format loaders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginType {
    #[default]
    Internal,
    Ladspa,
    Dssi,
    Lv2,
    Vst2,
    Vst3,
}

impl std::fmt::Display for PluginType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PluginType::Internal => "internal",
            PluginType::Ladspa => "LADSPA",
            PluginType::Dssi => "DSSI",
            PluginType::Lv2 => "LV2",
            PluginType::Vst2 => "VST2",
            PluginType::Vst3 => "VST3",
        };
        write!(f, "{name}")
    }
}

/// Option keys accepted by `set_option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKey {
    ProcessMode,
    TransportMode,
    ForceStereo,
    PreferPluginBridges,
    PreferUiBridges,
    UisAlwaysOnTop,
    MaxParameters,
    UiBridgesTimeout,
    AudioNumPeriods,
    AudioBufferSize,
    AudioSampleRate,
    AudioDevice,
    BinaryDir,
    ResourceDir,
}

/// Engine configuration snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOptions {
    pub process_mode: ProcessMode,
    pub transport_mode: TransportMode,

    pub force_stereo: bool,
    pub prefer_plugin_bridges: bool,
    pub prefer_ui_bridges: bool,
    pub uis_always_on_top: bool,

    pub max_parameters: u32,
    /// UI bridge timeout in milliseconds; also bounds control-side waits.
    pub ui_bridges_timeout: u32,

    pub audio_num_periods: u32,
    pub audio_buffer_size: u32,
    pub audio_sample_rate: u32,
    pub audio_device: Option<String>,

    pub binary_dir: Option<PathBuf>,
    pub resource_dir: Option<PathBuf>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            process_mode: ProcessMode::ContinuousRack,
            transport_mode: TransportMode::Internal,
            force_stereo: false,
            prefer_plugin_bridges: false,
            prefer_ui_bridges: true,
            uis_always_on_top: true,
            max_parameters: MAX_DEFAULT_PARAMETERS,
            ui_bridges_timeout: 4000,
            audio_num_periods: 2,
            audio_buffer_size: 512,
            audio_sample_rate: 44100,
            audio_device: None,
            binary_dir: None,
            resource_dir: None,
        }
    }
}

impl EngineOptions {
    /// Registry capacity implied by the process mode.
    pub fn max_plugins(&self) -> u32 {
        match self.process_mode {
            ProcessMode::ContinuousRack => MAX_RACK_PLUGINS,
            ProcessMode::Bridge => 1,
            _ => MAX_PATCHBAY_PLUGINS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.audio_sample_rate < 8000 || self.audio_sample_rate > 384_000 {
            return Err(Error::InvalidArgument(format!(
                "sample rate {} out of range (8000-384000 Hz)",
                self.audio_sample_rate
            )));
        }
        if self.audio_buffer_size == 0 || !self.audio_buffer_size.is_power_of_two() {
            return Err(Error::InvalidArgument(format!(
                "buffer size {} is not a power of two",
                self.audio_buffer_size
            )));
        }
        if self.max_parameters == 0 {
            return Err(Error::InvalidArgument("max_parameters is zero".into()));
        }
        Ok(())
    }

    /// Apply one `(key, int, str)` option triple.
    pub fn set(&mut self, key: OptionKey, value: i64, text: Option<&str>) -> Result<()> {
        match key {
            OptionKey::ProcessMode => {
                self.process_mode = match value {
                    0 => ProcessMode::SingleClient,
                    1 => ProcessMode::MultipleClients,
                    2 => ProcessMode::ContinuousRack,
                    3 => ProcessMode::Patchbay,
                    4 => ProcessMode::Bridge,
                    other => {
                        return Err(Error::InvalidArgument(format!(
                            "unknown process mode {other}"
                        )))
                    }
                };
            }
            OptionKey::TransportMode => {
                self.transport_mode = match value {
                    0 => TransportMode::Internal,
                    1 => TransportMode::Jack,
                    other => {
                        return Err(Error::InvalidArgument(format!(
                            "unknown transport mode {other}"
                        )))
                    }
                };
            }
            OptionKey::ForceStereo => self.force_stereo = value != 0,
            OptionKey::PreferPluginBridges => self.prefer_plugin_bridges = value != 0,
            OptionKey::PreferUiBridges => self.prefer_ui_bridges = value != 0,
            OptionKey::UisAlwaysOnTop => self.uis_always_on_top = value != 0,
            OptionKey::MaxParameters => {
                self.max_parameters = u32::try_from(value)
                    .map_err(|_| Error::InvalidArgument(format!("max parameters {value}")))?;
            }
            OptionKey::UiBridgesTimeout => {
                self.ui_bridges_timeout = u32::try_from(value)
                    .map_err(|_| Error::InvalidArgument(format!("timeout {value}")))?;
            }
            OptionKey::AudioNumPeriods => {
                if !(2..=3).contains(&value) {
                    return Err(Error::InvalidArgument(format!("audio periods {value}")));
                }
                self.audio_num_periods = value as u32;
            }
            OptionKey::AudioBufferSize => {
                self.audio_buffer_size = u32::try_from(value)
                    .map_err(|_| Error::InvalidArgument(format!("buffer size {value}")))?;
            }
            OptionKey::AudioSampleRate => {
                self.audio_sample_rate = u32::try_from(value)
                    .map_err(|_| Error::InvalidArgument(format!("sample rate {value}")))?;
            }
            OptionKey::AudioDevice => {
                self.audio_device = text.map(str::to_owned);
            }
            OptionKey::BinaryDir => {
                self.binary_dir = text.map(PathBuf::from);
            }
            OptionKey::ResourceDir => {
                self.resource_dir = text.map(PathBuf::from);
            }
        }
        Ok(())
    }
}
