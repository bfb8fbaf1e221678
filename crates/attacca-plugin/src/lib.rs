//! Plugin instance contract for the Attacca host engine.
//!
//! This crate defines the uniform façade the engine consumes for every loaded
//! plugin ([`PluginInstance`]), the event and time types that cross the
//! host/plugin boundary, the host services plugins may call back into, and a
//! small set of internal plugins loaded by label.
//!
//! Format loaders (LV2, VST, CLAP, bridges) live outside the engine core;
//! whatever they produce must satisfy [`PluginInstance`].

pub mod error;
pub use error::{LoadStage, PluginError, Result};

pub mod event;
pub use event::{
    ControlEvent, ControlEventKind, EngineEvent, EventPayload, EventVec, MidiData, MAX_MIDI_BYTES,
};

pub mod time;
pub use time::{TimeInfo, TimeInfoBbt};

pub mod metadata;
pub use metadata::{
    param_hints, plugin_hints, CustomData, MidiProgramInfo, ParameterData, ParameterInfo,
    ParameterRanges, PortCounts, ScalePoint,
};

mod instance;
pub use instance::{PluginInstance, ProcessContext};

mod host;
pub use host::{HostServices, UiListener};

pub mod internal;
