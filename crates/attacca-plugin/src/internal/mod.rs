//! Internal plugins: small in-tree instances loaded by label.
//!
//! These stand in for out-of-process format loaders, which live outside the
//! engine core. They are real plugins as far as the host is concerned and
//! exercise the whole instance contract.

mod audio_pass;
mod gain;
mod midi_through;

pub use audio_pass::AudioPassPlugin;
pub use gain::GainPlugin;
pub use midi_through::MidiThroughPlugin;

use crate::{PluginError, PluginInstance, Result};

/// Labels of every available internal plugin.
pub fn labels() -> &'static [&'static str] {
    &["audio-pass", "gain", "midi-through"]
}

/// Create an internal plugin instance by label.
pub fn instantiate(label: &str) -> Result<Box<dyn PluginInstance>> {
    match label {
        "audio-pass" => Ok(Box::new(AudioPassPlugin::new())),
        "gain" => Ok(Box::new(GainPlugin::new())),
        "midi-through" => Ok(Box::new(MidiThroughPlugin::new())),
        other => Err(PluginError::UnknownLabel(other.to_string())),
    }
}
