//! Host callback fan-out.
//!
//! The engine reports everything user-visible through a single registered
//! sink; errors never turn into log spam on the audio path.

use parking_lot::Mutex;
use std::path::PathBuf;

/// What a callback notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOpcode {
    PluginAdded,
    PluginRemoved,
    PluginRenamed,
    ParameterValueChanged,
    DefaultValueChanged,
    ProgramChanged,
    MidiProgramChanged,
    NoteOn,
    NoteOff,
    UiStateChanged,
    BufferSizeChanged,
    SampleRateChanged,
    EngineStarted,
    EngineStopped,
    Error,
    Info,
    Quit,
}

/// Id passed for notifications that concern no particular plugin.
pub const NO_PLUGIN_ID: u32 = u32::MAX;

/// Host-supplied notification sink.
///
/// Payload is `(opcode, plugin_id, i1, i2, f3, str)`; unused fields are zero
/// or empty.
pub type CallbackSink = Box<dyn Fn(CallbackOpcode, u32, i32, i32, f32, &str) + Send + Sync>;

/// File-dialog requests the host may serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCallbackOpcode {
    Debug = 0,
    Open = 1,
    Save = 2,
}

/// Blocking file-dialog callback: `(opcode, is_dir, title, filter)` to an
/// optional chosen path (`None` means cancelled).
pub type FileCallback =
    Box<dyn Fn(FileCallbackOpcode, bool, &str, &str) -> Option<PathBuf> + Send + Sync>;

/// Registered sinks, shared by the control paths of the engine.
#[derive(Default)]
pub struct CallbackHub {
    sink: Mutex<Option<CallbackSink>>,
    file: Mutex<Option<FileCallback>>,
}

impl CallbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sink(&self, sink: Option<CallbackSink>) {
        *self.sink.lock() = sink;
    }

    pub fn set_file_callback(&self, callback: Option<FileCallback>) {
        *self.file.lock() = callback;
    }

    /// Notify the sink, if one is registered. Control thread only.
    pub fn notify(
        &self,
        opcode: CallbackOpcode,
        plugin_id: u32,
        i1: i32,
        i2: i32,
        f3: f32,
        text: &str,
    ) {
        if let Some(sink) = self.sink.lock().as_ref() {
            sink(opcode, plugin_id, i1, i2, f3, text);
        }
    }

    /// Run the blocking file dialog. Returns `None` when no callback is
    /// registered or the user cancelled.
    pub fn request_file(
        &self,
        opcode: FileCallbackOpcode,
        is_dir: bool,
        title: &str,
        filter: &str,
    ) -> Option<PathBuf> {
        let guard = self.file.lock();
        let callback = guard.as_ref()?;
        callback(opcode, is_dir, title, filter)
    }
}
