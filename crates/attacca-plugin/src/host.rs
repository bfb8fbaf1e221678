//! Host services exposed back to plugin instances and their UIs.

use crate::time::TimeInfo;
use atomic_float::AtomicF64;
use crossbeam::atomic::AtomicCell;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Notifications a plugin UI sends back to the host.
///
/// The engine installs a listener per plugin; calls arrive on the control
/// thread (or a UI thread) and are fanned out as host callbacks.
pub trait UiListener: Send + Sync {
    fn parameter_changed(&self, index: u32, value: f32);
    fn midi_program_changed(&self, index: u32);
    fn custom_data_changed(&self, key: &str, value: &str);
    fn ui_closed(&self);
}

/// Shared host state a plugin may query at any time.
///
/// MIDI output is deliberately absent here: event writes go through
/// [`crate::ProcessContext::write_midi_event`], which only exists during a
/// `process` call, so writing outside processing cannot be expressed.
pub struct HostServices {
    sample_rate: AtomicF64,
    buffer_size: AtomicU32,
    time: AtomicCell<TimeInfo>,
    ui_listener: Mutex<Option<Arc<dyn UiListener>>>,
}

impl HostServices {
    pub fn new(sample_rate: f64, buffer_size: u32) -> Self {
        Self {
            sample_rate: AtomicF64::new(sample_rate),
            buffer_size: AtomicU32::new(buffer_size),
            time: AtomicCell::new(TimeInfo::default()),
            ui_listener: Mutex::new(None),
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate.load(Ordering::Acquire)
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size.load(Ordering::Acquire)
    }

    /// Transport snapshot of the most recent audio block.
    pub fn time_info(&self) -> TimeInfo {
        self.time.load()
    }

    pub fn set_sample_rate(&self, rate: f64) {
        self.sample_rate.store(rate, Ordering::Release);
    }

    pub fn set_buffer_size(&self, frames: u32) {
        self.buffer_size.store(frames, Ordering::Release);
    }

    /// Publish the block's transport snapshot. Called by the engine at the
    /// top of each cycle.
    pub fn publish_time_info(&self, info: TimeInfo) {
        self.time.store(info);
    }

    pub fn set_ui_listener(&self, listener: Option<Arc<dyn UiListener>>) {
        *self.ui_listener.lock() = listener;
    }

    fn listener(&self) -> Option<Arc<dyn UiListener>> {
        self.ui_listener.lock().clone()
    }

    pub fn ui_parameter_changed(&self, index: u32, value: f32) {
        if let Some(listener) = self.listener() {
            listener.parameter_changed(index, value);
        }
    }

    pub fn ui_midi_program_changed(&self, index: u32) {
        if let Some(listener) = self.listener() {
            listener.midi_program_changed(index);
        }
    }

    pub fn ui_custom_data_changed(&self, key: &str, value: &str) {
        if let Some(listener) = self.listener() {
            listener.custom_data_changed(key, value);
        }
    }

    pub fn ui_closed(&self) {
        if let Some(listener) = self.listener() {
            listener.ui_closed();
        }
    }
}
