//! Audio driver abstraction.
//!
//! The engine consumes backends through [`AudioDriver`]; real backends
//! (JACK, native APIs) live outside the core. The in-tree [`NullDriver`]
//! runs cycles on caller demand, which is what tests and offline tooling
//! use.

use crate::error::{Error, Result};
use crate::lockfree::AtomicFlag;
use attacca_plugin::{EngineEvent, TimeInfo};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::Arc;

/// Audio/MIDI data for one backend cycle.
///
/// `'a` bounds the audio sample data itself; `'b` bounds the (possibly
/// short-lived) container holding the per-channel slice references, so
/// callers can build that container in a small stack buffer without
/// tripping the drop-checker on a container type with its own `Drop` impl.
pub struct DriverBlock<'a, 'b> {
    pub audio_in: &'b [&'a [f32]],
    pub audio_out: &'b mut [&'a mut [f32]],
    pub midi_in: &'a [EngineEvent],
    /// Events the engine emits towards the backend this cycle.
    pub midi_out: &'a mut Vec<EngineEvent>,
    pub frames: u32,
    /// Backend transport snapshot, when the backend owns a transport.
    pub time: Option<TimeInfo>,
}

/// Receives process callbacks from a driver. Implemented by the engine.
pub trait ProcessSink: Send + Sync {
    /// Called on the driver's audio thread once per cycle.
    fn process_block(&self, block: &mut DriverBlock<'_, '_>);

    /// Called on the control thread when the backend re-negotiates.
    fn buffer_size_changed(&self, frames: u32) {
        let _ = frames;
    }

    fn sample_rate_changed(&self, rate: f64) {
        let _ = rate;
    }
}

/// Capabilities of one backend device.
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub sample_rates: Vec<f64>,
    pub buffer_sizes: Vec<u32>,
}

/// What a driver settled on at init time.
#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    pub sample_rate: f64,
    pub buffer_size: u32,
}

/// Contract the engine consumes from an audio backend.
pub trait AudioDriver: Send {
    fn name(&self) -> &str;

    fn device_names(&self) -> Vec<String>;

    fn device_info(&self, device: &str) -> Option<DeviceInfo>;

    /// Bring the backend up and hand it the process sink. Blocking,
    /// control thread only.
    fn init(&mut self, client_name: &str, sink: Arc<dyn ProcessSink>) -> Result<DriverConfig>;

    /// Stop callbacks and release the backend. Blocking; after return the
    /// sink is never called again.
    fn close(&mut self) -> Result<()>;

    fn is_running(&self) -> bool;

    /// Whether the backend renders faster than real time (freewheel).
    fn is_offline(&self) -> bool {
        false
    }

    /// Transport commands, forwarded when the backend owns the clock.
    /// Backends without a transport ignore them.
    fn transport_play(&mut self) {}

    fn transport_pause(&mut self) {}

    fn transport_relocate(&mut self, frame: u64) {
        let _ = frame;
    }
}

/// Names of the drivers compiled into the core.
pub fn available_drivers() -> Vec<&'static str> {
    vec![NULL_DRIVER_NAME]
}

/// Instantiate a compiled-in driver by name.
pub fn new_driver(name: &str, sample_rate: f64, buffer_size: u32) -> Result<Box<dyn AudioDriver>> {
    if name == NULL_DRIVER_NAME {
        let (driver, _handle) = NullDriver::create(sample_rate, buffer_size);
        return Ok(Box::new(driver));
    }
    Err(Error::DriverMissing(name.to_owned()))
}

pub const NULL_DRIVER_NAME: &str = "null";

struct NullShared {
    sample_rate: f64,
    buffer_size: u32,
    running: AtomicFlag,
    offline: AtomicFlag,
    sink: Mutex<Option<Arc<dyn ProcessSink>>>,
    time: Mutex<Option<TimeInfo>>,
}

/// Backend that produces no audio on its own: each cycle is run explicitly
/// through the paired [`NullDriverHandle`].
pub struct NullDriver {
    shared: Arc<NullShared>,
}

/// Caller-side handle driving a [`NullDriver`].
#[derive(Clone)]
pub struct NullDriverHandle {
    shared: Arc<NullShared>,
}

impl NullDriver {
    pub fn create(sample_rate: f64, buffer_size: u32) -> (Self, NullDriverHandle) {
        let shared = Arc::new(NullShared {
            sample_rate,
            buffer_size,
            running: AtomicFlag::new(false),
            offline: AtomicFlag::new(false),
            sink: Mutex::new(None),
            time: Mutex::new(None),
        });
        (
            Self {
                shared: shared.clone(),
            },
            NullDriverHandle { shared },
        )
    }
}

impl AudioDriver for NullDriver {
    fn name(&self) -> &str {
        NULL_DRIVER_NAME
    }

    fn device_names(&self) -> Vec<String> {
        vec!["null".to_owned()]
    }

    fn device_info(&self, device: &str) -> Option<DeviceInfo> {
        (device == "null").then(|| DeviceInfo {
            sample_rates: vec![self.shared.sample_rate],
            buffer_sizes: vec![self.shared.buffer_size],
        })
    }

    fn init(&mut self, _client_name: &str, sink: Arc<dyn ProcessSink>) -> Result<DriverConfig> {
        if self.shared.running.get() {
            return Err(Error::AlreadyRunning);
        }
        *self.shared.sink.lock() = Some(sink);
        self.shared.running.set(true);
        Ok(DriverConfig {
            sample_rate: self.shared.sample_rate,
            buffer_size: self.shared.buffer_size,
        })
    }

    fn close(&mut self) -> Result<()> {
        self.shared.running.set(false);
        *self.shared.sink.lock() = None;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.shared.running.get()
    }

    fn is_offline(&self) -> bool {
        self.shared.offline.get()
    }
}

impl NullDriverHandle {
    pub fn sample_rate(&self) -> f64 {
        self.shared.sample_rate
    }

    pub fn buffer_size(&self) -> u32 {
        self.shared.buffer_size
    }

    pub fn set_offline(&self, offline: bool) {
        self.shared.offline.set(offline);
    }

    /// Fake a backend-owned transport for the next cycles.
    pub fn set_time_info(&self, time: Option<TimeInfo>) {
        *self.shared.time.lock() = time;
    }

    /// Run one cycle through the registered sink.
    ///
    /// `audio_out` channels are written in place; events the engine emits
    /// land in `midi_out`.
    pub fn run_block(
        &self,
        audio_in: &[Vec<f32>],
        audio_out: &mut [Vec<f32>],
        midi_in: &[EngineEvent],
        midi_out: &mut Vec<EngineEvent>,
        frames: u32,
    ) -> Result<()> {
        let sink = self
            .shared
            .sink
            .lock()
            .clone()
            .ok_or(Error::NotRunning)?;
        let time = *self.shared.time.lock();

        let in_slices: SmallVec<[&[f32]; 2]> = audio_in.iter().map(|ch| ch.as_slice()).collect();
        let mut out_slices: SmallVec<[&mut [f32]; 2]> =
            audio_out.iter_mut().map(|ch| ch.as_mut_slice()).collect();

        let mut block = DriverBlock {
            audio_in: &in_slices,
            audio_out: &mut out_slices,
            midi_in,
            midi_out,
            frames,
            time,
        };
        sink.process_block(&mut block);
        Ok(())
    }
}
