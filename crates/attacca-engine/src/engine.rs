//! Engine façade: lifecycle, plugin operations and the process entry point.
//!
//! Public operations run on the control thread behind one coarse mutex. The
//! audio thread enters through [`ProcessSink::process_block`] on the shared
//! state and touches nothing but atomics, snapshots and the RT-owned graph
//! buffers.

use crate::callback::{
    CallbackHub, CallbackOpcode, CallbackSink, FileCallback, NO_PLUGIN_ID,
};
use crate::client::Client;
use crate::config::{BinaryType, EngineOptions, OptionKey, PluginType, ProcessMode, TransportMode};
use crate::driver::{self, AudioDriver, DriverBlock, ProcessSink};
use crate::error::{Error, Result};
use crate::graph::patchbay::{Patchbay, PatchbayGraph};
use crate::graph::rack::RackGraph;
use crate::graph::{Connection, ConnectionId, PortRef, SYSTEM_PLUGIN};
use crate::lockfree::{AtomicDouble, AtomicFlag, Generation, PeakMeter};
use crate::mailbox::{
    control_mailbox, ControlEventRecord, ControlMailboxRx, ControlMailboxTx, DeferredQueue,
    StringTable, CONTROL_RING_CAPACITY, DEFERRED_QUEUE_CAPACITY,
};
use crate::port::{PortDirection, PortKind};
use crate::project::{Project, ProjectConnection, ProjectPlugin, ProjectPort};
use crate::registry::{PluginId, Registry, SlotOrigin, SlotState};
use crate::transport::Transport;
use attacca_plugin::{internal, plugin_hints, EngineEvent, HostServices};
use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

const RT_MODE_RACK: u8 = 0;
const RT_MODE_PATCHBAY: u8 = 1;

/// State only the audio thread touches.
struct RtState {
    mailbox_rx: ControlMailboxRx,
    rack: RackGraph,
    patchbay: PatchbayGraph,
    drained: Vec<ControlEventRecord>,
}

/// Everything shared between the façade and the audio callback.
pub(crate) struct EngineShared {
    options: Mutex<EngineOptions>,
    transport: Transport,
    registry: Registry,
    patchbay: Patchbay,
    generation: Arc<Generation>,
    mailbox_tx: ControlMailboxTx,
    rt: UnsafeCell<RtState>,
    rt_mode: AtomicU8,
    deferred: DeferredQueue,
    strings: StringTable,
    callbacks: CallbackHub,
    host: Arc<HostServices>,
    running: AtomicFlag,
    about_to_close: AtomicFlag,
    sample_rate: AtomicDouble,
    buffer_size: AtomicU32,
    peaks: PeakMeter,
    last_error: Mutex<String>,
}

// SAFETY: `rt` is only dereferenced by the audio thread inside
// `process_block`, and by the control thread while the driver is stopped
// (init, close, renegotiation callbacks, which the driver contract delivers
// with processing suspended). All remaining fields are Sync by themselves.
unsafe impl Send for EngineShared {}
unsafe impl Sync for EngineShared {}

impl ProcessSink for EngineShared {
    fn process_block(&self, block: &mut DriverBlock<'_, '_>) {
        if !self.running.get() || self.about_to_close.get() {
            for output in block.audio_out.iter_mut() {
                output.fill(0.0);
            }
            return;
        }

        let time = self.transport.begin_block(block.time.as_ref());
        self.host.publish_time_info(time);

        // SAFETY: audio thread, see the impl-level comment.
        let rt = unsafe { &mut *self.rt.get() };
        rt.drained.clear();
        rt.mailbox_rx.drain_into(&mut rt.drained);

        let snapshot = self.registry.rt_snapshot();
        let sample_rate = self.sample_rate.get();

        for (channel, input) in block.audio_in.iter().take(2).enumerate() {
            self.peaks.update_channel(channel, input);
        }

        if self.rt_mode.load(Ordering::Relaxed) == RT_MODE_RACK {
            rt.rack.process(
                &snapshot,
                block,
                time,
                &rt.drained,
                sample_rate,
                &self.deferred,
            );
        } else {
            let plan = self.patchbay.rt_plan();
            rt.patchbay.process(
                &snapshot,
                &plan,
                block,
                time,
                &rt.drained,
                sample_rate,
                &self.deferred,
            );
        }

        for (channel, output) in block.audio_out.iter().take(2).enumerate() {
            self.peaks.update_channel(2 + channel, output);
        }

        self.transport.end_block(block.frames);
        self.generation.advance();
    }

    fn buffer_size_changed(&self, frames: u32) {
        self.buffer_size.store(frames, Ordering::Release);
        self.host.set_buffer_size(frames);

        // SAFETY: the driver delivers renegotiation with processing
        // suspended, so the RT state and every client are quiescent.
        let rt = unsafe { &mut *self.rt.get() };
        rt.rack.set_block_size(frames);
        rt.patchbay.set_block_size(frames);
        for id in self.registry.ids() {
            if let Ok(slot) = self.registry.get(id) {
                unsafe { slot.client_control() }.set_block_size(frames);
            }
        }

        self.callbacks.notify(
            CallbackOpcode::BufferSizeChanged,
            NO_PLUGIN_ID,
            frames as i32,
            0,
            0.0,
            "",
        );
    }

    fn sample_rate_changed(&self, rate: f64) {
        self.sample_rate.set(rate);
        self.transport.set_sample_rate(rate);
        self.host.set_sample_rate(rate);
        self.callbacks.notify(
            CallbackOpcode::SampleRateChanged,
            NO_PLUGIN_ID,
            0,
            0,
            rate as f32,
            "",
        );
    }
}

/// Control-thread state behind the façade mutex.
struct ControlState {
    driver: Option<Box<dyn AudioDriver>>,
    client_name: String,
    armed_replace: Option<PluginId>,
}

/// The audio plugin host engine.
///
/// One per process. Not safe for concurrent control-thread callers beyond
/// the coarse mutex it already takes: interleave operations from a single
/// thread or serialise externally.
pub struct Engine {
    shared: Arc<EngineShared>,
    control: Mutex<ControlState>,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        let generation = Arc::new(Generation::new());
        let (mailbox_tx, mailbox_rx) = control_mailbox(CONTROL_RING_CAPACITY);
        let buffer_size = options.audio_buffer_size;
        let sample_rate = f64::from(options.audio_sample_rate);
        let transport_mode = options.transport_mode;

        let shared = Arc::new(EngineShared {
            options: Mutex::new(options),
            transport: Transport::new(sample_rate, transport_mode),
            registry: Registry::new(crate::config::MAX_PATCHBAY_PLUGINS, generation.clone()),
            patchbay: Patchbay::new(),
            generation,
            mailbox_tx,
            rt: UnsafeCell::new(RtState {
                mailbox_rx,
                rack: RackGraph::new(buffer_size),
                patchbay: PatchbayGraph::new(buffer_size),
                drained: Vec::with_capacity(CONTROL_RING_CAPACITY),
            }),
            rt_mode: AtomicU8::new(RT_MODE_RACK),
            deferred: DeferredQueue::new(DEFERRED_QUEUE_CAPACITY),
            strings: StringTable::new(),
            callbacks: CallbackHub::new(),
            host: Arc::new(HostServices::new(sample_rate, buffer_size)),
            running: AtomicFlag::new(false),
            about_to_close: AtomicFlag::new(false),
            sample_rate: AtomicDouble::new(sample_rate),
            buffer_size: AtomicU32::new(buffer_size),
            peaks: PeakMeter::new(),
            last_error: Mutex::new(String::new()),
        });

        Self {
            shared,
            control: Mutex::new(ControlState {
                driver: None,
                client_name: String::new(),
                armed_replace: None,
            }),
        }
    }

    // --- lifecycle ---------------------------------------------------------

    /// Select a compiled-in backend by name and start the engine.
    pub fn init(&self, driver_name: &str, client_name: &str) -> Result<()> {
        let result = (|| {
            let options = self.shared.options.lock().clone();
            let driver = driver::new_driver(
                driver_name,
                f64::from(options.audio_sample_rate),
                options.audio_buffer_size,
            )?;
            self.init_with_driver(driver, client_name)
        })();
        self.track(result)
    }

    /// Start the engine on a caller-supplied backend.
    pub fn init_with_driver(
        &self,
        mut driver: Box<dyn AudioDriver>,
        client_name: &str,
    ) -> Result<()> {
        let result = (|| {
            let mut control = self.control.lock();
            if self.shared.running.get() {
                return Err(Error::AlreadyRunning);
            }
            let options = self.shared.options.lock().clone();
            options.validate()?;

            let config = driver
                .init(client_name, self.shared.clone())
                .map_err(|e| match e {
                    Error::AlreadyRunning => e,
                    other => Error::DriverInitFailed(other.to_string()),
                })?;

            self.shared
                .sample_rate
                .set(config.sample_rate);
            self.shared
                .buffer_size
                .store(config.buffer_size, Ordering::Release);
            self.shared.transport.set_sample_rate(config.sample_rate);
            self.shared.transport.set_mode(options.transport_mode);
            self.shared.host.set_sample_rate(config.sample_rate);
            self.shared.host.set_buffer_size(config.buffer_size);

            let rt_mode = match options.process_mode {
                ProcessMode::ContinuousRack | ProcessMode::Bridge => RT_MODE_RACK,
                _ => RT_MODE_PATCHBAY,
            };
            self.shared.rt_mode.store(rt_mode, Ordering::Release);

            // SAFETY: the driver is initialised but produces no callbacks
            // until this function returns with `running` set.
            let rt = unsafe { &mut *self.shared.rt.get() };
            rt.rack.set_block_size(config.buffer_size);
            rt.patchbay.set_block_size(config.buffer_size);

            let driver_name = driver.name().to_owned();
            control.driver = Some(driver);
            control.client_name = client_name.to_owned();
            self.shared.about_to_close.set(false);
            self.shared.running.set(true);

            tracing::info!(driver = %driver_name, client = client_name, "engine started");
            self.shared.callbacks.notify(
                CallbackOpcode::EngineStarted,
                NO_PLUGIN_ID,
                options.process_mode as i32,
                options.transport_mode as i32,
                config.sample_rate as f32,
                &driver_name,
            );
            Ok(())
        })();
        self.track(result)
    }

    /// Stop the driver and tear everything down. Always reaches the idle
    /// state; returns the first error observed on the way.
    pub fn close(&self) -> Result<()> {
        let result = (|| {
            let mut control = self.control.lock();
            if !self.shared.running.get() {
                return Err(Error::NotRunning);
            }
            self.shared.about_to_close.set(true);

            let mut first_error = None;
            if let Some(mut driver) = control.driver.take() {
                if let Err(e) = driver.close() {
                    first_error = Some(e);
                }
            }
            self.shared.running.set(false);

            self.drain_deferred();
            control.armed_replace = None;

            for id in self.shared.registry.ids().into_iter().rev() {
                if let Err(e) = self.remove_plugin_locked(id) {
                    first_error.get_or_insert(e);
                }
            }
            self.shared.patchbay.clear(&self.shared.registry);
            self.shared.registry.collect_retired(true);
            self.shared.about_to_close.set(false);

            tracing::info!("engine stopped");
            self.shared.callbacks.notify(
                CallbackOpcode::EngineStopped,
                NO_PLUGIN_ID,
                0,
                0,
                0.0,
                "",
            );
            match first_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })();
        self.track(result)
    }

    /// Periodic control-thread tick: deliver deferred callbacks, expire a
    /// stale replace arming, reap quarantined plugins, reclaim snapshots.
    pub fn idle(&self) {
        self.drain_deferred();

        let expired = {
            let mut control = self.control.lock();
            control.armed_replace.take()
        };
        if let Some(id) = expired {
            if let Ok(slot) = self.shared.registry.get(id) {
                if slot.state() == SlotState::Replacing {
                    slot.set_state(SlotState::Ready);
                    self.shared.registry.publish();
                }
            }
            self.shared.callbacks.notify(
                CallbackOpcode::Info,
                id,
                0,
                0,
                0.0,
                "replace cancelled: no plugin was added",
            );
        }

        // Plugins the audio thread quarantined get removed here.
        for id in self.shared.registry.ids() {
            if let Ok(slot) = self.shared.registry.get(id) {
                if !slot.is_enabled() {
                    let _ = self.remove_plugin(id);
                }
            }
        }

        self.shared
            .registry
            .collect_retired(!self.shared.running.get());
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.get()
    }

    /// Whether the backend is in freewheel (faster-than-realtime) mode.
    pub fn is_offline(&self) -> bool {
        self.control
            .lock()
            .driver
            .as_ref()
            .is_some_and(|driver| driver.is_offline())
    }

    pub fn sample_rate(&self) -> f64 {
        self.shared.sample_rate.get()
    }

    pub fn buffer_size(&self) -> u32 {
        self.shared.buffer_size.load(Ordering::Acquire)
    }

    pub fn last_error(&self) -> String {
        self.shared.last_error.lock().clone()
    }

    pub fn host_services(&self) -> Arc<HostServices> {
        self.shared.host.clone()
    }

    /// Engine-level I/O peaks: [in-left, in-right, out-left, out-right].
    pub fn peaks(&self) -> [f32; 4] {
        [
            self.shared.peaks.get(0),
            self.shared.peaks.get(1),
            self.shared.peaks.get(2),
            self.shared.peaks.get(3),
        ]
    }

    // --- callbacks ---------------------------------------------------------

    pub fn set_callback(&self, sink: Option<CallbackSink>) {
        self.shared.callbacks.set_sink(sink);
    }

    pub fn set_file_callback(&self, callback: Option<FileCallback>) {
        self.shared.callbacks.set_file_callback(callback);
    }

    // --- options -----------------------------------------------------------

    pub fn set_option(&self, key: OptionKey, value: i64, text: Option<&str>) -> Result<()> {
        let result = (|| {
            let runtime_tunable =
                matches!(key, OptionKey::MaxParameters | OptionKey::UiBridgesTimeout);
            if self.shared.running.get() && !runtime_tunable {
                return Err(Error::UnsupportedOperation(
                    "option can only be changed while the engine is stopped",
                ));
            }
            self.shared.options.lock().set(key, value, text)
        })();
        self.track(result)
    }

    pub fn options(&self) -> EngineOptions {
        self.shared.options.lock().clone()
    }

    // --- plugin lifecycle --------------------------------------------------

    /// Load a plugin into the lowest free slot (or the armed replace slot).
    pub fn add_plugin(
        &self,
        binary: BinaryType,
        kind: PluginType,
        filename: Option<&Path>,
        name: Option<&str>,
        label: &str,
    ) -> Result<PluginId> {
        let result = self.add_plugin_inner(binary, kind, filename, name, label);
        self.track(result)
    }

    fn add_plugin_inner(
        &self,
        _binary: BinaryType,
        kind: PluginType,
        filename: Option<&Path>,
        name: Option<&str>,
        label: &str,
    ) -> Result<PluginId> {
        let mut control = self.control.lock();
        if !self.shared.running.get() {
            return Err(Error::NotRunning);
        }

        // The armed slot stays armed if loading fails before the takeover.
        let replace_target = control.armed_replace;
        let options = self.shared.options.lock().clone();
        if replace_target.is_none() && self.shared.registry.count() >= options.max_plugins() {
            return Err(Error::SlotFull(options.max_plugins()));
        }

        let mut instance = match kind {
            PluginType::Internal => internal::instantiate(label)?,
            other => {
                return Err(Error::LoadFailed(format!(
                    "no loader for {other} plugins in this build"
                )))
            }
        };

        let name = match name {
            Some(requested) if !requested.is_empty() => {
                if self.shared.registry.find_by_name(requested).is_some() {
                    return Err(Error::DuplicateName(requested.to_owned()));
                }
                requested.to_owned()
            }
            _ => self.shared.registry.unique_name(instance.name()),
        };

        let client = build_client(&instance.port_counts(), self.buffer_size())?;
        let latency = instance.latency();
        instance.activate();

        let origin = SlotOrigin {
            kind,
            filename: filename.map(|p| p.to_string_lossy().into_owned()),
        };

        let slot = match replace_target {
            Some(id) => {
                // The armed slot's occupant goes first; its id is reused.
                self.remove_plugin_locked(id)?;
                control.armed_replace = None;
                self.shared
                    .registry
                    .reserve_at(id, name.clone(), origin, instance, client)?
            }
            None => self
                .shared
                .registry
                .reserve(name.clone(), origin, instance, client)?,
        };
        let id = slot.id();
        slot.set_latency(latency);
        slot.set_name_index(self.shared.strings.intern(&name));
        self.shared.registry.commit(id)?;
        self.shared.patchbay.rebuild_plan(&self.shared.registry);
        drop(control);

        tracing::info!(id, name = %name, label, "plugin added");
        self.shared
            .callbacks
            .notify(CallbackOpcode::PluginAdded, id, 0, 0, 0.0, &name);
        Ok(id)
    }

    pub fn remove_plugin(&self, id: PluginId) -> Result<()> {
        let result = (|| {
            let _control = self.control.lock();
            self.remove_plugin_locked(id)
        })();
        self.track(result)
    }

    fn remove_plugin_locked(&self, id: PluginId) -> Result<()> {
        self.shared
            .patchbay
            .disconnect_plugin(&self.shared.registry, id);
        let (slot, _retired_at) = self.shared.registry.begin_remove(id)?;
        slot.instance().deactivate();
        self.shared
            .callbacks
            .notify(CallbackOpcode::PluginRemoved, id, 0, 0, 0.0, "");
        Ok(())
    }

    pub fn remove_all_plugins(&self) -> Result<()> {
        let result = (|| {
            let _control = self.control.lock();
            let mut first_error = None;
            for id in self.shared.registry.ids().into_iter().rev() {
                if let Err(e) = self.remove_plugin_locked(id) {
                    first_error.get_or_insert(e);
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })();
        self.track(result)
    }

    /// Rename a plugin. Duplicate names are rejected; returns the new name.
    pub fn rename_plugin(&self, id: PluginId, new_name: &str) -> Result<String> {
        let result = (|| {
            let _control = self.control.lock();
            let slot = self.shared.registry.get(id)?;
            if new_name.is_empty() {
                return Err(Error::InvalidArgument("empty plugin name".into()));
            }
            if let Some(existing) = self.shared.registry.find_by_name(new_name) {
                if existing.id() != id {
                    return Err(Error::DuplicateName(new_name.to_owned()));
                }
            }
            slot.set_name(new_name.to_owned());
            slot.set_name_index(self.shared.strings.intern(new_name));
            self.shared
                .callbacks
                .notify(CallbackOpcode::PluginRenamed, id, 0, 0, 0.0, new_name);
            Ok(new_name.to_owned())
        })();
        self.track(result)
    }

    /// Duplicate a plugin into the next free slot, state included.
    pub fn clone_plugin(&self, id: PluginId) -> Result<PluginId> {
        let result = (|| {
            let source = self.shared.registry.get(id)?;
            let (kind, filename, label, source_name) = {
                let origin = source.origin().clone();
                let instance = source.instance();
                (
                    origin.kind,
                    origin.filename,
                    instance.label().to_owned(),
                    source.name(),
                )
            };

            let clone_name = self.shared.registry.unique_name(&source_name);
            let new_id = self.add_plugin_inner(
                BinaryType::Native,
                kind,
                filename.as_deref().map(Path::new),
                Some(&clone_name),
                &label,
            )?;
            // Fresh instance takes over the source's whole state.
            let target = self.shared.registry.get(new_id)?;
            {
                let source_instance = source.instance();
                let mut target_instance = target.instance();
                for index in 0..source_instance.parameter_count() {
                    target_instance.set_parameter(index, source_instance.get_parameter(index));
                }
                if let Some(program) = source_instance.current_program() {
                    let _ = target_instance.set_program(program);
                }
                if let Some(program) = source_instance.current_midi_program() {
                    let _ = target_instance.set_midi_program(program);
                }
                for data in source_instance.custom_data() {
                    let _ = target_instance.set_custom_data(&data.key, &data.value);
                }
            }
            if source.instance().hints() & plugin_hints::USES_CHUNKS != 0 {
                if let Ok(chunk) = source.instance().chunk_data() {
                    let _ = target.instance().set_chunk_data(&chunk);
                }
            }
            target.set_midi_channel_mask(source.midi_channel_mask());
            Ok(new_id)
        })();
        self.track(result)
    }

    /// Arm `id` for replacement: the next `add_plugin` takes over its slot.
    /// Expires at the next `idle()` if no add follows.
    pub fn replace_plugin(&self, id: PluginId) -> Result<()> {
        let result = (|| {
            let mut control = self.control.lock();
            let slot = self.shared.registry.get(id)?;
            slot.set_state(SlotState::Replacing);
            control.armed_replace = Some(id);
            Ok(())
        })();
        self.track(result)
    }

    /// Swap two slots' positions atomically with respect to the audio
    /// thread. Patchbay connections follow the plugins.
    pub fn switch_plugins(&self, a: PluginId, b: PluginId) -> Result<()> {
        let result = (|| {
            let _control = self.control.lock();
            if a == b {
                return Err(Error::InvalidArgument("switching a slot with itself".into()));
            }
            self.shared.registry.switch(a, b)?;
            self.shared
                .patchbay
                .remap_switch(&self.shared.registry, a, b);
            Ok(())
        })();
        self.track(result)
    }

    // --- plugin access -----------------------------------------------------

    pub fn plugin_count(&self) -> u32 {
        self.shared.registry.count()
    }

    pub fn plugin_ids(&self) -> Vec<PluginId> {
        self.shared.registry.ids()
    }

    pub fn plugin_name(&self, id: PluginId) -> Result<String> {
        let result = self.shared.registry.get(id).map(|slot| slot.name());
        self.track(result)
    }

    pub fn get_unique_plugin_name(&self, base: &str) -> String {
        self.shared.registry.unique_name(base)
    }

    /// Parameter count, capped by the `max_parameters` option.
    pub fn parameter_count(&self, id: PluginId) -> Result<u32> {
        let result = (|| {
            let slot = self.shared.registry.get(id)?;
            let max = self.shared.options.lock().max_parameters;
            let count = slot.instance().parameter_count().min(max);
            Ok(count)
        })();
        self.track(result)
    }

    pub fn get_parameter(&self, id: PluginId, index: u32) -> Result<f32> {
        let result = (|| {
            let slot = self.shared.registry.get(id)?;
            let value = slot.instance().get_parameter(index);
            Ok(value)
        })();
        self.track(result)
    }

    /// Set a parameter to a real value, clamped to its declared range.
    pub fn set_parameter(&self, id: PluginId, index: u32, value: f32) -> Result<()> {
        let result = (|| {
            let slot = self.shared.registry.get(id)?;
            let mut instance = slot.instance();
            let ranges = instance.parameter_ranges(index)?;
            instance.set_parameter(index, ranges.clamp(value));
            drop(instance);
            self.shared.callbacks.notify(
                CallbackOpcode::ParameterValueChanged,
                id,
                index as i32,
                0,
                value,
                "",
            );
            Ok(())
        })();
        self.track(result)
    }

    /// Processing latency of one plugin, in samples.
    pub fn plugin_latency(&self, id: PluginId) -> Result<u32> {
        let result = self.shared.registry.get(id).map(|slot| slot.latency());
        self.track(result)
    }

    /// Per-slot peaks: [in-left, in-right, out-left, out-right].
    pub fn plugin_peaks(&self, id: PluginId) -> Result<[f32; 4]> {
        let result = self.shared.registry.get(id).map(|slot| {
            [
                slot.peaks.get(0),
                slot.peaks.get(1),
                slot.peaks.get(2),
                slot.peaks.get(3),
            ]
        });
        self.track(result)
    }

    /// Queue a control event for delivery to the audio thread.
    ///
    /// FIFO per submitter; the plugin observes it in the first block that
    /// starts after submission. Full ring returns [`Error::Backpressure`],
    /// retry at `idle()` granularity.
    pub fn submit_control_event(&self, id: PluginId, event: EngineEvent) -> Result<()> {
        let result = self
            .shared
            .mailbox_tx
            .push(ControlEventRecord {
                plugin_id: id,
                event,
            });
        self.track(result)
    }

    // --- transport ---------------------------------------------------------

    pub fn transport_play(&self) {
        self.shared.transport.play();
        if self.shared.transport.mode() == TransportMode::Jack {
            if let Some(driver) = self.control.lock().driver.as_mut() {
                driver.transport_play();
            }
        }
    }

    pub fn transport_pause(&self) {
        self.shared.transport.pause();
        if self.shared.transport.mode() == TransportMode::Jack {
            if let Some(driver) = self.control.lock().driver.as_mut() {
                driver.transport_pause();
            }
        }
    }

    pub fn transport_relocate(&self, frame: u64) {
        self.shared.transport.relocate(frame);
        if self.shared.transport.mode() == TransportMode::Jack {
            if let Some(driver) = self.control.lock().driver.as_mut() {
                driver.transport_relocate(frame);
            }
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.shared.transport
    }

    // --- patchbay ----------------------------------------------------------

    pub fn patchbay_connect(&self, source: PortRef, sink: PortRef) -> Result<ConnectionId> {
        let result = (|| {
            self.require_patchbay()?;
            self.shared
                .patchbay
                .connect(&self.shared.registry, source, sink)
        })();
        self.track(result)
    }

    pub fn patchbay_disconnect(&self, id: ConnectionId) -> Result<()> {
        let result = (|| {
            self.require_patchbay()?;
            self.shared.patchbay.disconnect(&self.shared.registry, id)
        })();
        self.track(result)
    }

    pub fn patchbay_connections(&self) -> Vec<Connection> {
        self.shared.patchbay.connections()
    }

    /// Re-announce every plugin and connection to the callback sink.
    pub fn patchbay_refresh(&self) -> Result<()> {
        let result = (|| {
            self.require_patchbay()?;
            for id in self.shared.registry.ids() {
                let slot = self.shared.registry.get(id)?;
                self.shared.callbacks.notify(
                    CallbackOpcode::PluginAdded,
                    id,
                    0,
                    0,
                    0.0,
                    &slot.name(),
                );
            }
            for connection in self.shared.patchbay.connections() {
                let description = format!(
                    "connection {}: {}:{} -> {}:{}",
                    connection.id,
                    connection.source.plugin,
                    connection.source.index,
                    connection.sink.plugin,
                    connection.sink.index
                );
                self.shared.callbacks.notify(
                    CallbackOpcode::Info,
                    NO_PLUGIN_ID,
                    connection.id as i32,
                    0,
                    0.0,
                    &description,
                );
            }
            Ok(())
        })();
        self.track(result)
    }

    fn require_patchbay(&self) -> Result<()> {
        let mode = self.shared.options.lock().process_mode;
        if mode == ProcessMode::ContinuousRack || mode == ProcessMode::Bridge {
            return Err(Error::UnsupportedOperation(
                "patchbay operations need a patchbay process mode",
            ));
        }
        Ok(())
    }

    // --- projects ----------------------------------------------------------

    /// Snapshot the whole engine state.
    pub fn snapshot_project(&self) -> Result<Project> {
        let result = (|| {
            let _control = self.control.lock();
            let ids = self.shared.registry.ids();
            let mut plugins = Vec::with_capacity(ids.len());
            for &id in &ids {
                let slot = self.shared.registry.get(id)?;
                let mut instance = slot.instance();
                instance.prepare_for_save();

                let parameters = (0..instance.parameter_count())
                    .map(|index| instance.get_parameter(index))
                    .collect();
                let chunk = if instance.hints() & plugin_hints::USES_CHUNKS != 0 {
                    instance.chunk_data().ok()
                } else {
                    None
                };
                let origin = slot.origin().clone();
                plugins.push(ProjectPlugin {
                    kind: origin.kind,
                    label: instance.label().to_owned(),
                    name: slot.name(),
                    filename: origin.filename,
                    midi_channel_mask: slot.midi_channel_mask(),
                    parameters,
                    program: instance.current_program(),
                    midi_program: instance.current_midi_program(),
                    custom_data: instance.custom_data(),
                    chunk,
                });
            }

            let position_of = |plugin: PluginId| -> u32 {
                if plugin == SYSTEM_PLUGIN {
                    SYSTEM_PLUGIN
                } else {
                    ids.iter().position(|&id| id == plugin).unwrap_or(0) as u32
                }
            };
            let connections = self
                .shared
                .patchbay
                .connections()
                .into_iter()
                .map(|c| ProjectConnection {
                    source: ProjectPort {
                        plugin: position_of(c.source.plugin),
                        group: c.source.group,
                        index: c.source.index,
                    },
                    sink: ProjectPort {
                        plugin: position_of(c.sink.plugin),
                        group: c.sink.group,
                        index: c.sink.index,
                    },
                })
                .collect();

            Ok(Project {
                plugins,
                connections,
            })
        })();
        self.track(result)
    }

    pub fn save_project(&self, path: &Path) -> Result<()> {
        let result = self.snapshot_project().and_then(|p| p.save(path));
        self.track(result)
    }

    /// Restore a snapshot into the engine, yielding to `idle()` between
    /// plugin insertions.
    pub fn load_project_state(&self, project: &Project) -> Result<()> {
        let result = (|| {
            let mut loaded_ids = Vec::with_capacity(project.plugins.len());
            for saved in &project.plugins {
                let id = self.add_plugin(
                    BinaryType::Native,
                    saved.kind,
                    saved.filename.as_deref().map(Path::new),
                    Some(&self.shared.registry.unique_name(&saved.name)),
                    &saved.label,
                )?;
                loaded_ids.push(id);

                let slot = self.shared.registry.get(id)?;
                slot.set_midi_channel_mask(saved.midi_channel_mask);
                {
                    let mut instance = slot.instance();
                    for (index, &value) in saved.parameters.iter().enumerate() {
                        let index = index as u32;
                        if let Ok(ranges) = instance.parameter_ranges(index) {
                            instance.set_parameter(index, ranges.clamp(value));
                        }
                    }
                    if let Some(program) = saved.program {
                        let _ = instance.set_program(program);
                    }
                    if let Some(program) = saved.midi_program {
                        let _ = instance.set_midi_program(program);
                    }
                    for data in &saved.custom_data {
                        let _ = instance.set_custom_data(&data.key, &data.value);
                    }
                    if let Some(chunk) = &saved.chunk {
                        let _ = instance.set_chunk_data(chunk);
                    }
                }
                // Long imports stay responsive.
                self.idle();
            }

            for connection in &project.connections {
                let resolve = |port: &ProjectPort| -> Result<PortRef> {
                    let plugin = if port.is_system() {
                        SYSTEM_PLUGIN
                    } else {
                        *loaded_ids.get(port.plugin as usize).ok_or_else(|| {
                            Error::StateCorrupt(format!(
                                "connection references plugin {} of {}",
                                port.plugin,
                                loaded_ids.len()
                            ))
                        })?
                    };
                    Ok(PortRef {
                        plugin,
                        group: port.group,
                        index: port.index,
                    })
                };
                let source = resolve(&connection.source)?;
                let sink = resolve(&connection.sink)?;
                self.shared
                    .patchbay
                    .connect(&self.shared.registry, source, sink)?;
            }
            Ok(())
        })();
        self.track(result)
    }

    pub fn load_project(&self, path: &Path) -> Result<()> {
        let result = Project::load(path).and_then(|p| self.load_project_state(&p));
        self.track(result)
    }

    // --- internals ---------------------------------------------------------

    /// Record a failure into `last_error` on the way out.
    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            *self.shared.last_error.lock() = e.to_string();
        }
        result
    }

    fn drain_deferred(&self) {
        while let Some(callback) = self.shared.deferred.pop() {
            let text = self.shared.strings.resolve(callback.string_index);
            self.shared.callbacks.notify(
                callback.opcode,
                callback.plugin_id,
                callback.v1,
                callback.v2,
                callback.v3,
                &text,
            );
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.shared.running.get() {
            let _ = self.close();
        }
    }
}

/// Build a plugin's port group in the canonical order: audio-in,
/// audio-out, event-in, event-out.
fn build_client(counts: &attacca_plugin::PortCounts, buffer_size: u32) -> Result<Client> {
    let mut client = Client::new(buffer_size);
    for i in 0..counts.audio_in {
        client.add_port(
            &format!("input_{}", i + 1),
            PortKind::Audio,
            PortDirection::Input,
        )?;
    }
    for i in 0..counts.audio_out {
        client.add_port(
            &format!("output_{}", i + 1),
            PortKind::Audio,
            PortDirection::Output,
        )?;
    }
    for i in 0..counts.midi_in {
        client.add_port(
            &format!("events-in_{}", i + 1),
            PortKind::Event,
            PortDirection::Input,
        )?;
    }
    for i in 0..counts.midi_out {
        client.add_port(
            &format!("events-out_{}", i + 1),
            PortKind::Event,
            PortDirection::Output,
        )?;
    }
    client.set_active(true);
    Ok(client)
}
