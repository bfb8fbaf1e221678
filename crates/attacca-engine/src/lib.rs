//! Real-time audio/MIDI processing core of the Attacca plugin host.
//!
//! The engine loads plugin instances (see `attacca-plugin`), wires them into
//! one of two processing topologies, distributes transport information each
//! block and keeps a strict split between the control thread and the audio
//! thread:
//!
//! - **Rack**: a fixed stereo chain; plugins run in slot-id order with a
//!   merged event bus.
//! - **Patchbay**: an arbitrary DAG of audio/event connections, evaluated in
//!   topological order.
//!
//! Control-to-RT traffic goes through a pre-allocated SPSC mailbox; RT-to-
//! control reporting goes through a deferred callback queue drained by
//! [`Engine::idle`]. Registry mutations publish RCU-style snapshots, so the
//! audio thread never takes a lock.

pub mod error;
pub use error::{Error, Result};

mod lockfree;
pub use lockfree::{AtomicDouble, AtomicFlag, AtomicFloat, Generation, PeakMeter};

pub mod config;
pub use config::{
    BinaryType, EngineOptions, OptionKey, PluginType, ProcessMode, TransportMode,
    MAX_DEFAULT_PARAMETERS, MAX_PATCHBAY_PLUGINS, MAX_RACK_PLUGINS,
};

pub mod port;
pub use port::{EventBuffer, Port, PortBuffer, PortDirection, PortKind, EVENT_BUFFER_CAPACITY};

pub mod client;
pub use client::Client;

pub mod transport;
pub use transport::Transport;

pub mod registry;
pub use registry::{PluginId, PluginSlot, Registry, SlotOrigin, SlotState, Snapshot};

pub mod mailbox;
pub use mailbox::{
    ControlEventRecord, ControlMailboxRx, ControlMailboxTx, DeferredCallback, DeferredQueue,
    StringTable, CONTROL_RING_CAPACITY, DEFERRED_QUEUE_CAPACITY, NO_STRING,
};

pub mod callback;
pub use callback::{
    CallbackHub, CallbackOpcode, CallbackSink, FileCallback, FileCallbackOpcode, NO_PLUGIN_ID,
};

pub mod driver;
pub use driver::{
    available_drivers, new_driver, AudioDriver, DeviceInfo, DriverBlock, DriverConfig, NullDriver,
    NullDriverHandle, ProcessSink, NULL_DRIVER_NAME,
};

pub mod graph;
pub use graph::{Connection, ConnectionId, PortGroup, PortRef, SYSTEM_PLUGIN};

pub mod project;
pub use project::{Project, ProjectConnection, ProjectPlugin, ProjectPort};

mod engine;
pub use engine::Engine;

// Boundary types shared with plugin instances.
pub use attacca_plugin::{
    ControlEvent, ControlEventKind, EngineEvent, EventPayload, MidiData, TimeInfo, TimeInfoBbt,
};
