//! # Attacca - Audio Plugin Host Engine
//!
//! Umbrella crate over the engine subsystems:
//! - **attacca-engine** - Processing core (rack/patchbay graph, transport,
//!   registry, mailboxes, driver abstraction)
//! - **attacca-plugin** - Plugin instance contract, host services and the
//!   internal plugin set
//!
//! ## Quick Start
//!
//! ```ignore
//! use attacca::prelude::*;
//!
//! // Create an engine on the null backend (tests, offline tools).
//! let (driver, handle) = NullDriver::create(48000.0, 256);
//! let engine = EngineBuilder::new()
//!     .client_name("demo")
//!     .driver(Box::new(driver))
//!     .build()?;
//!
//! // Load an internal plugin into the rack and halve its volume.
//! let id = engine.add_plugin(BinaryType::Native, PluginType::Internal, None, None, "gain")?;
//! engine.set_parameter(id, 0, 0.5)?;
//!
//! // Start the transport and run one block.
//! engine.transport_play();
//! let input = vec![vec![1.0; 256]; 2];
//! let mut output = vec![vec![0.0; 256]; 2];
//! let mut events = Vec::new();
//! handle.run_block(&input, &mut output, &[], &mut events, 256)?;
//! ```

/// Re-export of the engine core for direct access.
pub use attacca_engine as engine;

pub use attacca_engine::{
    available_drivers,
    new_driver,
    // Driver abstraction
    AudioDriver,
    // Types shared with plugins
    BinaryType,
    CallbackOpcode,
    CallbackSink,
    Connection,
    ConnectionId,
    ControlEvent,
    ControlEventKind,
    DeviceInfo,
    DriverBlock,
    DriverConfig,
    // The façade
    Engine,
    EngineEvent,
    EngineOptions,
    // Errors
    Error,
    EventPayload,
    FileCallback,
    FileCallbackOpcode,
    MidiData,
    NullDriver,
    NullDriverHandle,
    OptionKey,
    PluginId,
    PluginType,
    PortGroup,
    PortRef,
    ProcessMode,
    ProcessSink,
    Project,
    Result,
    TimeInfo,
    TimeInfoBbt,
    Transport,
    TransportMode,
    NO_PLUGIN_ID,
    SYSTEM_PLUGIN,
};

/// Re-export of the plugin contract crate.
pub use attacca_plugin as plugin;

pub use attacca_plugin::{
    internal, HostServices, ParameterData, ParameterInfo, ParameterRanges, PluginInstance,
    PortCounts, ProcessContext, UiListener,
};

mod builder;
pub use builder::EngineBuilder;

/// Convenience prelude for common imports.
pub mod prelude {
    pub use crate::{
        BinaryType, Connection, ConnectionId, Engine, EngineBuilder, EngineEvent, EngineOptions,
        Error, NullDriver, NullDriverHandle, OptionKey, PluginId, PluginType, PortRef,
        ProcessMode, Result, TransportMode, SYSTEM_PLUGIN,
    };
}
