//! Error types for the engine core.

use attacca_plugin::PluginError;
use thiserror::Error;

/// Error type for engine operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("No such driver: {0}")]
    DriverMissing(String),

    #[error("Driver failed to initialise: {0}")]
    DriverInitFailed(String),

    #[error("Engine is already running")]
    AlreadyRunning,

    #[error("Engine is not running")]
    NotRunning,

    #[error("No free plugin slot (capacity {0})")]
    SlotFull(u32),

    #[error("No plugin with id {0}")]
    SlotEmpty(u32),

    #[error("Plugin name already in use: {0}")]
    DuplicateName(String),

    #[error("Plugin load failed: {0}")]
    LoadFailed(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation not supported: {0}")]
    UnsupportedOperation(&'static str),

    #[error("Event mailbox is full")]
    Backpressure,

    #[error("Timed out after {duration_ms}ms: {operation}")]
    Timeout {
        operation: &'static str,
        duration_ms: u64,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Project state is corrupt: {0}")]
    StateCorrupt(String),
}

impl From<PluginError> for Error {
    fn from(err: PluginError) -> Self {
        Error::LoadFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
