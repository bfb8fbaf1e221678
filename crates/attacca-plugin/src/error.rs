//! Error types for the plugin adapter layer.

use thiserror::Error;

/// Where a plugin load attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Resolving,
    Instantiation,
    Activation,
}

impl std::fmt::Display for LoadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadStage::Resolving => write!(f, "resolving"),
            LoadStage::Instantiation => write!(f, "creating instance"),
            LoadStage::Activation => write!(f, "activating"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Plugin load failed while {stage}: {reason}")]
    LoadFailed { stage: LoadStage, reason: String },

    #[error("Unknown internal plugin label: {0}")]
    UnknownLabel(String),

    #[error("Parameter index {0} out of range")]
    BadParameterIndex(u32),

    #[error("Program index {0} out of range")]
    BadProgramIndex(u32),

    #[error("Operation not supported by this plugin: {0}")]
    Unsupported(&'static str),

    #[error("State data is malformed: {0}")]
    BadState(String),
}

pub type Result<T> = std::result::Result<T, PluginError>;
