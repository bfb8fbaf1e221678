//! Integration test modules for the Attacca engine.

pub mod engine;
pub mod mailbox;
pub mod patchbay;
pub mod project;
pub mod rack;
pub mod transport;
