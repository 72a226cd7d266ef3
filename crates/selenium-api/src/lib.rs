//! Shared types for selenium-launcher
//!
//! This crate defines the data exchanged between the configuration layer,
//! the supervisor and the host adapters:
//! - Capability entries (connection targets for test sessions)
//! - Options forwarded to the installer's install and start calls
//! - Run flags and termination events

mod events;
mod types;

pub use events::*;
pub use types::*;
