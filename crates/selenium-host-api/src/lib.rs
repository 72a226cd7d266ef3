//! Host adapter trait interfaces for selenium-launcher
//!
//! This crate defines the capability-based interface between the server
//! supervisor and the collaborators it drives: the installer/runner that
//! downloads drivers and spawns the server, the spawned process itself, and
//! the host's termination events. It contains no platform code itself.

mod mock;
mod signals;
mod traits;

pub use mock::*;
pub use signals::*;
pub use traits::*;
