//! Unix host adapter for selenium-launcher
//!
//! Provides:
//! - Installer/runner backed by the `selenium-standalone` CLI
//! - Server spawning with process group isolation
//! - Forceful (SIGKILL) termination of the whole server process tree
//! - Termination events: SIGINT, explicit exit notification, panics

mod installer;
mod process;
mod signals;

pub use installer::*;
pub use process::*;
pub use signals::*;
