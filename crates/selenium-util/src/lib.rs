//! Shared utilities for selenium-launcher
//!
//! Default paths for the config file and the server log file.

mod paths;

pub use paths::*;
