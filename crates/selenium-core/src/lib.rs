//! Selenium server supervisor
//!
//! This crate owns the lifecycle of one Selenium Standalone server around a
//! test run: it points capabilities at the local server, installs and
//! starts it through an [`Installer`](selenium_host_api::Installer),
//! redirects its output into a log file and stops it on completion or when
//! the host process goes away.

mod launcher;
mod log;
mod state;

pub use launcher::*;
pub use log::*;
pub use state::*;

use selenium_host_api::HostError;
use std::path::PathBuf;
use thiserror::Error;

/// Supervisor errors
#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("Selenium install failed: {0}")]
    InstallFailure(#[source] HostError),

    #[error("Selenium server failed to start: {0}")]
    StartFailure(#[source] HostError),

    #[error("Failed to redirect server output to {path:?}: {source}")]
    RedirectionFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Selenium server already running")]
    AlreadyRunning,

    #[error("Selenium server is not running")]
    NotRunning,
}

pub type LauncherResult<T> = Result<T, LauncherError>;
