//! Installer and server process traits

use async_trait::async_trait;
use selenium_api::{InstallArgs, RunArgs};
use thiserror::Error;
use tokio::io::AsyncRead;

/// Errors from host adapter operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Install failed: {0}")]
    InstallFailed(String),

    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Stop failed: {0}")]
    StopFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Readable output stream of a server process
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Handle to a spawned Selenium server
pub trait ServerProcess: Send {
    /// OS process ID, if the handle wraps a real process
    fn pid(&self) -> Option<u32>;

    /// Take the standard output stream. Returns `None` once taken.
    fn take_stdout(&mut self) -> Option<OutputStream>;

    /// Take the standard error stream. Returns `None` once taken.
    fn take_stderr(&mut self) -> Option<OutputStream>;

    /// Terminate the server without waiting for it to exit
    fn kill(&mut self) -> HostResult<()>;
}

/// Installs drivers and starts the Selenium server
#[async_trait]
pub trait Installer: Send + Sync {
    /// Download or prepare the server and driver binaries
    async fn install(&self, args: &InstallArgs) -> HostResult<()>;

    /// Spawn the server
    async fn start(&self, args: &RunArgs) -> HostResult<Box<dyn ServerProcess>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        let err = HostError::InstallFailed("exit status 1".into());
        assert_eq!(err.to_string(), "Install failed: exit status 1");

        let err: HostError = std::io::Error::new(std::io::ErrorKind::NotFound, "java").into();
        assert!(matches!(err, HostError::Io(_)));
    }
}
