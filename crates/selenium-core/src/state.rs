//! Supervisor lifecycle state

use std::fmt;

/// Lifecycle of the supervised server
///
/// `Idle → Installing? → Starting → Started → RedirectingLogs? → Running → Stopped`.
/// A failed install or start falls back to `Idle`; a failed log redirection
/// leaves the server `Started` so completion still stops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LauncherState {
    #[default]
    Idle,
    Installing,
    Starting,
    Started,
    RedirectingLogs,
    Running,
    Stopped,
}

impl fmt::Display for LauncherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LauncherState::Idle => "idle",
            LauncherState::Installing => "installing",
            LauncherState::Starting => "starting",
            LauncherState::Started => "started",
            LauncherState::RedirectingLogs => "redirecting-logs",
            LauncherState::Running => "running",
            LauncherState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
