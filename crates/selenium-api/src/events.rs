//! Host process termination events

use serde::{Deserialize, Serialize};
use std::fmt;

/// Host process events on which a watch-mode server must be stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationEvent {
    /// Interrupt signal (SIGINT / Ctrl-C)
    Interrupt,
    /// Normal host process exit
    Exit,
    /// Host process going down on an uncaught error (panic)
    UncaughtError,
}

impl TerminationEvent {
    /// Every event kind, in registration order
    pub const ALL: [TerminationEvent; 3] = [
        TerminationEvent::Interrupt,
        TerminationEvent::Exit,
        TerminationEvent::UncaughtError,
    ];
}

impl fmt::Display for TerminationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerminationEvent::Interrupt => "SIGINT",
            TerminationEvent::Exit => "exit",
            TerminationEvent::UncaughtError => "uncaughtException",
        };
        f.write_str(name)
    }
}
