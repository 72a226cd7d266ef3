//! Host termination event source

use selenium_api::TerminationEvent;
use std::sync::Arc;

/// Callback run when the host process is going away
///
/// Registrations compare handlers by pointer, so a supervisor hands out
/// clones of one `Arc` rather than fresh closures.
pub type StopHandler = Arc<dyn Fn() + Send + Sync>;

/// Source of host process termination events
pub trait SignalSource: Send + Sync {
    /// Run `handler` when `event` occurs.
    ///
    /// Registering the same handler twice for one event has no effect.
    fn register(&self, event: TerminationEvent, handler: StopHandler);
}
