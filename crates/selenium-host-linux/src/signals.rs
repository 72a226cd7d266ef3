//! Host process termination events

use selenium_api::TerminationEvent;
use selenium_host_api::{HostError, HostResult, SignalSource, StopHandler};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, info, warn};

/// Exit status used after handling SIGINT (128 + SIGINT)
pub const INTERRUPT_EXIT_CODE: i32 = 130;

type HandlerMap = Arc<Mutex<HashMap<TerminationEvent, Vec<StopHandler>>>>;

/// Termination events of the current process
///
/// - `Interrupt`: a tokio task waits for SIGINT, runs the handlers and exits
///   with [`INTERRUPT_EXIT_CODE`]
/// - `UncaughtError`: runs when the future passed to
///   [`ProcessSignals::run_guarded`] panics, just before the panic resumes
/// - `Exit`: runs when the owner calls [`ProcessSignals::notify`] on its way out
///
/// Panics that something catches (a failed tokio task, `catch_unwind`) do not
/// count as uncaught and leave the handlers alone.
pub struct ProcessSignals {
    handlers: HandlerMap,
    interrupt_listener: AtomicBool,
}

impl ProcessSignals {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(HashMap::new())),
            interrupt_listener: AtomicBool::new(false),
        }
    }

    /// Run every handler registered for `event`
    pub fn notify(&self, event: TerminationEvent) {
        run_handlers(&self.handlers, event);
    }

    /// Number of handlers registered for `event`
    pub fn handler_count(&self, event: TerminationEvent) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event)
            .map_or(0, Vec::len)
    }

    /// Whether the SIGINT listener task is running
    pub fn listening_for_interrupt(&self) -> bool {
        self.interrupt_listener.load(Ordering::SeqCst)
    }

    /// Drive `future` to completion as the body of the process.
    ///
    /// A panic escaping `future` runs the `UncaughtError` handlers and is then
    /// resumed on the caller.
    pub async fn run_guarded<F>(&self, future: F) -> HostResult<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match tokio::spawn(future).await {
            Ok(output) => Ok(output),
            Err(e) if e.is_panic() => {
                error!("Uncaught panic, stopping Selenium server");
                run_handlers(&self.handlers, TerminationEvent::UncaughtError);
                std::panic::resume_unwind(e.into_panic())
            }
            Err(e) => Err(HostError::Internal(format!("Main task cancelled: {}", e))),
        }
    }

    fn install_interrupt_listener(&self) {
        if self.listening_for_interrupt() {
            return;
        }

        if let Err(e) = tokio::runtime::Handle::try_current() {
            // Retried on the next Interrupt registration
            warn!(error = %e, "No tokio runtime, SIGINT handler not installed");
            return;
        }

        // Created here rather than in the task so SIGINT is caught from now on
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Failed to create SIGINT handler");
                return;
            }
        };

        if self.interrupt_listener.swap(true, Ordering::SeqCst) {
            return;
        }

        let handlers = self.handlers.clone();
        tokio::spawn(async move {
            if sigint.recv().await.is_some() {
                info!("Received SIGINT, stopping Selenium server");
                run_handlers(&handlers, TerminationEvent::Interrupt);
                std::process::exit(INTERRUPT_EXIT_CODE);
            }
        });

        debug!("SIGINT listener installed");
    }
}

impl Default for ProcessSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalSource for ProcessSignals {
    fn register(&self, event: TerminationEvent, handler: StopHandler) {
        if event == TerminationEvent::Interrupt {
            self.install_interrupt_listener();
        }

        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        let registered = handlers.entry(event).or_default();
        if registered.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            return;
        }
        registered.push(handler);

        debug!(event = %event, "Termination handler registered");
    }
}

fn run_handlers(handlers: &HandlerMap, event: TerminationEvent) {
    // Handlers run without the lock held so they may register or notify
    let snapshot: Vec<StopHandler> = handlers
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&event)
        .cloned()
        .unwrap_or_default();

    for handler in snapshot {
        handler();
    }
}
