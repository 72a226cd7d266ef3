//! Mock collaborators for testing

use async_trait::async_trait;
use selenium_api::{InstallArgs, RunArgs, TerminationEvent};
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{
    HostError, HostResult, Installer, OutputStream, ServerProcess, SignalSource, StopHandler,
};

/// A call recorded by [`MockInstaller`]
#[derive(Debug, Clone, PartialEq)]
pub enum InstallerCall {
    Install(InstallArgs),
    Start(RunArgs),
}

/// Mock installer/runner for unit/integration testing
pub struct MockInstaller {
    next_pid: AtomicU32,
    calls: Arc<Mutex<Vec<InstallerCall>>>,
    kills: Arc<AtomicUsize>,
    streams_taken: Arc<AtomicUsize>,

    /// Configure install to fail
    pub fail_install: Arc<Mutex<bool>>,

    /// Configure start to fail
    pub fail_start: Arc<Mutex<bool>>,

    /// Bytes the spawned server writes to stdout
    pub stdout: Arc<Mutex<Vec<u8>>>,

    /// Bytes the spawned server writes to stderr
    pub stderr: Arc<Mutex<Vec<u8>>>,
}

impl MockInstaller {
    pub fn new() -> Self {
        Self {
            next_pid: AtomicU32::new(4000),
            calls: Arc::new(Mutex::new(Vec::new())),
            kills: Arc::new(AtomicUsize::new(0)),
            streams_taken: Arc::new(AtomicUsize::new(0)),
            fail_install: Arc::new(Mutex::new(false)),
            fail_start: Arc::new(Mutex::new(false)),
            stdout: Arc::new(Mutex::new(Vec::new())),
            stderr: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the output of servers spawned from now on
    pub fn with_output(self, stdout: &[u8], stderr: &[u8]) -> Self {
        *self.stdout.lock().unwrap() = stdout.to_vec();
        *self.stderr.lock().unwrap() = stderr.to_vec();
        self
    }

    /// All install/start calls in order
    pub fn calls(&self) -> Vec<InstallerCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Arguments of every install call
    pub fn install_calls(&self) -> Vec<InstallArgs> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                InstallerCall::Install(args) => Some(args),
                InstallerCall::Start(_) => None,
            })
            .collect()
    }

    /// Arguments of every start call
    pub fn start_calls(&self) -> Vec<RunArgs> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                InstallerCall::Start(args) => Some(args),
                InstallerCall::Install(_) => None,
            })
            .collect()
    }

    /// Number of `kill()` calls across all spawned servers
    pub fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    /// Number of output streams taken from spawned servers
    pub fn streams_taken(&self) -> usize {
        self.streams_taken.load(Ordering::SeqCst)
    }
}

impl Default for MockInstaller {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Installer for MockInstaller {
    async fn install(&self, args: &InstallArgs) -> HostResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(InstallerCall::Install(args.clone()));

        if *self.fail_install.lock().unwrap() {
            return Err(HostError::InstallFailed("Mock install failure".into()));
        }

        Ok(())
    }

    async fn start(&self, args: &RunArgs) -> HostResult<Box<dyn ServerProcess>> {
        self.calls
            .lock()
            .unwrap()
            .push(InstallerCall::Start(args.clone()));

        if *self.fail_start.lock().unwrap() {
            return Err(HostError::SpawnFailed("Mock start failure".into()));
        }

        let process = MockServerProcess {
            pid: self.next_pid.fetch_add(1, Ordering::SeqCst),
            stdout: Some(Box::new(Cursor::new(self.stdout.lock().unwrap().clone()))),
            stderr: Some(Box::new(Cursor::new(self.stderr.lock().unwrap().clone()))),
            kills: self.kills.clone(),
            streams_taken: self.streams_taken.clone(),
        };

        Ok(Box::new(process))
    }
}

/// Server handle produced by [`MockInstaller`]
pub struct MockServerProcess {
    pid: u32,
    stdout: Option<OutputStream>,
    stderr: Option<OutputStream>,
    kills: Arc<AtomicUsize>,
    streams_taken: Arc<AtomicUsize>,
}

impl ServerProcess for MockServerProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn take_stdout(&mut self) -> Option<OutputStream> {
        let stream = self.stdout.take();
        if stream.is_some() {
            self.streams_taken.fetch_add(1, Ordering::SeqCst);
        }
        stream
    }

    fn take_stderr(&mut self) -> Option<OutputStream> {
        let stream = self.stderr.take();
        if stream.is_some() {
            self.streams_taken.fetch_add(1, Ordering::SeqCst);
        }
        stream
    }

    fn kill(&mut self) -> HostResult<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Mock signal source that records registrations and delivers events on demand
#[derive(Default)]
pub struct MockSignalSource {
    registrations: Mutex<Vec<(TerminationEvent, StopHandler)>>,
}

impl MockSignalSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handlers registered for `event`, in registration order
    pub fn handlers(&self, event: TerminationEvent) -> Vec<StopHandler> {
        self.registrations
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| *e == event)
            .map(|(_, h)| h.clone())
            .collect()
    }

    /// Total number of registrations
    pub fn registration_count(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }

    /// Simulate `event` by running its handlers
    pub fn deliver(&self, event: TerminationEvent) {
        for handler in self.handlers(event) {
            handler();
        }
    }
}

impl SignalSource for MockSignalSource {
    fn register(&self, event: TerminationEvent, handler: StopHandler) {
        let mut registrations = self.registrations.lock().unwrap();
        let duplicate = registrations
            .iter()
            .any(|(e, h)| *e == event && Arc::ptr_eq(h, &handler));
        if !duplicate {
            registrations.push((event, handler));
        }
    }
}
