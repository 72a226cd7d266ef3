//! Selenium server supervisor

use selenium_api::{Capability, InstallArgs, RunArgs, RunFlags, TerminationEvent};
use selenium_config::LauncherOptions;
use selenium_host_api::{Installer, OutputStream, ServerProcess, SignalSource, StopHandler};
use selenium_util::{log_file_path, working_dir};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{LauncherError, LauncherResult, LauncherState, LogFile, LogPipe};

/// Server handle and lifecycle state, shared with the stop handler
#[derive(Default)]
struct ServerSlot {
    process: Option<Box<dyn ServerProcess>>,
    state: LauncherState,
}

type SharedSlot = Arc<Mutex<ServerSlot>>;

/// Supervises one Selenium Standalone server around a test run
///
/// ```text
/// on_prepare: defaults capabilities, installs, starts, redirects logs
/// on_complete: kills the server (no-op when none was started)
/// ```
///
/// In watch mode the same stop handler is also registered for host
/// interrupt, exit and panic events. Completion does not look at watch mode:
/// callers that keep the server across runs simply do not call it.
pub struct SeleniumLauncher {
    options: LauncherOptions,
    installer: Arc<dyn Installer>,
    signals: Arc<dyn SignalSource>,
    working_dir: Option<PathBuf>,
    watch_mode: bool,
    slot: SharedSlot,
    stop_handler: StopHandler,
    handlers_registered: bool,
    log_pipe: Option<LogPipe>,
}

impl SeleniumLauncher {
    pub fn new(
        options: LauncherOptions,
        installer: Arc<dyn Installer>,
        signals: Arc<dyn SignalSource>,
    ) -> Self {
        let slot: SharedSlot = Arc::new(Mutex::new(ServerSlot::default()));
        let stop_slot = slot.clone();
        let stop_handler: StopHandler = Arc::new(move || stop_server(&stop_slot));

        Self {
            options,
            installer,
            signals,
            working_dir: None,
            watch_mode: false,
            slot,
            stop_handler,
            handlers_registered: false,
            log_pipe: None,
        }
    }

    /// Resolve the log file against `dir` instead of the process working directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.options.log_path.as_deref()
    }

    pub fn install_args(&self) -> &InstallArgs {
        &self.options.install_args
    }

    pub fn args(&self) -> &RunArgs {
        &self.options.args
    }

    pub fn skip_selenium_install(&self) -> bool {
        self.options.skip_selenium_install
    }

    pub fn watch_mode(&self) -> bool {
        self.watch_mode
    }

    pub fn state(&self) -> LauncherState {
        self.lock_slot().state
    }

    /// Whether a server process is held
    pub fn is_running(&self) -> bool {
        self.lock_slot().process.is_some()
    }

    /// PID of the held server process
    pub fn pid(&self) -> Option<u32> {
        self.lock_slot().process.as_ref().and_then(|p| p.pid())
    }

    /// Log file receiving server output, once redirection is set up
    pub fn log_file(&self) -> Option<&Path> {
        self.log_pipe.as_ref().and_then(LogPipe::path)
    }

    /// The stop callable registered for termination events.
    ///
    /// Always the same `Arc` for this launcher; calling it is equivalent to
    /// [`on_complete`](Self::on_complete).
    pub fn stop_handler(&self) -> StopHandler {
        self.stop_handler.clone()
    }

    /// Prepare the test run: point `capabilities` at the local server,
    /// install (unless skipped), start the server, redirect its output and,
    /// in watch mode, register the stop handler.
    pub async fn on_prepare(
        &mut self,
        capabilities: &mut [Capability],
        flags: RunFlags,
    ) -> LauncherResult<()> {
        if self.is_running() {
            return Err(LauncherError::AlreadyRunning);
        }

        self.watch_mode = flags.watch;

        for capability in capabilities.iter_mut() {
            *capability = capability.with_local_endpoint();
        }
        debug!(count = capabilities.len(), "Capabilities pointed at local Selenium server");

        if !self.options.skip_selenium_install {
            self.set_state(LauncherState::Installing);
            if let Err(e) = self.installer.install(&self.options.install_args).await {
                self.set_state(LauncherState::Idle);
                return Err(LauncherError::InstallFailure(e));
            }
        } else {
            debug!("Selenium install skipped");
        }

        self.set_state(LauncherState::Starting);
        let process = match self.installer.start(&self.options.args).await {
            Ok(process) => process,
            Err(e) => {
                self.set_state(LauncherState::Idle);
                return Err(LauncherError::StartFailure(e));
            }
        };

        let pid = process.pid();
        {
            let mut slot = self.lock_slot();
            slot.process = Some(process);
            slot.state = LauncherState::Started;
        }
        info!(pid = ?pid, watch = self.watch_mode, "Selenium server started");

        if self.options.log_path.is_some() {
            self.redirect_log_stream().await?;
        } else {
            self.discard_output();
        }

        if self.watch_mode {
            self.register_stop_handlers();
        }

        self.set_state(LauncherState::Running);
        Ok(())
    }

    /// Stop the server if one was started. Never fails.
    pub fn on_complete(&mut self) {
        stop_server(&self.slot);
    }

    /// [`on_complete`](Self::on_complete), then wait up to `flush_timeout`
    /// for the server output to reach the log file
    pub async fn shutdown(&mut self, flush_timeout: Duration) {
        self.on_complete();

        let Some(pipe) = self.log_pipe.take() else {
            return;
        };

        let path = pipe.path().map(Path::to_path_buf);
        match tokio::time::timeout(flush_timeout, pipe.finish()).await {
            Ok(Ok(bytes)) => debug!(path = ?path, bytes, "Server output drained"),
            Ok(Err(e)) => warn!(path = ?path, error = %e, "Server output drain failed"),
            Err(_) => warn!(path = ?path, "Timed out waiting for server output to drain"),
        }
    }

    /// Pipe the server's stdout and stderr into
    /// `<working dir>/<log path>/wdio-selenium-standalone.log`.
    ///
    /// Returns once the file is open and the copies are running.
    pub async fn redirect_log_stream(&mut self) -> LauncherResult<PathBuf> {
        let cwd = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => working_dir().map_err(|source| LauncherError::RedirectionFailure {
                path: PathBuf::from("."),
                source,
            })?,
        };
        let log_dir = self
            .options
            .log_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let path = log_file_path(&cwd, &log_dir);

        {
            let mut slot = self.lock_slot();
            if slot.process.is_none() {
                return Err(LauncherError::NotRunning);
            }
            slot.state = LauncherState::RedirectingLogs;
        }

        // The streams stay with the server until the file is open, so a
        // failure here leaves its pipes intact
        let file = match LogFile::open(&path).await {
            Ok(file) => file,
            Err(source) => {
                self.set_state(LauncherState::Started);
                return Err(LauncherError::RedirectionFailure { path, source });
            }
        };

        let (stdout, stderr) = self.take_output();
        if stdout.is_none() && stderr.is_none() {
            warn!("Server output streams already taken, log file will stay empty");
        }

        info!(path = %path.display(), "Selenium server output redirected");
        self.log_pipe = Some(file.pipe(stdout, stderr));
        Ok(path)
    }

    /// Keep reading server output nobody asked to log
    fn discard_output(&mut self) {
        let (stdout, stderr) = self.take_output();
        let streams: Vec<_> = [stdout, stderr].into_iter().flatten().collect();
        debug!(streams = streams.len(), "Server output discarded");
        self.log_pipe = Some(LogPipe::discard(streams));
    }

    fn take_output(&self) -> (Option<OutputStream>, Option<OutputStream>) {
        let mut slot = self.lock_slot();
        match slot.process.as_mut() {
            Some(process) => (process.take_stdout(), process.take_stderr()),
            None => (None, None),
        }
    }

    fn register_stop_handlers(&mut self) {
        if self.handlers_registered {
            return;
        }

        for event in TerminationEvent::ALL {
            self.signals.register(event, self.stop_handler.clone());
        }
        self.handlers_registered = true;

        debug!("Stop handler registered for termination events");
    }

    fn set_state(&self, state: LauncherState) {
        self.lock_slot().state = state;
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, ServerSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Kill and release the held server, if any
fn stop_server(slot: &Mutex<ServerSlot>) {
    let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(mut process) = slot.process.take() else {
        return;
    };

    info!(pid = ?process.pid(), "Shutting down Selenium server");
    if let Err(e) = process.kill() {
        warn!(error = %e, "Failed to kill Selenium server");
    }
    slot.state = LauncherState::Stopped;
}

#[cfg(test)]
mod tests {
    use super::*;
    use selenium_api::DriverSpec;
    use selenium_host_api::{InstallerCall, MockInstaller, MockSignalSource};
    use selenium_util::DEFAULT_LOG_FILENAME;

    struct Fixture {
        installer: Arc<MockInstaller>,
        signals: Arc<MockSignalSource>,
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                installer: Arc::new(MockInstaller::new()),
                signals: Arc::new(MockSignalSource::new()),
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn launcher(&self, options: LauncherOptions) -> SeleniumLauncher {
            SeleniumLauncher::new(options, self.installer.clone(), self.signals.clone())
                .with_working_dir(self.dir.path())
        }

        fn log_file(&self) -> PathBuf {
            self.dir.path().join(DEFAULT_LOG_FILENAME)
        }
    }

    fn chrome_install_args() -> InstallArgs {
        let mut drivers = std::collections::BTreeMap::new();
        drivers.insert(
            "chrome".to_string(),
            DriverSpec {
                version: Some("2.38".into()),
                arch: Some("x64".into()),
                base_url: Some("https://chromedriver.storage.googleapis.com".into()),
                ..Default::default()
            },
        );
        InstallArgs {
            version: Some("3.9.1".into()),
            base_url: Some("https://selenium-release.storage.googleapis.com".into()),
            drivers,
            ..Default::default()
        }
    }

    fn chrome_run_args() -> RunArgs {
        let mut drivers = std::collections::BTreeMap::new();
        drivers.insert(
            "chrome".to_string(),
            DriverSpec {
                version: Some("2.38".into()),
                ..Default::default()
            },
        );
        RunArgs {
            version: Some("3.9.1".into()),
            drivers,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn prepare_sets_config_properties() {
        let fx = Fixture::new();
        let options = LauncherOptions {
            log_path: Some(PathBuf::from("./")),
            install_args: chrome_install_args(),
            args: chrome_run_args(),
            ..Default::default()
        };
        let mut launcher = fx.launcher(options.clone());
        let mut capabilities = vec![Capability {
            port: Some(1234),
            ..Default::default()
        }];

        launcher
            .on_prepare(&mut capabilities, RunFlags { watch: true })
            .await
            .unwrap();

        assert_eq!(launcher.log_path(), Some(Path::new("./")));
        assert_eq!(launcher.install_args(), &options.install_args);
        assert_eq!(launcher.args(), &options.args);
        assert!(!launcher.skip_selenium_install());
        assert!(launcher.watch_mode());

        let cap = &capabilities[0];
        assert_eq!(cap.protocol.as_deref(), Some("http"));
        assert_eq!(cap.hostname.as_deref(), Some("localhost"));
        assert_eq!(cap.port, Some(4444));
        assert_eq!(cap.path.as_deref(), Some("/wd/hub"));
    }

    #[tokio::test]
    async fn prepare_overwrites_every_capability() {
        let fx = Fixture::new();
        let mut launcher = fx.launcher(LauncherOptions::default());
        let mut capabilities = vec![
            Capability {
                protocol: Some("https".into()),
                hostname: Some("grid.example.com".into()),
                port: Some(443),
                path: Some("/".into()),
                ..Default::default()
            },
            Capability::default(),
            Capability::default(),
        ];

        launcher
            .on_prepare(&mut capabilities, RunFlags::default())
            .await
            .unwrap();

        assert_eq!(capabilities.len(), 3);
        assert!(capabilities.iter().all(Capability::targets_local_endpoint));
    }

    #[tokio::test]
    async fn prepare_installs_then_starts() {
        let fx = Fixture::new();
        let options = LauncherOptions {
            log_path: Some(PathBuf::from("./")),
            install_args: chrome_install_args(),
            args: chrome_run_args(),
            ..Default::default()
        };
        let mut launcher = fx.launcher(options.clone());

        launcher.on_prepare(&mut [], RunFlags::default()).await.unwrap();

        assert_eq!(
            fx.installer.calls(),
            vec![
                InstallerCall::Install(options.install_args.clone()),
                InstallerCall::Start(options.args.clone()),
            ]
        );
        assert_eq!(launcher.log_file(), Some(fx.log_file().as_path()));
        assert_eq!(launcher.state(), LauncherState::Running);
    }

    #[tokio::test]
    async fn prepare_skips_install() {
        let fx = Fixture::new();
        let options = LauncherOptions {
            log_path: Some(PathBuf::from("./")),
            skip_selenium_install: true,
            args: chrome_run_args(),
            ..Default::default()
        };
        let mut launcher = fx.launcher(options.clone());

        launcher.on_prepare(&mut [], RunFlags::default()).await.unwrap();

        assert!(fx.installer.install_calls().is_empty());
        assert_eq!(fx.installer.start_calls(), vec![options.args]);
        assert!(launcher.log_file().is_some());
    }

    #[tokio::test]
    async fn prepare_without_log_path_writes_no_file() {
        let fx = Fixture::new();
        let mut launcher = fx.launcher(LauncherOptions::default());

        launcher.on_prepare(&mut [], RunFlags::default()).await.unwrap();

        assert!(launcher.log_file().is_none());
        assert!(!fx.log_file().exists());
    }

    #[tokio::test]
    async fn prepare_without_log_path_drains_output() {
        let fx = Fixture::new();
        fx.installer.stdout.lock().unwrap().extend(vec![b'x'; 200_000]);
        fx.installer.stderr.lock().unwrap().extend_from_slice(b"warning\n");
        let mut launcher = fx.launcher(LauncherOptions::default());

        launcher.on_prepare(&mut [], RunFlags::default()).await.unwrap();
        assert_eq!(fx.installer.streams_taken(), 2);

        launcher.shutdown(Duration::from_secs(5)).await;
        assert_eq!(fx.installer.kill_count(), 1);
        assert!(!fx.log_file().exists());
        assert_eq!(std::fs::read_dir(fx.dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn redirect_writes_stdout_and_stderr_to_log_file() {
        let fx = Fixture::new();
        fx.installer.stdout.lock().unwrap().extend_from_slice(b"Selenium Server is up\n");
        fx.installer.stderr.lock().unwrap().extend_from_slice(b"INFO - Launching\n");
        std::fs::write(fx.log_file(), "previous run\n").unwrap();

        let options = LauncherOptions::default().with_log_path(Some(PathBuf::from("./")));
        let mut launcher = fx.launcher(options);

        launcher.on_prepare(&mut [], RunFlags::default()).await.unwrap();
        assert_eq!(fx.installer.streams_taken(), 2);

        launcher.shutdown(Duration::from_secs(5)).await;

        let content = std::fs::read_to_string(fx.log_file()).unwrap();
        assert!(content.starts_with("previous run\n"));
        assert!(content.contains("Selenium Server is up\n"));
        assert!(content.contains("INFO - Launching\n"));
        assert_eq!(fx.installer.kill_count(), 1);
    }

    #[tokio::test]
    async fn watch_mode_registers_one_stable_handler_per_event() {
        let fx = Fixture::new();
        let mut launcher = fx.launcher(LauncherOptions::default());

        launcher
            .on_prepare(&mut [], RunFlags { watch: true })
            .await
            .unwrap();

        let handler = launcher.stop_handler();
        for event in TerminationEvent::ALL {
            let registered = fx.signals.handlers(event);
            assert_eq!(registered.len(), 1, "{event}");
            assert!(Arc::ptr_eq(&registered[0], &handler));
        }

        // A second run in the same host process adds nothing
        launcher.on_complete();
        launcher
            .on_prepare(&mut [], RunFlags { watch: true })
            .await
            .unwrap();
        assert_eq!(fx.signals.registration_count(), 3);
    }

    #[tokio::test]
    async fn no_handlers_outside_watch_mode() {
        let fx = Fixture::new();
        let mut launcher = fx.launcher(LauncherOptions::default());

        launcher.on_prepare(&mut [], RunFlags::default()).await.unwrap();

        assert_eq!(fx.signals.registration_count(), 0);
    }

    #[tokio::test]
    async fn interrupt_stops_server() {
        let fx = Fixture::new();
        let mut launcher = fx.launcher(LauncherOptions::default());
        launcher
            .on_prepare(&mut [], RunFlags { watch: true })
            .await
            .unwrap();

        fx.signals.deliver(TerminationEvent::Interrupt);
        assert_eq!(fx.installer.kill_count(), 1);
        assert_eq!(launcher.state(), LauncherState::Stopped);

        // Exit after the interrupt finds nothing left to kill
        fx.signals.deliver(TerminationEvent::Exit);
        launcher.on_complete();
        assert_eq!(fx.installer.kill_count(), 1);
    }

    #[tokio::test]
    async fn complete_kills_once() {
        let fx = Fixture::new();
        let mut launcher = fx.launcher(LauncherOptions::default());
        launcher.on_prepare(&mut [], RunFlags::default()).await.unwrap();
        assert!(launcher.is_running());
        assert!(launcher.pid().is_some());

        launcher.on_complete();
        launcher.on_complete();

        assert_eq!(fx.installer.kill_count(), 1);
        assert!(!launcher.is_running());
        assert_eq!(launcher.state(), LauncherState::Stopped);
    }

    #[tokio::test]
    async fn complete_without_prepare_is_noop() {
        let fx = Fixture::new();
        let mut launcher = fx.launcher(LauncherOptions::default());

        launcher.on_complete();

        assert!(!launcher.is_running());
        assert_eq!(fx.installer.kill_count(), 0);
        assert_eq!(launcher.state(), LauncherState::Idle);
    }

    #[tokio::test]
    async fn complete_in_watch_mode_still_kills() {
        let fx = Fixture::new();
        let mut launcher = fx.launcher(LauncherOptions::default());
        launcher
            .on_prepare(&mut [], RunFlags { watch: true })
            .await
            .unwrap();

        launcher.on_complete();

        assert_eq!(fx.installer.kill_count(), 1);
    }

    #[tokio::test]
    async fn install_failure_starts_nothing() {
        let fx = Fixture::new();
        *fx.installer.fail_install.lock().unwrap() = true;
        let mut launcher = fx.launcher(LauncherOptions::default());

        let result = launcher.on_prepare(&mut [], RunFlags { watch: true }).await;

        assert!(matches!(result, Err(LauncherError::InstallFailure(_))));
        assert!(fx.installer.start_calls().is_empty());
        assert!(!launcher.is_running());
        assert_eq!(launcher.state(), LauncherState::Idle);
        assert_eq!(fx.signals.registration_count(), 0);

        launcher.on_complete();
        assert_eq!(fx.installer.kill_count(), 0);
    }

    #[tokio::test]
    async fn start_failure_is_fatal() {
        let fx = Fixture::new();
        *fx.installer.fail_start.lock().unwrap() = true;
        let mut launcher = fx.launcher(LauncherOptions::default().with_skip_install(true));

        let result = launcher.on_prepare(&mut [], RunFlags::default()).await;

        assert!(matches!(result, Err(LauncherError::StartFailure(_))));
        assert!(!launcher.is_running());
        launcher.on_complete();
        assert_eq!(fx.installer.kill_count(), 0);
    }

    #[tokio::test]
    async fn redirection_failure_keeps_server_for_completion() {
        let fx = Fixture::new();
        std::fs::write(fx.dir.path().join("blocker"), "").unwrap();
        let options = LauncherOptions::default().with_log_path(Some(PathBuf::from("blocker")));
        let mut launcher = fx.launcher(options);

        let result = launcher.on_prepare(&mut [], RunFlags::default()).await;

        assert!(matches!(result, Err(LauncherError::RedirectionFailure { .. })));
        assert!(launcher.is_running());
        assert_eq!(launcher.state(), LauncherState::Started);

        // Output streams stay with the server
        assert_eq!(fx.installer.streams_taken(), 0);
        assert!(launcher.log_file().is_none());

        launcher.on_complete();
        assert_eq!(fx.installer.kill_count(), 1);
    }

    #[tokio::test]
    async fn prepare_twice_without_completion_is_rejected() {
        let fx = Fixture::new();
        let mut launcher = fx.launcher(LauncherOptions::default());
        launcher.on_prepare(&mut [], RunFlags::default()).await.unwrap();

        let result = launcher.on_prepare(&mut [], RunFlags::default()).await;

        assert!(matches!(result, Err(LauncherError::AlreadyRunning)));
        assert_eq!(fx.installer.start_calls().len(), 1);
    }

    #[tokio::test]
    async fn redirect_requires_running_server() {
        let fx = Fixture::new();
        let mut launcher = fx.launcher(LauncherOptions::default());

        let result = launcher.redirect_log_stream().await;

        assert!(matches!(result, Err(LauncherError::NotRunning)));
    }
}
