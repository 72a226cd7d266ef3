//! Server process management

use nix::sys::signal::{self, Signal};
use nix::unistd::{setpgid, Pid};
use selenium_host_api::{HostError, HostResult, OutputStream, ServerProcess};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

/// Selenium server running in its own process group
///
/// The installer CLI forks the JVM, so termination targets the group
/// rather than the direct child. The server stays in the launcher's
/// session; the launcher is responsible for stopping it on termination.
pub struct ManagedServer {
    child: Child,
    pub pid: u32,
    pub pgid: u32,
}

impl ManagedServer {
    /// Spawn `argv` as the leader of a new process group with piped output
    pub fn spawn(argv: &[String]) -> HostResult<Self> {
        let Some((program, args)) = argv.split_first() else {
            return Err(HostError::SpawnFailed("Empty argv".into()));
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // SAFETY: setpgid() is async-signal-safe and the closure neither
        // allocates nor takes locks.
        unsafe {
            cmd.pre_exec(|| {
                setpgid(Pid::from_raw(0), Pid::from_raw(0)).map_err(std::io::Error::from)?;
                Ok(())
            });
        }

        let child = cmd.spawn().map_err(|e| {
            HostError::SpawnFailed(format!("Failed to spawn {}: {}", program, e))
        })?;

        let pid = child
            .id()
            .ok_or_else(|| HostError::SpawnFailed(format!("{} exited during spawn", program)))?;
        let pgid = pid; // After setpgid(0, 0), pid == pgid

        debug!(pid = pid, pgid = pgid, program = %program, "Server process spawned");

        Ok(Self { child, pid, pgid })
    }

    /// Send `sig` to the process group
    fn signal_group(&self, sig: Signal) -> HostResult<()> {
        let pgid = Pid::from_raw(-(self.pgid as i32)); // Negative for process group

        match signal::kill(pgid, sig) {
            Ok(()) => {
                debug!(pgid = self.pgid, signal = ?sig, "Signalled server process group");
                Ok(())
            }
            Err(nix::errno::Errno::ESRCH) => {
                // Process already gone
                Ok(())
            }
            Err(e) => Err(HostError::StopFailed(format!(
                "Failed to send {:?}: {}",
                sig, e
            ))),
        }
    }
}

impl ServerProcess for ManagedServer {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn take_stdout(&mut self) -> Option<OutputStream> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as OutputStream)
    }

    fn take_stderr(&mut self) -> Option<OutputStream> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as OutputStream)
    }

    fn kill(&mut self) -> HostResult<()> {
        self.signal_group(Signal::SIGKILL)
    }
}
