//! End-to-end tests of the selenium-launcher binary
//!
//! The installer command is a shell script standing in for
//! `selenium-standalone`: it records its PID and sleeps like a server.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_selenium-launcher");

const SERVER: &str = "echo $$ > server.pid.tmp && mv server.pid.tmp server.pid; exec sleep 60";

const WAIT_FOR_SERVER: &str = "while [ ! -f server.pid ]; do sleep 0.05; done";

fn write_config(dir: &Path, skip_install: bool, installer_script: &str) -> PathBuf {
    let path = dir.join("selenium-launcher.toml");
    let config = format!(
        r#"
config_version = 1

[launcher]
skip_selenium_install = {skip_install}

[installer]
command = ["sh", "-c", "{installer_script}", "sh"]

[[capabilities]]
browserName = "chrome"
port = 1234
"#
    );
    std::fs::write(&path, config).unwrap();
    path
}

fn launcher(dir: &Path, config: &Path, extra: &[&str], test_script: &str) -> Command {
    let mut cmd = Command::new(BIN);
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("SELENIUM_LAUNCHER_CONFIG")
        .arg("--config")
        .arg(config)
        .args(extra)
        .args(["--", "sh", "-c", test_script])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

fn server_pid(dir: &Path) -> i32 {
    std::fs::read_to_string(dir.join("server.pid"))
        .unwrap()
        .trim()
        .parse()
        .unwrap()
}

/// Whether `pid` is a live (non-zombie) process
fn is_alive(pid: i32) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit_once(')')
            .is_some_and(|(_, rest)| !rest.trim_start().starts_with('Z')),
        Err(_) => false,
    }
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(50));
    }
    condition()
}

fn wait_for_exit(child: &mut Child) -> ExitStatus {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("selenium-launcher did not exit");
        }
        sleep(Duration::from_millis(50));
    }
}

fn setup(skip_install: bool, installer_script: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), skip_install, installer_script);
    (dir, config)
}

#[test]
fn test_run_exports_capabilities_and_stops_server() {
    let (dir, config) = setup(true, SERVER);
    let script = format!(
        "{WAIT_FOR_SERVER}; printf '%s' \"$SELENIUM_CAPABILITIES\" > env.json; exit 3"
    );

    let status = launcher(dir.path(), &config, &["--capabilities-out", "caps.json"], &script)
        .status()
        .unwrap();

    // Test command status is the launcher's status
    assert_eq!(status.code(), Some(3));

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("caps.json")).unwrap())
            .unwrap();
    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("env.json")).unwrap())
            .unwrap();
    assert_eq!(written, exported);

    let capability = &written[0];
    assert_eq!(capability["protocol"], "http");
    assert_eq!(capability["hostname"], "localhost");
    assert_eq!(capability["port"], 4444);
    assert_eq!(capability["path"], "/wd/hub");
    assert_eq!(capability["browserName"], "chrome");

    // Outside watch mode the server is stopped when the run completes
    let pid = server_pid(dir.path());
    assert!(wait_until(Duration::from_secs(5), || !is_alive(pid)));
}

#[test]
fn test_prepare_failure_skips_test_command() {
    let (dir, config) = setup(false, "exit 1");

    let status = launcher(dir.path(), &config, &[], "touch ran")
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
    assert!(!dir.path().join("ran").exists());
}

#[test]
fn test_watch_mode_keeps_server_until_interrupt() {
    let (dir, config) = setup(true, SERVER);
    let script = format!("{WAIT_FOR_SERVER}; touch done");

    let mut child = launcher(dir.path(), &config, &["--watch"], &script)
        .spawn()
        .unwrap();

    assert!(wait_until(Duration::from_secs(10), || dir
        .path()
        .join("done")
        .exists()));
    sleep(Duration::from_millis(300));

    // The run finished but the server stays up
    let pid = server_pid(dir.path());
    assert!(child.try_wait().unwrap().is_none());
    assert!(is_alive(pid));

    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();

    assert_eq!(wait_for_exit(&mut child).code(), Some(130));
    assert!(wait_until(Duration::from_secs(5), || !is_alive(pid)));
}

#[test]
fn test_terminate_stops_server_outside_watch_mode() {
    let (dir, config) = setup(true, SERVER);
    let script = format!("{WAIT_FOR_SERVER}; touch started; sleep 5");

    let mut child = launcher(dir.path(), &config, &[], &script).spawn().unwrap();

    assert!(wait_until(Duration::from_secs(10), || dir
        .path()
        .join("started")
        .exists()));
    let pid = server_pid(dir.path());
    assert!(is_alive(pid));

    kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM).unwrap();

    assert_eq!(wait_for_exit(&mut child).code(), Some(143));
    assert!(wait_until(Duration::from_secs(5), || !is_alive(pid)));
}
