//! Installer/runner backed by the `selenium-standalone` CLI

use async_trait::async_trait;
use selenium_api::{DriverSpec, InstallArgs, RunArgs};
use selenium_host_api::{HostError, HostResult, Installer, ServerProcess};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::process::ManagedServer;

/// Drives an installer CLI with `install` and `start` subcommands
///
/// Options are rendered as `--key=value` flags, nested keys joined with
/// dots (`--drivers.chrome.version=2.38`).
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    command: Vec<String>,
}

impl CommandInstaller {
    /// `command` is the program followed by any leading arguments,
    /// e.g. `["npx", "selenium-standalone"]`
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    fn argv(&self, subcommand: &str, flags: Vec<String>) -> Vec<String> {
        let mut argv = self.command.clone();
        argv.push(subcommand.to_string());
        argv.extend(flags);
        argv
    }
}

#[async_trait]
impl Installer for CommandInstaller {
    async fn install(&self, args: &InstallArgs) -> HostResult<()> {
        let argv = self.argv("install", install_flags(args));
        let Some((program, rest)) = argv.split_first() else {
            return Err(HostError::InstallFailed("Empty installer command".into()));
        };

        info!(command = %argv.join(" "), "Installing Selenium server and drivers");

        let output = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| HostError::InstallFailed(format!("Failed to run {}: {}", program, e)))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(target: "selenium_install", "{}", line);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or("").trim();
            return Err(HostError::InstallFailed(format!(
                "{} install exited with {}: {}",
                program, output.status, detail
            )));
        }

        info!("Selenium install finished");
        Ok(())
    }

    async fn start(&self, args: &RunArgs) -> HostResult<Box<dyn ServerProcess>> {
        let argv = self.argv("start", start_flags(args));
        info!(command = %argv.join(" "), "Starting Selenium server");

        let server = ManagedServer::spawn(&argv)?;
        info!(pid = server.pid, "Selenium server started");

        Ok(Box::new(server))
    }
}

/// Flags for `<installer> install`
pub fn install_flags(args: &InstallArgs) -> Vec<String> {
    let mut flags = Vec::new();

    push_opt(&mut flags, "version", args.version.as_deref());
    push_opt(&mut flags, "baseURL", args.base_url.as_deref());
    push_drivers(&mut flags, &args.drivers);
    push_map(&mut flags, "", &args.extra);

    flags
}

/// Flags for `<installer> start`; Selenium arguments follow `--`
pub fn start_flags(args: &RunArgs) -> Vec<String> {
    let mut flags = Vec::new();

    push_opt(&mut flags, "version", args.version.as_deref());
    push_drivers(&mut flags, &args.drivers);
    for java_arg in &args.java_args {
        flags.push(format!("--javaArgs={}", java_arg));
    }
    push_map(&mut flags, "", &args.extra);

    if !args.selenium_args.is_empty() {
        flags.push("--".to_string());
        flags.extend(args.selenium_args.iter().cloned());
    }

    flags
}

fn push_opt(flags: &mut Vec<String>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        flags.push(format!("--{}={}", key, value));
    }
}

fn push_drivers(flags: &mut Vec<String>, drivers: &BTreeMap<String, DriverSpec>) {
    for (name, spec) in drivers {
        let prefix = format!("drivers.{}", name);
        push_opt(flags, &format!("{}.version", prefix), spec.version.as_deref());
        push_opt(flags, &format!("{}.arch", prefix), spec.arch.as_deref());
        push_opt(flags, &format!("{}.baseURL", prefix), spec.base_url.as_deref());
        push_map(flags, &prefix, &spec.extra);
    }
}

fn push_map(flags: &mut Vec<String>, prefix: &str, map: &Map<String, Value>) {
    for (key, value) in map {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        push_value(flags, &key, value);
    }
}

fn push_value(flags: &mut Vec<String>, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => flags.push(format!("--{}={}", key, s)),
        Value::Bool(_) | Value::Number(_) => flags.push(format!("--{}={}", key, value)),
        Value::Array(items) => {
            for item in items {
                push_value(flags, key, item);
            }
        }
        Value::Object(map) => push_map(flags, key, map),
    }
}
