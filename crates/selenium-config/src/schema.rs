//! Raw configuration schema (as parsed from TOML)

use selenium_api::{Capability, InstallArgs, RunArgs};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Supervisor settings
    #[serde(default)]
    pub launcher: RawLauncherConfig,

    /// External installer/runner settings
    #[serde(default)]
    pub installer: RawInstallerConfig,

    /// Capability entries handed to test sessions
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

/// Supervisor settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLauncherConfig {
    /// Directory of the server log file; no log file when absent
    pub log_path: Option<PathBuf>,

    /// Start the server without running the installer first
    pub skip_selenium_install: Option<bool>,

    /// Options forwarded to the install call
    #[serde(default)]
    pub install_args: InstallArgs,

    /// Options forwarded to the start call
    #[serde(default)]
    pub args: RunArgs,
}

/// External installer/runner settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawInstallerConfig {
    /// Program and leading arguments of the installer CLI
    /// (default: `["selenium-standalone"]`)
    pub command: Option<Vec<String>>,
}
