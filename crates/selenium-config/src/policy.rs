//! Validated configuration types

use selenium_api::{Capability, InstallArgs, RunArgs};
use std::path::PathBuf;
use tracing::warn;

use crate::schema::RawConfig;

/// Installer CLI used when the config names none
pub const DEFAULT_INSTALLER_COMMAND: &str = "selenium-standalone";

/// Validated configuration
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// Options owned by the supervisor
    pub options: LauncherOptions,

    /// Program and leading arguments of the installer CLI
    pub installer_command: Vec<String>,

    /// Capability entries handed to test sessions
    pub capabilities: Vec<Capability>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            options: LauncherOptions::default(),
            installer_command: vec![DEFAULT_INSTALLER_COMMAND.to_string()],
            capabilities: Vec::new(),
        }
    }
}

impl LauncherConfig {
    pub fn from_raw(raw: RawConfig) -> Self {
        for (index, cap) in raw.capabilities.iter().enumerate() {
            if cap.protocol.is_some() || cap.hostname.is_some() || cap.port.is_some() || cap.path.is_some() {
                warn!(
                    capability = index,
                    "Capability sets connection fields; they will be replaced by the local server endpoint"
                );
            }
        }

        let installer_command = raw
            .installer
            .command
            .unwrap_or_else(|| vec![DEFAULT_INSTALLER_COMMAND.to_string()]);

        Self {
            options: LauncherOptions {
                log_path: normalize_log_path(raw.launcher.log_path),
                skip_selenium_install: raw.launcher.skip_selenium_install.unwrap_or(false),
                install_args: raw.launcher.install_args,
                args: raw.launcher.args,
            },
            installer_command,
            capabilities: raw.capabilities,
        }
    }
}

/// Options consumed by the server supervisor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LauncherOptions {
    /// Directory of the server log file; no log file when `None`
    pub log_path: Option<PathBuf>,

    /// Start the server without running the installer first
    pub skip_selenium_install: bool,

    /// Options forwarded to the install call
    pub install_args: InstallArgs,

    /// Options forwarded to the start call
    pub args: RunArgs,
}

impl LauncherOptions {
    /// Set the log directory; an empty path disables logging
    pub fn with_log_path(mut self, log_path: Option<PathBuf>) -> Self {
        self.log_path = normalize_log_path(log_path);
        self
    }

    pub fn with_skip_install(mut self, skip: bool) -> Self {
        self.skip_selenium_install = skip;
        self
    }
}

/// An empty log path means "no log file"
fn normalize_log_path(path: Option<PathBuf>) -> Option<PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_log_path_is_absent() {
        let options = LauncherOptions::default().with_log_path(Some(PathBuf::new()));
        assert!(options.log_path.is_none());

        let options = LauncherOptions::default().with_log_path(Some(PathBuf::from("./")));
        assert_eq!(options.log_path, Some(PathBuf::from("./")));
    }

    #[test]
    fn default_config_uses_default_installer() {
        let config = LauncherConfig::default();
        assert_eq!(config.installer_command, vec![DEFAULT_INSTALLER_COMMAND.to_string()]);
        assert!(config.options.log_path.is_none());
    }

    #[test]
    fn skip_install_defaults_to_false() {
        let raw: RawConfig = toml::from_str("config_version = 1").unwrap();
        let config = LauncherConfig::from_raw(raw);
        assert!(!config.options.skip_selenium_install);
    }
}
