//! Default paths for selenium-launcher components
//!
//! - Config: `$SELENIUM_LAUNCHER_CONFIG` or `./selenium-launcher.toml`
//! - Server log: `<cwd>/<log dir>/wdio-selenium-standalone.log`

use std::io;
use std::path::{Path, PathBuf};

/// Environment variable for overriding the config file path
pub const SELENIUM_CONFIG_ENV: &str = "SELENIUM_LAUNCHER_CONFIG";

/// File name of the server log written when log redirection is enabled
pub const DEFAULT_LOG_FILENAME: &str = "wdio-selenium-standalone.log";

/// Config filename looked up in the working directory
const CONFIG_FILENAME: &str = "selenium-launcher.toml";

/// Get the default config path.
///
/// Order of precedence:
/// 1. `$SELENIUM_LAUNCHER_CONFIG` environment variable (if set)
/// 2. `./selenium-launcher.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(SELENIUM_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    PathBuf::from(CONFIG_FILENAME)
}

/// Resolve the server log file for a configured log directory.
///
/// Relative directories are taken from `cwd`; absolute ones are used as-is.
/// `log_file_path(cwd, "./")` is `<cwd>/wdio-selenium-standalone.log`.
pub fn log_file_path(cwd: &Path, log_dir: &Path) -> PathBuf {
    cwd.join(log_dir).join(DEFAULT_LOG_FILENAME)
}

/// Resolve the current working directory
pub fn working_dir() -> io::Result<PathBuf> {
    std::env::current_dir()
}
