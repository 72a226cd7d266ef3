//! Shared types for the selenium-launcher API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Protocol every test session uses to reach the local server
pub const DEFAULT_PROTOCOL: &str = "http";

/// Host the local server listens on
pub const DEFAULT_HOSTNAME: &str = "localhost";

/// Port the local server listens on
pub const DEFAULT_PORT: u16 = 4444;

/// WebDriver endpoint path of the local server
pub const DEFAULT_PATH: &str = "/wd/hub";

/// Connection target consumed by downstream test sessions
///
/// Only the four connection fields are interpreted here; every other key
/// (`browserName`, vendor options, ...) is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Remaining capability keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Capability {
    /// Copy of this capability pointed at the local server.
    ///
    /// Existing connection fields are overwritten, not merged.
    pub fn with_local_endpoint(&self) -> Self {
        Self {
            protocol: Some(DEFAULT_PROTOCOL.to_string()),
            hostname: Some(DEFAULT_HOSTNAME.to_string()),
            port: Some(DEFAULT_PORT),
            path: Some(DEFAULT_PATH.to_string()),
            extra: self.extra.clone(),
        }
    }

    /// Whether this capability targets the local server
    pub fn targets_local_endpoint(&self) -> bool {
        self.protocol.as_deref() == Some(DEFAULT_PROTOCOL)
            && self.hostname.as_deref() == Some(DEFAULT_HOSTNAME)
            && self.port == Some(DEFAULT_PORT)
            && self.path.as_deref() == Some(DEFAULT_PATH)
    }
}

/// Browser driver selection for install and start
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,

    /// Download mirror for the driver binary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Options forwarded verbatim to the installer's install call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallArgs {
    /// Selenium server version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Download mirror for the server jar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Drivers to download, keyed by browser name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub drivers: BTreeMap<String, DriverSpec>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Options forwarded verbatim to the installer's start call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunArgs {
    /// Selenium server version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Drivers to put on the server's path, keyed by browser name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub drivers: BTreeMap<String, DriverSpec>,

    /// Extra JVM arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub java_args: Vec<String>,

    /// Extra arguments for the Selenium server itself
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selenium_args: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Flags describing the current test run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFlags {
    /// The host process stays alive across several runs
    #[serde(default)]
    pub watch: bool,
}
