/*!
 * Configuration types for uplink
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, UplinkError};

/// Config file consulted when no `-c` option is given
pub const DEFAULT_CONFIG_PATH: &str = "/etc/uplink/uplink.toml";

/// Main configuration for contacting the control service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Trusted server certificate (PEM), used to verify the service's identity
    #[serde(default = "default_server_cert_file")]
    pub server_cert_file: PathBuf,

    /// Client private key (PEM) for mutual authentication
    #[serde(default = "default_control_key_file")]
    pub control_key_file: PathBuf,

    /// Client certificate (PEM) for mutual authentication
    #[serde(default = "default_control_cert_file")]
    pub control_cert_file: PathBuf,

    /// Port used when the server address carries no explicit port
    #[serde(default = "default_control_port")]
    pub control_port: u16,

    /// Control interface addresses the service listens on; the first entry
    /// is the default endpoint when no server override is given
    #[serde(default)]
    pub control_interfaces: Vec<String>,

    /// Whether remote control is enabled on the service side. Advisory:
    /// `false` logs a warning but never blocks the attempt.
    #[serde(default = "default_true")]
    pub control_enable: bool,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            server_cert_file: default_server_cert_file(),
            control_key_file: default_control_key_file(),
            control_cert_file: default_control_cert_file(),
            control_port: default_control_port(),
            control_interfaces: Vec::new(),
            control_enable: true,
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_server_cert_file() -> PathBuf {
    PathBuf::from("/etc/uplink/uplink_server.pem")
}

fn default_control_key_file() -> PathBuf {
    PathBuf::from("/etc/uplink/uplink_control.key")
}

fn default_control_cert_file() -> PathBuf {
    PathBuf::from("/etc/uplink/uplink_control.pem")
}

fn default_control_port() -> u16 {
    8953
}

impl ControlConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            UplinkError::Config(format!("could not read {}: {}", path.display(), e))
        })?;
        let config: ControlConfig = toml::from_str(&contents).map_err(|e| {
            UplinkError::Config(format!("could not parse {}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    /// Load the configuration the command line points at.
    ///
    /// An explicitly-given file must exist and parse. The default path is
    /// optional: if nothing is there, built-in defaults apply.
    pub fn load(path: &Path, explicit: bool) -> Result<Self> {
        if !explicit && !path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(path)
    }
}
