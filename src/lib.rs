/*!
 * Uplink - remote control client for the uplink service
 *
 * Contacts the service over a mutually-authenticated TLS channel,
 * sends one command, and streams the response back:
 * - Trust context built from three PEM credentials with fixed policy
 * - Endpoint resolution from `addr[@port]` overrides and config
 * - Blocking connect and handshake with peer-identity verification
 * - Single-shot request/response streamed to the caller
 */

pub mod config;
pub mod control;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{ControlConfig, LogLevel, DEFAULT_CONFIG_PATH};
pub use control::{run_command, ControlError, Endpoint, SecureChannel, TrustContext};
pub use error::{Result, UplinkError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
