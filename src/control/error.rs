//! Error types for the control channel

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Result type alias for control-channel operations
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur while contacting the control service.
///
/// Every variant is fatal to the invocation; the caller reports the
/// message and exits.
#[derive(Error, Debug)]
pub enum ControlError {
    /// Local key material is missing, unreadable, malformed, or mismatched
    #[error("credential error: {0}")]
    Credential(String),

    /// The control endpoint could not be parsed or resolved
    #[error("could not resolve control endpoint: {0}")]
    Address(String),

    /// The transport connection could not be opened
    #[error("could not connect to {endpoint}: {source}")]
    Connect {
        endpoint: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// TLS negotiation or trust validation failed
    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    /// Read or write failure on an established channel
    #[error("transport error: {0}")]
    Transport(String),
}
