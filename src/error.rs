/*!
 * Error types for uplink
 */

use std::fmt;
use std::io;

use crate::control::ControlError;

pub type Result<T> = std::result::Result<T, UplinkError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug)]
pub enum UplinkError {
    /// Configuration error (bad config file, missing required value)
    Config(String),

    /// Control-channel error (credentials, endpoint, connect, handshake, transport)
    Control(ControlError),

    /// I/O error outside the control channel
    Io(io::Error),
}

impl UplinkError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        // Every failure is fatal to the invocation; there is no partial-success path.
        EXIT_FAILURE
    }
}

impl fmt::Display for UplinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UplinkError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            UplinkError::Control(err) => {
                write!(f, "{}", err)
            }
            UplinkError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
        }
    }
}

impl std::error::Error for UplinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UplinkError::Control(err) => Some(err),
            UplinkError::Io(err) => Some(err),
            UplinkError::Config(_) => None,
        }
    }
}

impl From<ControlError> for UplinkError {
    fn from(err: ControlError) -> Self {
        UplinkError::Control(err)
    }
}

impl From<io::Error> for UplinkError {
    fn from(err: io::Error) -> Self {
        UplinkError::Io(err)
    }
}
