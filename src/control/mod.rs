//! Secure control channel
//!
//! One invocation drives one channel through its whole life: resolve the
//! endpoint, build the trust context, establish the channel, exchange a
//! single command, tear down. Nothing is pooled or reused across
//! invocations.

pub mod channel;
pub mod endpoint;
pub mod error;
pub mod exchange;
pub mod trust;

pub use channel::SecureChannel;
pub use endpoint::Endpoint;
pub use error::{ControlError, ControlResult};
pub use exchange::{exchange, RESPONSE_CHUNK};
pub use trust::{init_crypto, CredentialPaths, TrustContext};

use std::io::Write;

use crate::config::ControlConfig;

/// Contact the control service, send one command, and stream the
/// response into `out`.
///
/// `server` overrides the configured endpoint (`addr` or `addr@port`
/// form). The payload is written verbatim; response bytes are forwarded
/// verbatim until the peer closes its side. The connection and all key
/// material are released when this returns, on success and failure alike.
pub fn run_command<W: Write>(
    config: &ControlConfig,
    server: Option<&str>,
    payload: &[u8],
    out: &mut W,
) -> ControlResult<()> {
    if !config.control_enable {
        tracing::warn!("control_enable is 'false' in the config file");
    }

    let endpoint = Endpoint::resolve(server, config)?;
    let trust = TrustContext::build(&CredentialPaths::from_config(config))?;
    let mut channel = SecureChannel::establish(&endpoint, &trust)?;
    exchange(&mut channel, payload, out)
}
