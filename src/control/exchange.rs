//! Single-shot command/response exchange
//!
//! Writes the command payload once, then forwards response bytes to the
//! caller as they arrive until the peer closes its side.

use std::io::{Read, Write};

use super::error::{ControlError, ControlResult};

/// Response bytes are forwarded in chunks of up to this size.
pub const RESPONSE_CHUNK: usize = 1024;

/// Send the command and stream the response.
///
/// The payload goes out in a single write; a short write is fatal and is
/// not resumed. Response bytes are forwarded chunk by chunk as they
/// arrive until the peer's orderly close, which ends the exchange
/// successfully (an immediate close yields an empty response). Any other
/// read failure is fatal. The channel is never written to again once
/// reading has started, and it is discarded after the exchange.
pub fn exchange<C, W>(channel: &mut C, payload: &[u8], out: &mut W) -> ControlResult<()>
where
    C: Read + Write,
    W: Write,
{
    let written = channel
        .write(payload)
        .map_err(|e| ControlError::Transport(format!("could not send command: {}", e)))?;
    if written < payload.len() {
        return Err(ControlError::Transport(format!(
            "short write sending command: {} of {} bytes",
            written,
            payload.len()
        )));
    }
    channel
        .flush()
        .map_err(|e| ControlError::Transport(format!("could not send command: {}", e)))?;

    let mut buf = [0u8; RESPONSE_CHUNK];
    loop {
        match channel.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                out.write_all(&buf[..n]).map_err(|e| {
                    ControlError::Transport(format!("could not write response: {}", e))
                })?;
                out.flush().map_err(|e| {
                    ControlError::Transport(format!("could not write response: {}", e))
                })?;
            }
            Err(e) => {
                return Err(ControlError::Transport(format!(
                    "could not read response: {}",
                    e
                )));
            }
        }
    }

    Ok(())
}
