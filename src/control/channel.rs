//! Secure channel establishment
//!
//! Opens the transport connection, drives the client-side handshake, and
//! verifies the peer's identity before any data flows.

use std::io::{self, Read, Write};
use std::net::TcpStream;

use rustls::pki_types::{CertificateDer, ServerName};
use rustls::{ClientConnection, StreamOwned};

use super::endpoint::Endpoint;
use super::error::{ControlError, ControlResult};
use super::trust::TrustContext;

/// An established, mutually-authenticated channel to the control service.
///
/// Lives for exactly one request/response exchange and is dropped
/// afterwards; dropping closes the underlying connection on every path.
pub struct SecureChannel {
    stream: StreamOwned<ClientConnection, TcpStream>,
}

impl SecureChannel {
    /// Connect to the endpoint and complete the TLS handshake.
    ///
    /// Blocks until the transport reports success or failure; no timeout
    /// is imposed at this layer. The handshake step is retried only while
    /// the transport signals would-block; any other failure aborts.
    pub fn establish(endpoint: &Endpoint, trust: &TrustContext) -> ControlResult<Self> {
        let mut sock =
            TcpStream::connect(endpoint.addr()).map_err(|source| ControlError::Connect {
                endpoint: endpoint.addr(),
                source,
            })?;

        let server_name = ServerName::IpAddress(endpoint.addr().ip().into());
        let mut conn = ClientConnection::new(trust.client_config(), server_name)
            .map_err(|e| ControlError::Handshake(format!("session setup: {}", e)))?;

        while conn.is_handshaking() {
            match conn.complete_io(&mut sock) {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => {
                    return Err(ControlError::Handshake(format!(
                        "negotiation with {} failed: {}",
                        endpoint, e
                    )));
                }
            }
        }

        // Chain verification against the trusted server certificate ran
        // inside the handshake; reaching this point means it passed. The
        // peer must additionally have presented a certificate of its own.
        ensure_peer_certificate(conn.peer_certificates())?;

        tracing::debug!(endpoint = %endpoint, "control channel established");

        Ok(Self {
            stream: StreamOwned::new(conn, sock),
        })
    }
}

impl Read for SecureChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for SecureChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// The peer must have presented at least one certificate. An absent or
/// empty peer chain is a distinct failure even when chain verification
/// raised no objection.
fn ensure_peer_certificate(certs: Option<&[CertificateDer<'_>]>) -> ControlResult<()> {
    match certs {
        Some(chain) if !chain.is_empty() => Ok(()),
        _ => Err(ControlError::Handshake(
            "server presented no certificate".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_certificate_present() {
        let cert = CertificateDer::from(vec![0x30, 0x82, 0x01]);
        let chain = [cert];
        assert!(ensure_peer_certificate(Some(&chain)).is_ok());
    }

    #[test]
    fn test_peer_certificate_absent() {
        let err = ensure_peer_certificate(None).unwrap_err();
        assert!(matches!(err, ControlError::Handshake(_)));
        assert!(err.to_string().contains("no certificate"));
    }

    #[test]
    fn test_peer_certificate_empty_chain() {
        let err = ensure_peer_certificate(Some(&[])).unwrap_err();
        assert!(matches!(err, ControlError::Handshake(_)));
    }
}
