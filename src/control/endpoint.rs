//! Control endpoint resolution
//!
//! Turns an optional `addr[@port]` override plus the configured fallbacks
//! into exactly one connectable address before any network I/O happens.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::config::ControlConfig;

use super::error::{ControlError, ControlResult};

/// Fallback address when neither an override nor a configured control
/// interface is present
const LOOPBACK: &str = "127.0.0.1";

/// A resolved control endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    addr: SocketAddr,
}

impl Endpoint {
    /// Resolve exactly one control endpoint.
    ///
    /// Precedence: the explicit override, else the first configured
    /// control interface, else loopback. An `addr@port` form carries its
    /// own port; a bare address combines with the configured control port.
    pub fn resolve(explicit: Option<&str>, config: &ControlConfig) -> ControlResult<Self> {
        let spec = match explicit {
            Some(s) => s,
            None => config
                .control_interfaces
                .first()
                .map(String::as_str)
                .unwrap_or(LOOPBACK),
        };
        Self::parse(spec, config.control_port)
    }

    /// Parse an `addr` or `addr@port` specification.
    ///
    /// Only literal IP addresses are accepted; hostnames are rejected.
    fn parse(spec: &str, default_port: u16) -> ControlResult<Self> {
        let (host, port) = match spec.split_once('@') {
            Some((host, port_str)) => {
                let port = port_str
                    .parse::<u16>()
                    .map_err(|_| ControlError::Address(format!("bad port in {:?}", spec)))?;
                (host, port)
            }
            None => (spec, default_port),
        };

        let ip: IpAddr = host
            .parse()
            .map_err(|_| ControlError::Address(format!("not an IP address: {:?}", host)))?;

        Ok(Self {
            addr: SocketAddr::new(ip, port),
        })
    }

    /// The resolved transport address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}
