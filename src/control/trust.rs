//! Trust context for the mutual-TLS control channel
//!
//! Loads the three PEM credentials and bakes them into an immutable
//! client-side TLS configuration. Verification policy is fixed and not
//! exposed as an option: the server chain must validate against the
//! trusted server certificate, the client always presents its own
//! identity, and only current protocol versions are offered.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};

use crate::config::ControlConfig;

use super::error::{ControlError, ControlResult};

/// Protocol versions offered to the peer. Fixed trust policy, not
/// configuration.
static TLS_VERSIONS: &[&rustls::SupportedProtocolVersion] =
    &[&rustls::version::TLS13, &rustls::version::TLS12];

static CRYPTO_INIT: Once = Once::new();

/// Install the process-wide rustls crypto provider.
///
/// Idempotent. Runs before any trust context is built; a provider
/// installed earlier by the embedding process is left in place.
pub fn init_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// File-system paths to the three PEM credentials
#[derive(Debug, Clone)]
pub struct CredentialPaths {
    /// Trusted server certificate, used to verify the peer's chain
    pub server_cert: PathBuf,
    /// Client private key
    pub client_key: PathBuf,
    /// Client certificate matching the private key
    pub client_cert: PathBuf,
}

impl CredentialPaths {
    /// The credential paths named by the configuration
    pub fn from_config(config: &ControlConfig) -> Self {
        Self {
            server_cert: config.server_cert_file.clone(),
            client_key: config.control_key_file.clone(),
            client_cert: config.control_cert_file.clone(),
        }
    }
}

/// Immutable trust context, valid for one handshake.
#[derive(Debug)]
pub struct TrustContext {
    client_config: Arc<ClientConfig>,
}

impl TrustContext {
    /// Build a trust context from the credential files.
    ///
    /// All three files must be readable and mutually consistent; a
    /// private key that does not match the client certificate is rejected
    /// here, before any connection is attempted.
    pub fn build(paths: &CredentialPaths) -> ControlResult<Self> {
        init_crypto();

        let server_certs = read_certificates(&paths.server_cert)?;
        let mut roots = RootCertStore::empty();
        for cert in server_certs {
            roots.add(cert).map_err(|e| {
                ControlError::Credential(format!(
                    "cannot use {} as trust anchor: {}",
                    paths.server_cert.display(),
                    e
                ))
            })?;
        }

        let client_certs = read_certificates(&paths.client_cert)?;
        let client_key = read_private_key(&paths.client_key)?;

        let client_config = ClientConfig::builder_with_protocol_versions(TLS_VERSIONS)
            .with_root_certificates(roots)
            .with_client_auth_cert(client_certs, client_key)
            .map_err(|e| {
                ControlError::Credential(format!(
                    "client key {} and certificate {} rejected: {}",
                    paths.client_key.display(),
                    paths.client_cert.display(),
                    e
                ))
            })?;

        Ok(Self {
            client_config: Arc::new(client_config),
        })
    }

    pub(crate) fn client_config(&self) -> Arc<ClientConfig> {
        Arc::clone(&self.client_config)
    }
}

/// Parse all PEM-encoded certificates in a file.
fn read_certificates(path: &Path) -> ControlResult<Vec<CertificateDer<'static>>> {
    let pem = std::fs::read(path).map_err(|e| {
        ControlError::Credential(format!("could not read {}: {}", path.display(), e))
    })?;

    let certs = CertificateDer::pem_slice_iter(&pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            ControlError::Credential(format!(
                "malformed certificate in {}: {}",
                path.display(),
                e
            ))
        })?;

    if certs.is_empty() {
        return Err(ControlError::Credential(format!(
            "no certificates found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

/// Parse a PEM-encoded private key.
fn read_private_key(path: &Path) -> ControlResult<PrivateKeyDer<'static>> {
    let pem = std::fs::read(path).map_err(|e| {
        ControlError::Credential(format!("could not read {}: {}", path.display(), e))
    })?;

    PrivateKeyDer::from_pem_slice(&pem).map_err(|e| {
        ControlError::Credential(format!(
            "malformed private key in {}: {}",
            path.display(),
            e
        ))
    })
}
