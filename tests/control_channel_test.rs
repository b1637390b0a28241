//! Control channel integration tests
//!
//! Each test runs a real TLS service on a loopback listener that requires
//! client certificates, then drives the full client sequence against it:
//! resolve endpoint, build trust context, connect, handshake, exchange.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rcgen::{CertificateParams, DnType, KeyPair, SanType};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig, ServerConnection, StreamOwned};
use tempfile::TempDir;

use uplink::config::ControlConfig;
use uplink::control::{
    self, exchange, run_command, ControlError, CredentialPaths, Endpoint, SecureChannel,
    TrustContext,
};

/// Self-signed CA that can issue server and client certificates.
struct TestAuthority {
    ca_cert: rcgen::Certificate,
    ca_key: KeyPair,
}

impl TestAuthority {
    fn new() -> Self {
        control::init_crypto();

        let mut params = CertificateParams::default();
        params
            .distinguished_name
            .push(DnType::CommonName, "uplink test ca");
        params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        let ca_key = KeyPair::generate().expect("key generation should succeed");
        let ca_cert = params
            .self_signed(&ca_key)
            .expect("self-signing should succeed");

        Self { ca_cert, ca_key }
    }

    fn ca_pem(&self) -> String {
        self.ca_cert.pem()
    }

    /// Issue a certificate signed by this CA. Server certificates carry a
    /// loopback IP SAN so the client's server-name check passes.
    fn issue(&self, common_name: &str, loopback_san: bool) -> (String, String) {
        let mut params = CertificateParams::default();
        params
            .distinguished_name
            .push(DnType::CommonName, common_name);
        if loopback_san {
            params.subject_alt_names = vec![SanType::IpAddress("127.0.0.1".parse().unwrap())];
        }
        let key = KeyPair::generate().expect("key generation should succeed");
        let cert = params
            .signed_by(&key, &self.ca_cert, &self.ca_key)
            .expect("signing should succeed");

        (cert.pem(), key.serialize_pem())
    }
}

/// Client configuration whose credential files live in `dir`.
fn client_config(dir: &TempDir, ca_pem: &str, cert_pem: &str, key_pem: &str) -> ControlConfig {
    let server_cert_file = dir.path().join("uplink_server.pem");
    let control_cert_file = dir.path().join("uplink_control.pem");
    let control_key_file = dir.path().join("uplink_control.key");
    std::fs::write(&server_cert_file, ca_pem).unwrap();
    std::fs::write(&control_cert_file, cert_pem).unwrap();
    std::fs::write(&control_key_file, key_pem).unwrap();

    ControlConfig {
        server_cert_file,
        control_cert_file,
        control_key_file,
        ..Default::default()
    }
}

/// Server-side TLS configuration requiring client certificates.
fn server_tls_config(ca_pem: &str, cert_pem: &str, key_pem: &str) -> Arc<ServerConfig> {
    control::init_crypto();

    let mut roots = RootCertStore::empty();
    for cert in CertificateDer::pem_slice_iter(ca_pem.as_bytes()) {
        roots.add(cert.unwrap()).unwrap();
    }
    let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
        .build()
        .unwrap();

    let certs = CertificateDer::pem_slice_iter(cert_pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let key = PrivateKeyDer::from_pem_slice(key_pem.as_bytes()).unwrap();

    let config = ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(certs, key)
        .unwrap();
    Arc::new(config)
}

/// Accept one connection, read one request line, send the response
/// chunks, and close cleanly. Returns the request bytes received.
fn serve_once(
    tls: Arc<ServerConfig>,
    responses: Vec<Vec<u8>>,
    chunk_delay: Option<Duration>,
) -> (u16, thread::JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (sock, _) = listener.accept().unwrap();
        let conn = ServerConnection::new(tls).unwrap();
        let mut stream = StreamOwned::new(conn, sock);

        let mut request = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match stream.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    request.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(_) => return request,
            }
        }

        for chunk in &responses {
            if stream.write_all(chunk).is_err() {
                return request;
            }
            let _ = stream.flush();
            if let Some(delay) = chunk_delay {
                thread::sleep(delay);
            }
        }

        stream.conn.send_close_notify();
        let _ = stream.flush();
        request
    });

    (port, handle)
}

#[test]
fn test_command_round_trip() {
    let authority = TestAuthority::new();
    let (server_cert, server_key) = authority.issue("uplink test server", true);
    let (client_cert, client_key) = authority.issue("uplink test client", false);

    let tls = server_tls_config(&authority.ca_pem(), &server_cert, &server_key);
    let (port, handle) = serve_once(tls, vec![b"total.num.queries=5\n".to_vec()], None);

    let dir = TempDir::new().unwrap();
    let config = client_config(&dir, &authority.ca_pem(), &client_cert, &client_key);

    let server = format!("127.0.0.1@{}", port);
    let mut out = Vec::new();
    run_command(&config, Some(&server), b"STATS\n", &mut out).unwrap();

    assert_eq!(out, b"total.num.queries=5\n");
    assert_eq!(handle.join().unwrap(), b"STATS\n");
}

#[test]
fn test_streamed_response_chunks_concatenated() {
    let authority = TestAuthority::new();
    let (server_cert, server_key) = authority.issue("uplink test server", true);
    let (client_cert, client_key) = authority.issue("uplink test client", false);

    let tls = server_tls_config(&authority.ca_pem(), &server_cert, &server_key);
    let chunks = vec![
        b"thread0.num.queries=12\n".to_vec(),
        b"thread1.num.queries=7\n".to_vec(),
        b"uptime=3600\n".to_vec(),
    ];
    let (port, handle) = serve_once(tls, chunks.clone(), Some(Duration::from_millis(10)));

    let dir = TempDir::new().unwrap();
    let config = client_config(&dir, &authority.ca_pem(), &client_cert, &client_key);

    // Drive the components directly rather than through the driver.
    let server = format!("127.0.0.1@{}", port);
    let endpoint = Endpoint::resolve(Some(&server), &config).unwrap();
    let trust = TrustContext::build(&CredentialPaths::from_config(&config)).unwrap();
    let mut channel = SecureChannel::establish(&endpoint, &trust).unwrap();

    let mut out = Vec::new();
    exchange(&mut channel, b"stats_noreset\n", &mut out).unwrap();

    let expected: Vec<u8> = chunks.concat();
    assert_eq!(out, expected);
    assert_eq!(handle.join().unwrap(), b"stats_noreset\n");
}

#[test]
fn test_immediate_close_yields_empty_response() {
    let authority = TestAuthority::new();
    let (server_cert, server_key) = authority.issue("uplink test server", true);
    let (client_cert, client_key) = authority.issue("uplink test client", false);

    let tls = server_tls_config(&authority.ca_pem(), &server_cert, &server_key);
    let (port, handle) = serve_once(tls, vec![], None);

    let dir = TempDir::new().unwrap();
    let config = client_config(&dir, &authority.ca_pem(), &client_cert, &client_key);

    let server = format!("127.0.0.1@{}", port);
    let mut out = Vec::new();
    run_command(&config, Some(&server), b"stop\n", &mut out).unwrap();

    assert!(out.is_empty());
    assert_eq!(handle.join().unwrap(), b"stop\n");
}

#[test]
fn test_untrusted_server_is_handshake_error() {
    let authority = TestAuthority::new();
    let rogue = TestAuthority::new();

    // Server identity chains to a different authority than the client trusts.
    let (server_cert, server_key) = rogue.issue("rogue server", true);
    let (client_cert, client_key) = authority.issue("uplink test client", false);

    let tls = server_tls_config(&rogue.ca_pem(), &server_cert, &server_key);
    let (port, handle) = serve_once(tls, vec![b"unreachable\n".to_vec()], None);

    let dir = TempDir::new().unwrap();
    let config = client_config(&dir, &authority.ca_pem(), &client_cert, &client_key);

    let server = format!("127.0.0.1@{}", port);
    let mut out = Vec::new();
    let err = run_command(&config, Some(&server), b"STATS\n", &mut out).unwrap_err();

    assert!(matches!(err, ControlError::Handshake(_)));
    assert!(out.is_empty());
    let _ = handle.join();
}

#[test]
fn test_connection_refused_is_connect_error() {
    let authority = TestAuthority::new();
    let (client_cert, client_key) = authority.issue("uplink test client", false);

    // Bind and immediately drop a listener to get a port nothing serves.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let dir = TempDir::new().unwrap();
    let config = client_config(&dir, &authority.ca_pem(), &client_cert, &client_key);

    let server = format!("127.0.0.1@{}", port);
    let mut out = Vec::new();
    let err = run_command(&config, Some(&server), b"STATS\n", &mut out).unwrap_err();

    assert!(matches!(err, ControlError::Connect { .. }));
}

#[test]
fn test_mismatched_key_fails_before_connecting() {
    let authority = TestAuthority::new();
    let (client_cert, _client_key) = authority.issue("uplink test client", false);
    let stray_key = KeyPair::generate().unwrap().serialize_pem();

    let dir = TempDir::new().unwrap();
    let config = client_config(&dir, &authority.ca_pem(), &client_cert, &stray_key);

    // No listener exists on this port; a connection attempt would surface
    // as a connect error, so a credential error proves none was made.
    let mut out = Vec::new();
    let err = run_command(&config, Some("127.0.0.1@1"), b"STATS\n", &mut out).unwrap_err();

    assert!(matches!(err, ControlError::Credential(_)));
}

#[test]
fn test_bad_address_fails_before_credentials_are_touched() {
    let dir = TempDir::new().unwrap();
    // Credential paths point at nothing; endpoint resolution fails first.
    let config = ControlConfig {
        server_cert_file: dir.path().join("absent.pem"),
        control_cert_file: dir.path().join("absent.pem"),
        control_key_file: dir.path().join("absent.key"),
        ..Default::default()
    };

    let mut out = Vec::new();
    let err = run_command(&config, Some("127.0.0.1@notaport"), b"STATS\n", &mut out).unwrap_err();

    assert!(matches!(err, ControlError::Address(_)));
}
