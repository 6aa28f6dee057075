// Copyright 2025 devca contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end: generate a CA and a server certificate, then complete a TLS
//! handshake with a client that trusts only that CA.

use devca::{
    CaConfig, CertificateAuthorityManager, Context, LeafConfig, LeafRequest, OsFileSystem,
    ServerCertificateIssuer, SystemClock,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs1KeyDer, ServerName};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use time::Duration;

fn pem_to_der(pem_bytes: &[u8]) -> Vec<u8> {
    pem::parse(pem_bytes).unwrap().into_contents()
}

#[test]
fn test_https_handshake_against_issued_certificate() {
    let dir = tempfile::tempdir().unwrap();

    let mut ca_config = CaConfig::new(dir.path().to_path_buf());
    ca_config.key_bits = 2048;
    ca_config.validity = Duration::days(90);
    let mut ca_manager = CertificateAuthorityManager::new(
        ca_config,
        OsFileSystem,
        SystemClock,
        StdRng::seed_from_u64(11),
    );
    let ca = ca_manager.ensure(&Context::background()).unwrap();

    let leaf_config = LeafConfig {
        key_bits: 2048,
        ..LeafConfig::default()
    };
    let mut issuer = ServerCertificateIssuer::new(
        leaf_config,
        OsFileSystem,
        SystemClock,
        StdRng::seed_from_u64(12),
    );
    let request = LeafRequest {
        hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
        certificate_path: dir.path().join("localhost.pem"),
        key_path: dir.path().join("localhost.key"),
    };
    let leaf = issuer
        .issue(&Context::background(), &ca, &request)
        .unwrap();

    let server_config = {
        let certs = vec![CertificateDer::from(pem_to_der(&leaf.certificate_pem))];
        let key = PrivateKeyDer::Pkcs1(PrivatePkcs1KeyDer::from(pem_to_der(
            &leaf.private_key_pem,
        )));
        rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .unwrap()
    };

    let client_config = {
        let mut roots = rustls::RootCertStore::empty();
        roots
            .add(CertificateDer::from(pem_to_der(&ca.certificate_pem)))
            .unwrap();
        rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth()
    };

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();

    let server = std::thread::spawn(move || {
        let (mut tcp, _) = listener.accept().unwrap();
        let mut connection =
            rustls::ServerConnection::new(Arc::new(server_config)).unwrap();
        let mut stream = rustls::Stream::new(&mut connection, &mut tcp);

        let mut request = Vec::new();
        let mut buffer = [0u8; 1024];
        loop {
            let read = stream.read(&mut buffer).unwrap();
            request.extend_from_slice(&buffer[..read]);
            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }

        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok")
            .unwrap();
        stream.flush().unwrap();
        connection.send_close_notify();
        let _ = connection.complete_io(&mut tcp);
    });

    let mut tcp = TcpStream::connect(address).unwrap();
    let server_name = ServerName::try_from("localhost").unwrap();
    let mut connection =
        rustls::ClientConnection::new(Arc::new(client_config), server_name).unwrap();
    let mut stream = rustls::Stream::new(&mut connection, &mut tcp);

    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();

    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.ends_with("ok"), "{response}");

    server.join().unwrap();
}
