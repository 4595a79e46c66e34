//! mTLS setup for the agent-facing listener (§4.G, §6).
//!
//! Unlike the permissive mTLS posture some peer-to-peer tools use, this core
//! requires the presented client certificate to chain to a configured CA
//! bundle *before* it ever reaches [`agenttrust_identity::PeerCertIdentifier`]
//! (§3 invariant: "unverified certs never produce an Identity"). Chain
//! verification happens here, at the `rustls` layer; everything downstream
//! only classifies certs that already passed it.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use rustls_pemfile::{certs, private_key};
use tokio_rustls::TlsAcceptor;

/// Build the `rustls::ServerConfig` for the agent-facing listener: server
/// identity from `cert_path`/`key_path`, client certificates required and
/// verified against `client_ca_path`.
pub fn build_acceptor(cert_path: &str, key_path: &str, client_ca_path: &str) -> Result<TlsAcceptor> {
    // rustls 0.23 no longer installs a process-default `CryptoProvider`
    // automatically; `ServerConfig::builder()` panics without one. Installing
    // twice (e.g. once from the binary, once from a test harness in the same
    // process) is harmless — a second `install_default` just returns an
    // error we ignore.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let server_certs = load_certs(cert_path)?;
    let server_key = load_private_key(key_path)?;
    let client_ca_store = load_root_store(client_ca_path)?;

    let client_verifier = WebPkiClientVerifier::builder(Arc::new(client_ca_store))
        .build()
        .context("failed to build client certificate verifier")?;

    let mut config = ServerConfig::builder()
        .with_client_cert_verifier(client_verifier)
        .with_single_cert(server_certs, server_key)
        .context("invalid server certificate/key pair")?;

    // Streaming RPCs (TPM challenge, rendezvous) and REST both negotiate over
    // h2; ALPN is how the client signals that, tonic and axum both need it.
    config.alpn_protocols = vec![b"h2".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn load_certs(path: &str) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>> {
    let file = File::open(Path::new(path)).with_context(|| format!("opening cert file {path}"))?;
    let mut reader = BufReader::new(file);
    certs(&mut reader)
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("parsing cert file {path}"))
}

fn load_private_key(path: &str) -> Result<rustls::pki_types::PrivateKeyDer<'static>> {
    let file = File::open(Path::new(path)).with_context(|| format!("opening key file {path}"))?;
    let mut reader = BufReader::new(file);
    private_key(&mut reader)
        .with_context(|| format!("parsing key file {path}"))?
        .ok_or_else(|| anyhow::anyhow!("no private key found in {path}"))
}

fn load_root_store(ca_path: &str) -> Result<RootCertStore> {
    let mut store = RootCertStore::empty();
    for entry in glob_or_literal(ca_path)? {
        let file = File::open(&entry).with_context(|| format!("opening CA file {}", entry.display()))?;
        let mut reader = BufReader::new(file);
        for cert in certs(&mut reader) {
            store.add(cert.with_context(|| format!("parsing CA file {}", entry.display()))?)?;
        }
    }
    Ok(store)
}

/// `tpmCAPaths`/`client_ca_path` entries may be glob patterns (§6); expand
/// them, falling back to the literal path if it isn't one.
fn glob_or_literal(pattern: &str) -> Result<Vec<std::path::PathBuf>> {
    if pattern.contains('*') || pattern.contains('?') {
        let mut out = Vec::new();
        for entry in glob::glob(pattern).with_context(|| format!("invalid glob {pattern}"))? {
            out.push(entry?);
        }
        Ok(out)
    } else {
        Ok(vec![std::path::PathBuf::from(pattern)])
    }
}
