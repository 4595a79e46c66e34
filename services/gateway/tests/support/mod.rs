pub mod certs;
pub mod harness;
pub mod tpm_client;

pub use certs::{fingerprint, TestCa};
pub use harness::{HarnessOptions, TestGateway};

/// Build a `reqwest` client presenting `leaf` as its client certificate and
/// trusting `gateway`'s test server CA — the REST-side analogue of
/// [`grpc_channel`].
pub fn rest_client(gateway: &TestGateway, leaf: &certs::Leaf) -> reqwest::Client {
    let root = reqwest::Certificate::from_pem(gateway.server_ca.root_pem().as_bytes())
        .expect("server CA parses as a root certificate");
    let identity = reqwest::Identity::from_pem(&leaf.identity_pem()).expect("leaf cert+key parse as a client identity");
    reqwest::Client::builder()
        .use_rustls_tls()
        .add_root_certificate(root)
        .identity(identity)
        .build()
        .expect("build mTLS REST client")
}

/// Build a `tonic` channel presenting `leaf` as its client certificate and
/// trusting `gateway`'s test server CA.
pub async fn grpc_channel(gateway: &TestGateway, leaf: &certs::Leaf) -> tonic::transport::Channel {
    let tls = tonic::transport::ClientTlsConfig::new()
        .ca_certificate(tonic::transport::Certificate::from_pem(gateway.server_ca.root_pem()))
        .identity(tonic::transport::Identity::from_pem(&leaf.cert_pem, &leaf.key_pem))
        .domain_name("127.0.0.1");

    tonic::transport::Channel::from_shared(gateway.grpc_uri())
        .expect("gateway URI is valid")
        .tls_config(tls)
        .expect("tls config applies to channel")
        .connect()
        .await
        .expect("connect to test gateway")
}
