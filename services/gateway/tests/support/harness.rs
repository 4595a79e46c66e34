//! Spins up the real `agenttrust_gateway::assemble` + `serve::run` stack
//! against an ephemeral port and a set of throwaway CAs, the way the
//! ambient test-tooling note in the expanded spec promises: "a `tokio`-async
//! integration test under the gateway crate's `tests/`, using the
//! bind-`127.0.0.1:0`-and-spawn harness pattern."

use std::io::Write;
use std::net::SocketAddr;

use agenttrust_core::Config;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::certs::TestCa;

/// A running gateway instance plus the CAs needed to mint client
/// certificates against it, and handles to the stores it started with.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub server_ca: TestCa,
    pub management_ca: TestCa,
    pub enrollment_ca: TestCa,
    pub enrollment_store: std::sync::Arc<dyn agenttrust_collab::EnrollmentRequestService>,
    pub device_store: std::sync::Arc<dyn agenttrust_collab::DeviceService>,
    pub rendezvous: agenttrust_rendezvous::RendezvousRouter,
    _task: JoinHandle<()>,
    _tmp: TempDir,
}

/// Tunables a scenario test needs to vary (rate-limit scenarios in
/// particular need a much smaller bucket than the production default).
#[derive(Default)]
pub struct HarnessOptions {
    pub rate_limit_requests: Option<u32>,
    pub rate_limit_window_secs: Option<u64>,
    pub challenge_soft_timeout_secs: Option<u64>,
}

impl TestGateway {
    /// Start a gateway bound to an ephemeral `127.0.0.1` port with default
    /// rate limits.
    pub async fn start() -> Self {
        Self::start_with(HarnessOptions::default()).await
    }

    /// Start a gateway with the given overrides layered on
    /// [`Config::default`].
    pub async fn start_with(options: HarnessOptions) -> Self {
        let server_ca = TestCa::new("agenttrust-gateway-test-ca");
        let management_ca = TestCa::new("device-management-ca");
        let enrollment_ca = TestCa::new("device-enrollment-ca");

        let tmp = TempDir::new().expect("create temp dir for test TLS material");
        let server_leaf = server_ca.issue_server_leaf();
        let cert_path = tmp.path().join("server.pem");
        let key_path = tmp.path().join("server-key.pem");
        let ca_path = tmp.path().join("client-ca.pem");
        write(&cert_path, server_leaf.cert_pem.as_bytes());
        write(&key_path, server_leaf.key_pem.as_bytes());
        write(&ca_path, format!("{}{}", management_ca.root_pem(), enrollment_ca.root_pem()).as_bytes());

        let mut config = Config::default();
        config.listen.agent_endpoint_address = "127.0.0.1:0".to_string();
        config.tls.cert_path = cert_path.to_string_lossy().into_owned();
        config.tls.key_path = key_path.to_string_lossy().into_owned();
        config.tls.client_ca_path = ca_path.to_string_lossy().into_owned();
        if let Some(requests) = options.rate_limit_requests {
            config.rate_limit.requests = requests;
            config.rate_limit.auth_requests = requests;
        }
        if let Some(window) = options.rate_limit_window_secs {
            config.rate_limit.window_secs = window;
            config.rate_limit.auth_window_secs = window;
        }
        if let Some(timeout) = options.challenge_soft_timeout_secs {
            config.tpm.challenge_soft_timeout_secs = timeout;
        }

        let assembled = agenttrust_gateway::assemble(&config).expect("assemble gateway components");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
        let addr = listener.local_addr().expect("listener has a local addr");

        let enrollment_store = assembled.enrollment_store.clone();
        let device_store = assembled.device_store.clone();
        let rendezvous = assembled.rendezvous.clone();

        let task = tokio::spawn(agenttrust_gateway::serve::run(listener, assembled.acceptor, assembled.dispatcher));

        TestGateway {
            addr,
            server_ca,
            management_ca,
            enrollment_ca,
            enrollment_store,
            device_store,
            rendezvous,
            _task: task,
            _tmp: tmp,
        }
    }

    /// Base `https://` URL for REST calls against this instance.
    pub fn rest_base_url(&self) -> String {
        format!("https://{}", self.addr)
    }

    /// `https://` URI suitable for a `tonic::transport::Endpoint`.
    pub fn grpc_uri(&self) -> String {
        format!("https://{}", self.addr)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self._task.abort();
    }
}

fn write(path: &std::path::Path, bytes: &[u8]) {
    let mut file = std::fs::File::create(path).expect("create test TLS material file");
    file.write_all(bytes).expect("write test TLS material");
}
