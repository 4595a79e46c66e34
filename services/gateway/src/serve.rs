//! The §4.G accept loop, factored out of `main` so a test harness can drive
//! it against a listener bound to an ephemeral port.

use std::net::SocketAddr;

use axum::extract::Extension as ExtensionLayer;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::warn;

use crate::dispatcher::RequestDispatcher;
use agenttrust_middleware::PeerCertificateDer;

/// Accept connections from `listener` forever: complete the TLS handshake,
/// extract the verified peer leaf certificate, attach it (and the raw peer
/// address) to every request on this connection, then serve HTTP/2 with no
/// additional read/write deadlines — streaming RPCs are expected to run
/// indefinitely (§5).
///
/// Returns only if `listener.accept()` itself cannot be retried, which in
/// practice means never for a real socket; a test harness instead drops the
/// future (or its spawned task) to shut the server down.
pub async fn run(listener: TcpListener, acceptor: tokio_rustls::TlsAcceptor, dispatcher: RequestDispatcher) {
    loop {
        let (tcp_stream, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(%err, "accept failed");
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let dispatcher = dispatcher.clone();

        tokio::spawn(async move {
            let tls_stream = match acceptor.accept(tcp_stream).await {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(%err, %peer_addr, "TLS handshake failed");
                    return;
                }
            };

            let peer_der = tls_stream
                .get_ref()
                .1
                .peer_certificates()
                .and_then(|certs| certs.first())
                .map(|c| c.to_vec());

            let service = ServiceBuilder::new()
                .layer(ExtensionLayer(PeerCertificateDer(peer_der.unwrap_or_default())))
                .layer(ExtensionLayer(peer_socket_addr(peer_addr)))
                .service(dispatcher);

            let io = TokioIo::new(tls_stream);
            let hyper_service = TowerToHyperService::new(service);

            if let Err(err) = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                .http2_only(true)
                .serve_connection(io, hyper_service)
                .await
            {
                warn!(%err, %peer_addr, "connection closed with error");
            }
        });
    }
}

fn peer_socket_addr(addr: SocketAddr) -> agenttrust_middleware::PeerSocketAddr {
    agenttrust_middleware::PeerSocketAddr(addr.ip())
}
