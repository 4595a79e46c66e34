//! `agenttrust-gateway` library half: the pieces `main.rs` wires together
//! and that the integration tests under `tests/` need to reuse verbatim —
//! building the same dispatcher and TLS acceptor the real binary serves,
//! just against a config the test controls (ephemeral port, test CA),
//! rather than duplicating the wiring.

pub mod dispatcher;
pub mod grpc_impls;
pub mod rest;
pub mod serve;
pub mod tls;

use std::sync::Arc;
use std::time::Duration;

use agenttrust_collab::{
    DeviceService, EnrollmentRequestService, InMemoryCsrStore, InMemoryDeviceStore, InMemoryEnrollmentStore,
};
use agenttrust_core::Config;
use agenttrust_identity::{IdentityCache, PeerCertIdentifier};
use agenttrust_middleware::{AuthInterceptor, IdentityKind, RateLimitLayer, RateLimiter, TrustedProxies};
use agenttrust_proto::{
    agent_service_server::AgentServiceServer, enrollment_challenge_service_server::EnrollmentChallengeServiceServer,
    enrollment_service_server::EnrollmentServiceServer, health_check_service_server::HealthCheckServiceServer,
    router_service_server::RouterServiceServer,
};
use agenttrust_rendezvous::{RendezvousRouter, RouterGrpcService};
use agenttrust_tpm::EnrollmentChallengeGrpcService;
use anyhow::{Context, Result};
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Server as TonicServer;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::dispatcher::RequestDispatcher;
use crate::grpc_impls::{AgentServiceImpl, EnrollmentServiceImpl, HealthCheckServiceImpl};
use crate::rest::AppState;

/// Everything [`assemble`] built: the dispatcher ready to serve behind a
/// listener, and handles to the stores a caller (the real binary, or a
/// test) may want to seed or inspect directly.
pub struct Assembled {
    /// The single `tower::Service` every accepted connection is handed to.
    pub dispatcher: RequestDispatcher,
    /// Client-authenticating TLS acceptor built from `config.tls`.
    pub acceptor: tokio_rustls::TlsAcceptor,
    /// Identity cache, exposed so a caller can evict or inspect entries.
    pub identity_cache: Arc<IdentityCache>,
    /// Enrollment-request collaborator store.
    pub enrollment_store: Arc<dyn EnrollmentRequestService>,
    /// Device collaborator store.
    pub device_store: Arc<dyn DeviceService>,
    /// Rendezvous router, for a console bridge caller to start sessions on.
    pub rendezvous: RendezvousRouter,
}

/// Build every stateful component `main` wires up and assemble the single
/// dispatcher the agent-facing listener serves (§2, §4.G, §6). Factored out
/// of `main` so the gateway's integration tests exercise the identical
/// wiring instead of a hand-rolled stand-in.
pub fn assemble(config: &Config) -> Result<Assembled> {
    let identity_cache = Arc::new(IdentityCache::new(
        PeerCertIdentifier::new(
            config.signers.device_management_signer_name.clone(),
            config.signers.device_enrollment_signer_name.clone(),
            config.signers.default_org_id.clone(),
        ),
        Duration::from_secs(config.identity_cache.ttl_secs),
    ));

    let enrollment_store: Arc<dyn EnrollmentRequestService> = Arc::new(InMemoryEnrollmentStore::new());
    let device_store: Arc<dyn DeviceService> = Arc::new(InMemoryDeviceStore::new());
    let csr_store = InMemoryCsrStore::new();
    let rendezvous = RendezvousRouter::new();

    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limit.requests,
        Duration::from_secs(config.rate_limit.window_secs),
    ));
    let trusted_proxies = Arc::new(TrustedProxies::parse(&config.rate_limit.trusted_proxies));

    let rest_state = Arc::new(AppState {
        enrollment_requests: Arc::clone(&enrollment_store),
        devices: Arc::clone(&device_store),
        csrs: csr_store,
    });

    let rest_router = rest::router(rest_state, Arc::clone(&identity_cache)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(30)))
            .layer(RateLimitLayer::new(Arc::clone(&rate_limiter), Arc::clone(&trusted_proxies))),
    );

    let grpc_router = TonicServer::builder()
        .add_service(InterceptedService::new(
            EnrollmentServiceServer::new(EnrollmentServiceImpl::new(Arc::clone(&enrollment_store))),
            AuthInterceptor::new(Arc::clone(&identity_cache), IdentityKind::Enrollment),
        ))
        .add_service(HealthCheckServiceServer::new(HealthCheckServiceImpl))
        .add_service(InterceptedService::new(
            AgentServiceServer::new(AgentServiceImpl::new(Arc::clone(&device_store))),
            AuthInterceptor::new(Arc::clone(&identity_cache), IdentityKind::Agent),
        ))
        .add_service(InterceptedService::new(
            RouterServiceServer::new(RouterGrpcService::new(rendezvous.clone())),
            AuthInterceptor::new(Arc::clone(&identity_cache), IdentityKind::Agent),
        ))
        .add_service(InterceptedService::new(
            EnrollmentChallengeServiceServer::new(EnrollmentChallengeGrpcService::new(
                Arc::clone(&enrollment_store),
                Duration::from_secs(config.tpm.challenge_soft_timeout_secs),
            )),
            AuthInterceptor::new(Arc::clone(&identity_cache), IdentityKind::Enrollment),
        ))
        .into_router();

    let dispatcher = RequestDispatcher::new(grpc_router, rest_router);

    let acceptor = tls::build_acceptor(&config.tls.cert_path, &config.tls.key_path, &config.tls.client_ca_path)
        .context("failed to build TLS acceptor")?;

    Ok(Assembled { dispatcher, acceptor, identity_cache, enrollment_store, device_store, rendezvous })
}
