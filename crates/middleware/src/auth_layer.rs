//! Component C — `AuthMiddleware`, REST half: a `tower::Layer` installed in
//! front of handlers that require an authenticated agent or enrollment
//! identity, composed the way `services/h2-ingest` composes its own
//! `ServiceBuilder` layers, generalized from a single always-allow layer to
//! one that resolves and attaches an [`agenttrust_identity::Identity`].

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use http::{Request, StatusCode};
use serde_json::json;
use tower::{Layer, Service};

use agenttrust_identity::IdentityCache;

use crate::classify::{classify, IdentityKind, PeerCertificateDer};
use crate::error::MiddlewareError;

/// `tower::Layer` demanding identities of `kind`, resolved through `cache`.
#[derive(Clone)]
pub struct AuthLayer {
    cache: Arc<IdentityCache>,
    kind: IdentityKind,
}

impl AuthLayer {
    /// Construct a layer that demands `kind` identities via `cache`.
    pub fn new(cache: Arc<IdentityCache>, kind: IdentityKind) -> Self {
        Self { cache, kind }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService { inner, cache: Arc::clone(&self.cache), kind: self.kind }
    }
}

/// The `tower::Service` [`AuthLayer`] wraps `inner` in.
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    cache: Arc<IdentityCache>,
    kind: IdentityKind,
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let cache = Arc::clone(&self.cache);
        let kind = self.kind;
        // tower::Service::call requires the service actually dispatched be
        // `self`, so swap in a ready clone and poll the stashed one next time
        // (the standard tower "clone and forget" pattern for Oneshot-style layers).
        let mut inner = self.inner.clone();
        std::mem::swap(&mut self.inner, &mut inner);

        Box::pin(async move {
            let peer_der = req.extensions().get::<PeerCertificateDer>().map(|p| p.0.clone());

            match classify(&cache, peer_der.as_deref(), kind) {
                Ok(identity) => {
                    req.extensions_mut().insert(identity);
                    inner.call(req).await
                }
                Err(err) => Ok(middleware_error_response(&err)),
            }
        })
    }
}

/// Render a [`MiddlewareError`] as the §7 REST JSON error envelope.
pub fn middleware_error_response(err: &MiddlewareError) -> Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = json!({
        "code": err.http_status(),
        "message": err.to_string(),
        "reason": err.reason(),
    });
    (status, axum::Json(body)).into_response()
}
