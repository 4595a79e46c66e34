//! `tower::Layer` applying a [`crate::RateLimiter`] to REST requests, keyed
//! by client IP with optional trusted-proxy rewriting (§4.D).

use std::net::IpAddr;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use http::{HeaderValue, Request, StatusCode};
use serde_json::json;
use tower::{Layer, Service};

use crate::rate_limit::{resolve_client_ip, RateLimitKey, RateLimiter, TrustedProxies};

/// A well-known extension carrying the directly-connected TCP peer address,
/// attached by the dispatcher alongside [`crate::PeerCertificateDer`].
#[derive(Debug, Clone, Copy)]
pub struct PeerSocketAddr(pub IpAddr);

/// `tower::Layer` rate-limiting by client IP (after trusted-proxy rewriting).
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter>,
    trusted_proxies: Arc<TrustedProxies>,
}

impl RateLimitLayer {
    /// Construct a layer around `limiter`, trusting forwarding headers only
    /// from `trusted_proxies`.
    pub fn new(limiter: Arc<RateLimiter>, trusted_proxies: Arc<TrustedProxies>) -> Self {
        Self { limiter, trusted_proxies }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: Arc::clone(&self.limiter),
            trusted_proxies: Arc::clone(&self.trusted_proxies),
        }
    }
}

/// The `tower::Service` [`RateLimitLayer`] wraps `inner` in.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
    trusted_proxies: Arc<TrustedProxies>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let limiter = Arc::clone(&self.limiter);
        let trusted_proxies = Arc::clone(&self.trusted_proxies);
        let mut inner = self.inner.clone();
        std::mem::swap(&mut self.inner, &mut inner);

        Box::pin(async move {
            let peer_ip = req
                .extensions()
                .get::<PeerSocketAddr>()
                .map(|p| p.0)
                .unwrap_or_else(|| IpAddr::from([0, 0, 0, 0]));
            let client_ip = resolve_client_ip(peer_ip, req.headers(), &trusted_proxies);
            let decision = limiter.check(&RateLimitKey::Ip(client_ip));

            if decision.allowed {
                let mut response = inner.call(req).await?;
                let headers = response.headers_mut();
                headers.insert("X-RateLimit-Limit", HeaderValue::from(decision.limit));
                headers.insert("X-RateLimit-Remaining", HeaderValue::from(decision.remaining));
                headers.insert("X-RateLimit-Reset", HeaderValue::from(decision.reset_secs));
                Ok(response)
            } else {
                let body = json!({
                    "code": 429,
                    "message": "rate limit exceeded",
                    "reason": "TooManyRequests",
                });
                let mut response = (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response();
                response
                    .headers_mut()
                    .insert("Retry-After", HeaderValue::from(decision.reset_secs));
                Ok(response)
            }
        })
    }
}
