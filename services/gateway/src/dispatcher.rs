//! Component G — `RequestDispatcher` (§4.G): routes each incoming HTTP/2
//! request on the single agent-facing listener to either the gRPC server or
//! the REST router, based on `Content-Type: application/grpc`.
//!
//! Both branches are `axum::Router`s (`tonic::transport::Server::into_router()`
//! produces one for the gRPC side, built against the same axum/http/hyper
//! major versions as the REST side so the two `Router`s are the same type),
//! so dispatch is a plain `tower::Service` that clones whichever router the
//! request needs and calls it — no shared
//! timeout budget leaks between the two: the REST branch carries its own
//! `tower_http::timeout::TimeoutLayer` (§6 "standard read/write/idle
//! timeouts configured by the operator"), while the gRPC branch carries
//! none, so streaming RPCs (TPM challenge, rendezvous) are free to block
//! indefinitely the way §5 requires ("infinite at the transport level").

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use axum::Router;
use http::Version;
use tower::Service;

/// `tower::Service` that dispatches each request to `grpc` or `rest`
/// depending on whether it looks like a gRPC call (§4.G).
#[derive(Clone)]
pub struct RequestDispatcher {
    grpc: Router,
    rest: Router,
}

impl RequestDispatcher {
    /// Construct a dispatcher over the two fully-assembled sub-routers.
    pub fn new(grpc: Router, rest: Router) -> Self {
        Self { grpc, rest }
    }
}

/// `true` if `req` is an HTTP/2 request whose `Content-Type` begins with
/// `application/grpc`, the two conditions §4.G's contract names.
fn is_grpc_request(req: &Request) -> bool {
    if req.version() != Version::HTTP_2 {
        return false;
    }
    req.headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/grpc"))
        .unwrap_or(false)
}

impl Service<Request> for RequestDispatcher {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut target = if is_grpc_request(&req) { self.grpc.clone() } else { self.rest.clone() };
        Box::pin(async move {
            match target.call(req).await {
                Ok(response) => Ok(response),
                Err(infallible) => match infallible {},
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, Method};

    fn request(version: Version, content_type: Option<&str>) -> Request {
        let mut builder = http::Request::builder().method(Method::POST).version(version);
        if let Some(ct) = content_type {
            builder = builder.header(http::header::CONTENT_TYPE, HeaderValue::from_str(ct).unwrap());
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn http2_grpc_content_type_is_classified_as_grpc() {
        let req = request(Version::HTTP_2, Some("application/grpc"));
        assert!(is_grpc_request(&req));
    }

    #[test]
    fn http2_grpc_with_proto_suffix_is_still_grpc() {
        let req = request(Version::HTTP_2, Some("application/grpc+proto"));
        assert!(is_grpc_request(&req));
    }

    #[test]
    fn http1_request_is_never_grpc_even_with_matching_content_type() {
        let req = request(Version::HTTP_11, Some("application/grpc"));
        assert!(!is_grpc_request(&req));
    }

    #[test]
    fn json_content_type_is_rest() {
        let req = request(Version::HTTP_2, Some("application/json"));
        assert!(!is_grpc_request(&req));
    }

    #[test]
    fn missing_content_type_is_rest() {
        let req = request(Version::HTTP_2, None);
        assert!(!is_grpc_request(&req));
    }
}
