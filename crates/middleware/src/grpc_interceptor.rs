//! Component C — `AuthMiddleware`, gRPC half: a `tonic::service::Interceptor`
//! running the same classification logic as [`crate::auth_layer`] once per
//! stream open (§4.C).

use std::sync::Arc;

use agenttrust_identity::IdentityCache;
use tonic::{Request, Status};

use crate::classify::{classify, IdentityKind, PeerCertificateDer};

/// Classifies the peer certificate attached to a gRPC request/stream and, on
/// success, attaches the resulting [`agenttrust_identity::Identity`] to the
/// request's extensions for the service implementation to read.
#[derive(Clone)]
pub struct AuthInterceptor {
    cache: Arc<IdentityCache>,
    kind: IdentityKind,
}

impl AuthInterceptor {
    /// Construct an interceptor demanding `kind` identities via `cache`.
    pub fn new(cache: Arc<IdentityCache>, kind: IdentityKind) -> Self {
        Self { cache, kind }
    }
}

impl tonic::service::Interceptor for AuthInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let peer_der = request.extensions().get::<PeerCertificateDer>().map(|p| p.0.clone());

        match classify(&self.cache, peer_der.as_deref(), self.kind) {
            Ok(identity) => {
                request.extensions_mut().insert(identity);
                Ok(request)
            }
            Err(err) => Err(Status::new(err.grpc_code(), err.to_string())),
        }
    }
}
