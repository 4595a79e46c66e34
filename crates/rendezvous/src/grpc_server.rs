//! The `RouterService` tonic implementation: extracts the `session-id` and
//! `client-name` metadata headers and hands the call off to
//! [`crate::router::RendezvousRouter`] (§4.F, §6).

use std::pin::Pin;

use agenttrust_proto::{router_service_server::RouterService, StreamRequest, StreamResponse};
use tokio_stream::Stream;
use tonic::{Request, Response, Status, Streaming};
use uuid::Uuid;

use crate::error::RendezvousError;
use crate::router::RendezvousRouter;

/// Tonic service implementing `RouterService`.
pub struct RouterGrpcService {
    router: RendezvousRouter,
}

impl RouterGrpcService {
    /// Construct the service over `router`.
    pub fn new(router: RendezvousRouter) -> Self {
        Self { router }
    }
}

#[tonic::async_trait]
impl RouterService for RouterGrpcService {
    type StreamStream = Pin<Box<dyn Stream<Item = Result<StreamResponse, Status>> + Send + 'static>>;

    async fn stream(
        &self,
        request: Request<Streaming<StreamRequest>>,
    ) -> Result<Response<Self::StreamStream>, Status> {
        let metadata = request.metadata();
        let session_id = metadata
            .get("session-id")
            .ok_or(RendezvousError::MissingSessionId)
            .and_then(|v| v.to_str().map_err(|_| RendezvousError::MissingSessionId))
            .and_then(|s| Uuid::parse_str(s).map_err(|_| RendezvousError::InvalidSessionId(s.to_string())))
            .map_err(to_status)?;
        let client_name = metadata
            .get("client-name")
            .ok_or(RendezvousError::MissingClientName)
            .and_then(|v| v.to_str().map_err(|_| RendezvousError::MissingClientName))
            .map_err(to_status)?
            .to_string();

        let inbound = request.into_inner();
        let outbound = self
            .router
            .accept_stream(session_id, client_name, inbound)
            .map_err(to_status)?;

        Ok(Response::new(Box::pin(outbound)))
    }
}

fn to_status(err: RendezvousError) -> Status {
    Status::new(err.grpc_code(), err.to_string())
}
