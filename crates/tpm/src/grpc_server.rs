//! The `EnrollmentChallengeService` gRPC glue: drives the §4.E state machine
//! over one bidirectional `TPMChallenge` stream.
//!
//! This module only sequences the two state-machine calls against the wire
//! protocol and maps failures to the gRPC code table in §4.E; all challenge
//! semantics live in [`crate::state_machine`].

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use agenttrust_collab::EnrollmentRequestService;
use agenttrust_identity::Identity;
use agenttrust_proto::{
    agent_challenge, enrollment_challenge_service_server::EnrollmentChallengeService,
    server_challenge, AgentChallenge, Challenge, ChallengeError as PbChallengeError, ServerChallenge, Success,
};
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, Stream};
use tonic::{Request, Response, Status, Streaming};

use crate::error::TpmError;
use crate::state_machine::{begin_challenge, verify_response, ChallengeOutcome, PendingChallenge};

/// Outbound channel depth for one challenge stream — small, since at most
/// three messages (`Challenge`, then `Success` or `Error`) are ever sent.
const CHANNEL_CAPACITY: usize = 4;

/// Tonic service implementing `EnrollmentChallengeService`.
pub struct EnrollmentChallengeGrpcService {
    store: Arc<dyn EnrollmentRequestService>,
    soft_timeout: Duration,
}

impl EnrollmentChallengeGrpcService {
    /// Construct the service against `store`, with the §5-recommended
    /// per-stream soft timeout.
    pub fn new(store: Arc<dyn EnrollmentRequestService>, soft_timeout: Duration) -> Self {
        Self { store, soft_timeout }
    }
}

#[tonic::async_trait]
impl EnrollmentChallengeService for EnrollmentChallengeGrpcService {
    type TPMChallengeStream = Pin<Box<dyn Stream<Item = Result<ServerChallenge, Status>> + Send + 'static>>;

    async fn tpm_challenge(
        &self,
        request: Request<Streaming<AgentChallenge>>,
    ) -> Result<Response<Self::TPMChallengeStream>, Status> {
        let org_id = match request.extensions().get::<Identity>() {
            Some(Identity::Enrollment(enrollment)) => enrollment.org_id.clone(),
            Some(Identity::Agent(_)) => {
                return Err(Status::internal("TPMChallenge requires an enrollment identity, got agent"))
            }
            None => return Err(Status::unauthenticated("no identity attached to request")),
        };

        let inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let store = Arc::clone(&self.store);
        let soft_timeout = self.soft_timeout;

        tokio::spawn(async move {
            drive(store, soft_timeout, org_id, inbound, tx).await;
        });

        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }
}

async fn drive(
    store: Arc<dyn EnrollmentRequestService>,
    soft_timeout: Duration,
    org_id: String,
    mut inbound: Streaming<AgentChallenge>,
    tx: mpsc::Sender<Result<ServerChallenge, Status>>,
) {
    let first = match recv_with_timeout(&mut inbound, soft_timeout).await {
        Ok(msg) => msg,
        Err(err) => return send_terminal_error(&tx, err).await,
    };

    let name = match first.payload {
        Some(agent_challenge::Payload::Request(req)) => req.enrollment_request_name,
        _ => {
            return send_terminal_error(
                &tx,
                TpmError::InvalidConditionState("expected ChallengeRequest as the first message".into()),
            )
            .await
        }
    };

    let (pending, issued) = match begin_challenge(store.as_ref(), &org_id, &name).await {
        Ok(v) => v,
        Err(err) => return send_terminal_error(&tx, err).await,
    };

    let challenge = ServerChallenge {
        payload: Some(server_challenge::Payload::Challenge(Challenge {
            credential_blob: issued.credential_blob,
            encrypted_secret: issued.encrypted_secret,
        })),
    };
    if tx.send(Ok(challenge)).await.is_err() {
        return;
    }

    let second = match recv_with_timeout(&mut inbound, soft_timeout).await {
        Ok(msg) => msg,
        Err(err) => return send_terminal_error(&tx, err).await,
    };

    let secret = match second.payload {
        Some(agent_challenge::Payload::Response(resp)) => resp.secret,
        _ => {
            return send_terminal_error(
                &tx,
                TpmError::InvalidConditionState("expected ChallengeResponse as the second message".into()),
            )
            .await
        }
    };

    match verify_outcome(store.as_ref(), &pending, &secret).await {
        Ok(()) => {
            let _ = tx
                .send(Ok(ServerChallenge {
                    payload: Some(server_challenge::Payload::Success(Success {
                        message: "TPM credential-activation challenge succeeded".to_string(),
                    })),
                }))
                .await;
        }
        Err(err) => send_terminal_error(&tx, err).await,
    }
}

async fn verify_outcome(
    store: &dyn EnrollmentRequestService,
    pending: &PendingChallenge,
    secret: &[u8],
) -> Result<(), TpmError> {
    match verify_response(store, pending, secret).await? {
        ChallengeOutcome::Succeeded => Ok(()),
        ChallengeOutcome::Failed => Err(TpmError::VerificationFailed),
    }
}

async fn recv_with_timeout(
    inbound: &mut Streaming<AgentChallenge>,
    soft_timeout: Duration,
) -> Result<AgentChallenge, TpmError> {
    match tokio::time::timeout(soft_timeout, inbound.message()).await {
        Ok(Ok(Some(msg))) => Ok(msg),
        Ok(Ok(None)) => Err(TpmError::ClientClosed),
        Ok(Err(_)) => Err(TpmError::Io("stream receive failed".into())),
        Err(_) => Err(TpmError::DeadlineExceeded),
    }
}

/// Send the application-level `Error` message, then close the stream with
/// the matching gRPC status — both are mandated by §4.E.
async fn send_terminal_error(tx: &mpsc::Sender<Result<ServerChallenge, Status>>, err: TpmError) {
    let code = err.grpc_code();
    let message = err.to_string();
    let _ = tx
        .send(Ok(ServerChallenge {
            payload: Some(server_challenge::Payload::Error(PbChallengeError { message: message.clone() })),
        }))
        .await;
    let _ = tx.send(Err(Status::new(code, message))).await;
}
