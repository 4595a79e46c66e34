//! Wrong-secret path (§4.E): an incorrect `ChallengeResponse` persists
//! `TPMVerified=False/ChallengeFailed` and surfaces a terminal gRPC error.
//! A later attempt against the same request — even on a fresh stream, even
//! answered correctly — is refused with `invalid enrollment request
//! condition state`, per the wrong-secret-failure end-to-end scenario.

mod support;

use agenttrust_domain::{ConditionReason, ConditionStatus, ConditionType};
use agenttrust_proto::enrollment_challenge_service_client::EnrollmentChallengeServiceClient;
use agenttrust_proto::{agent_challenge, server_challenge, AgentChallenge, ChallengeRequest, ChallengeResponseMessage};
use agenttrust_domain::{Condition, EnrollmentRequest};
use agenttrust_tpm::csr::TcgCsr;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Code;

use support::{HarnessOptions, TestGateway};

async fn run_challenge(
    gateway: &TestGateway,
    leaf: &support::certs::Leaf,
    name: &str,
    secret: Vec<u8>,
) -> Result<(), tonic::Status> {
    let channel = support::grpc_channel(gateway, leaf).await;
    let mut client = EnrollmentChallengeServiceClient::new(channel);

    let (tx, rx) = mpsc::channel(4);
    let response = client.tpm_challenge(ReceiverStream::new(rx)).await.unwrap();
    let mut inbound = response.into_inner();

    tx.send(AgentChallenge {
        payload: Some(agent_challenge::Payload::Request(ChallengeRequest { enrollment_request_name: name.to_string() })),
    })
    .await
    .unwrap();

    let first = inbound.message().await.unwrap().unwrap();
    assert!(matches!(first.payload, Some(server_challenge::Payload::Challenge(_))));

    tx.send(AgentChallenge { payload: Some(agent_challenge::Payload::Response(ChallengeResponseMessage { secret })) })
        .await
        .unwrap();

    match inbound.message().await {
        Ok(Some(msg)) => match msg.payload {
            Some(server_challenge::Payload::Success(_)) => Ok(()),
            Some(server_challenge::Payload::Error(_)) | None => {
                // The stream also terminates with a matching gRPC status.
                match inbound.message().await {
                    Err(status) => Err(status),
                    _ => Err(tonic::Status::unknown("expected terminal status after Error")),
                }
            }
            other => panic!("unexpected payload {other:?}"),
        },
        Err(status) => Err(status),
        Ok(None) => Err(tonic::Status::unknown("stream closed with no terminal message")),
    }
}

#[tokio::test]
async fn wrong_secret_fails_and_permanently_blocks_retry() {
    let gateway = TestGateway::start_with(HarnessOptions::default()).await;

    let ek_cert = vec![55u8; 64];
    let attest_pub = vec![66u8; 32];
    let csr = TcgCsr {
        ek_cert: ek_cert.clone(),
        attest_pub: attest_pub.clone(),
        lak_pub: vec![77u8; 32],
        proof_of_possession: vec![88u8; 16],
    }
    .encode();

    let org_id = "org-enroll-wrong";
    let name = "dev-enroll-wrong";
    let mut request = EnrollmentRequest::new(name, org_id, csr);
    request.set_condition(Condition::tpm_verification_required());
    gateway.enrollment_store.create(request).await.unwrap();

    let leaf = gateway.enrollment_ca.issue_enrollment_leaf("", Some(org_id));

    let err = run_challenge(&gateway, &leaf, name, b"not-the-secret".to_vec()).await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let persisted = gateway.enrollment_store.get(org_id, name).await.unwrap();
    let condition = persisted.condition(ConditionType::TpmVerified).unwrap();
    assert_eq!(condition.status, ConditionStatus::False);
    assert_eq!(condition.reason, ConditionReason::ChallengeFailed);

    // A second attempt on a fresh stream is refused outright, even though
    // this time it would answer correctly: the server never gets as far as
    // issuing a new `Challenge`, since the precondition check rejects the
    // request before any credential material is generated.
    let channel = support::grpc_channel(&gateway, &leaf).await;
    let mut client = EnrollmentChallengeServiceClient::new(channel);
    let (tx, rx) = mpsc::channel(4);
    let response = client.tpm_challenge(ReceiverStream::new(rx)).await.unwrap();
    let mut inbound = response.into_inner();
    tx.send(AgentChallenge {
        payload: Some(agent_challenge::Payload::Request(ChallengeRequest { enrollment_request_name: name.to_string() })),
    })
    .await
    .unwrap();

    let first = inbound.message().await.unwrap().unwrap();
    match first.payload {
        Some(server_challenge::Payload::Error(err)) => {
            assert!(err.message.starts_with("invalid enrollment request condition state"));
        }
        other => panic!("expected Error, got {other:?}"),
    }
    let status = inbound.message().await.unwrap_err();
    assert_eq!(status.code(), Code::FailedPrecondition);

    let persisted = gateway.enrollment_store.get(org_id, name).await.unwrap();
    let condition = persisted.condition(ConditionType::TpmVerified).unwrap();
    assert_eq!(condition.status, ConditionStatus::False);
    assert_eq!(condition.reason, ConditionReason::ChallengeFailed);
}
