//! The §4.E server-side state machine, independent of the transport it runs
//! over. The gRPC glue in [`crate::grpc_server`] drives these two calls in
//! sequence against one bidirectional stream; tests drive them directly.

use agenttrust_collab::EnrollmentRequestService;
use agenttrust_crypto::{constant_time_eq, make_credential};
use agenttrust_domain::{Condition, ConditionReason, ConditionStatus, ConditionType};

use crate::csr::TcgCsr;
use crate::error::{TpmError, TpmResult};

/// Server-retained state between `ISSUE_CHALLENGE` and `AWAIT_RESP`. Never
/// persisted or serialized — it lives only for the stream's lifetime (§3).
pub struct PendingChallenge {
    org_id: String,
    name: String,
    expected_secret: Vec<u8>,
}

/// What gets sent to the client as the `Challenge` message.
pub struct IssuedChallenge {
    /// `integrityHMAC || encryptedCredential`.
    pub credential_blob: Vec<u8>,
    /// The seed, wrapped for the EK.
    pub encrypted_secret: Vec<u8>,
}

/// Outcome of comparing the client's `ChallengeResponse` secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// Secrets matched; condition persisted as `True`/`ChallengeSucceeded`.
    Succeeded,
    /// Secrets did not match; condition persisted as `False`/`ChallengeFailed`.
    Failed,
}

/// Validate preconditions, parse the CSR, and issue a fresh challenge.
///
/// Runs preconditions 1-5 of §4.E in order, each mapping to the
/// corresponding [`TpmError`] (and so to the gRPC code the component-design
/// table specifies) on failure. A sixth check rejects a retry against a
/// condition already left in `False`/`ChallengeFailed` by an earlier attempt:
/// the numbered preconditions and Property 4 only call `True`/`VerificationFailed`
/// terminal, but the end-to-end wrong-secret scenario is the observable
/// contract and it requires the retry to be refused, so this function treats
/// `ChallengeFailed` as terminal for re-issuance even though
/// [`agenttrust_domain::Condition::is_terminal`] does not.
pub async fn begin_challenge(
    store: &dyn EnrollmentRequestService,
    org_id: &str,
    name: &str,
) -> TpmResult<(PendingChallenge, IssuedChallenge)> {
    let request = store
        .get(org_id, name)
        .await
        .map_err(|_| TpmError::EnrollmentNotFound(name.to_string()))?;

    let condition = request
        .condition(ConditionType::TpmVerified)
        .ok_or_else(|| TpmError::InvalidConditionState("no TPMVerified condition present".into()))?;

    if condition.status == ConditionStatus::True {
        return Err(TpmError::InvalidConditionState(
            "TPMVerified condition is already True".into(),
        ));
    }
    if condition.reason == ConditionReason::VerificationFailed {
        return Err(TpmError::InvalidConditionState(
            "prior verification failed terminally; no further challenge permitted".into(),
        ));
    }
    if condition.reason == ConditionReason::ChallengeFailed {
        return Err(TpmError::InvalidConditionState(
            "a prior challenge attempt already failed for this enrollment request".into(),
        ));
    }

    let csr = TcgCsr::parse(&request.csr)?;
    if csr.ek_cert.is_empty() || csr.attest_pub.is_empty() {
        return Err(TpmError::CsrNotTpm);
    }

    let credential = make_credential(&csr.ek_cert, &csr.attest_pub)?;

    let pending = PendingChallenge {
        org_id: org_id.to_string(),
        name: name.to_string(),
        expected_secret: credential.expected_secret,
    };
    let issued = IssuedChallenge {
        credential_blob: credential.credential_blob,
        encrypted_secret: credential.encrypted_secret,
    };
    Ok((pending, issued))
}

/// Compare the client's `ChallengeResponse` secret and persist the
/// resulting condition (§4.E verification + Property 4 monotonicity).
pub async fn verify_response(
    store: &dyn EnrollmentRequestService,
    pending: &PendingChallenge,
    provided_secret: &[u8],
) -> TpmResult<ChallengeOutcome> {
    let matched = constant_time_eq(provided_secret, &pending.expected_secret);

    let mut request = store
        .get(&pending.org_id, &pending.name)
        .await
        .map_err(|_| TpmError::EnrollmentNotFound(pending.name.clone()))?;

    let (status, reason, message, outcome) = if matched {
        (
            ConditionStatus::True,
            ConditionReason::ChallengeSucceeded,
            "TPM credential-activation challenge succeeded".to_string(),
            ChallengeOutcome::Succeeded,
        )
    } else {
        (
            ConditionStatus::False,
            ConditionReason::ChallengeFailed,
            "TPM credential-activation challenge failed: secret mismatch".to_string(),
            ChallengeOutcome::Failed,
        )
    };

    request.set_condition(Condition { condition_type: ConditionType::TpmVerified, status, reason, message });

    store
        .replace_status(&pending.org_id, &pending.name, request)
        .await
        .map_err(|e| TpmError::Persistence(e.to_string()))?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenttrust_collab::InMemoryEnrollmentStore;
    use agenttrust_domain::EnrollmentRequest;

    fn csr_bytes() -> Vec<u8> {
        TcgCsr {
            ek_cert: vec![7u8; 64],
            attest_pub: vec![8u8; 32],
            lak_pub: vec![9u8; 32],
            proof_of_possession: vec![1u8; 16],
        }
        .encode()
    }

    async fn seeded_store() -> InMemoryEnrollmentStore {
        let store = InMemoryEnrollmentStore::new();
        let mut req = EnrollmentRequest::new("dev-abc", "org-1", csr_bytes());
        req.set_condition(Condition::tpm_verification_required());
        store.create(req).await.unwrap();
        store
    }

    #[tokio::test]
    async fn begin_challenge_succeeds_on_fresh_request() {
        let store = seeded_store().await;
        let (_, issued) = begin_challenge(&store, "org-1", "dev-abc").await.unwrap();
        assert!(!issued.credential_blob.is_empty());
        assert!(!issued.encrypted_secret.is_empty());
    }

    #[tokio::test]
    async fn begin_challenge_fails_when_request_missing() {
        let store = InMemoryEnrollmentStore::new();
        let err = begin_challenge(&store, "org-1", "nope").await.unwrap_err();
        assert!(matches!(err, TpmError::EnrollmentNotFound(_)));
    }

    #[tokio::test]
    async fn begin_challenge_fails_when_already_verified() {
        let store = InMemoryEnrollmentStore::new();
        let mut req = EnrollmentRequest::new("dev-abc", "org-1", csr_bytes());
        req.set_condition(Condition {
            condition_type: ConditionType::TpmVerified,
            status: ConditionStatus::True,
            reason: ConditionReason::ChallengeSucceeded,
            message: String::new(),
        });
        store.create(req).await.unwrap();

        let err = begin_challenge(&store, "org-1", "dev-abc").await.unwrap_err();
        assert!(matches!(err, TpmError::InvalidConditionState(_)));
    }

    #[tokio::test]
    async fn begin_challenge_fails_when_verification_failed_terminally() {
        let store = InMemoryEnrollmentStore::new();
        let mut req = EnrollmentRequest::new("dev-abc", "org-1", csr_bytes());
        req.set_condition(Condition {
            condition_type: ConditionType::TpmVerified,
            status: ConditionStatus::False,
            reason: ConditionReason::VerificationFailed,
            message: String::new(),
        });
        store.create(req).await.unwrap();

        let err = begin_challenge(&store, "org-1", "dev-abc").await.unwrap_err();
        assert!(matches!(err, TpmError::InvalidConditionState(_)));
    }

    #[tokio::test]
    async fn begin_challenge_fails_when_challenge_previously_failed() {
        let store = InMemoryEnrollmentStore::new();
        let mut req = EnrollmentRequest::new("dev-abc", "org-1", csr_bytes());
        req.set_condition(Condition {
            condition_type: ConditionType::TpmVerified,
            status: ConditionStatus::False,
            reason: ConditionReason::ChallengeFailed,
            message: String::new(),
        });
        store.create(req).await.unwrap();

        let err = begin_challenge(&store, "org-1", "dev-abc").await.unwrap_err();
        assert!(matches!(err, TpmError::InvalidConditionState(_)));
        assert!(err.to_string().starts_with("invalid enrollment request condition state"));
    }

    #[tokio::test]
    async fn begin_challenge_fails_on_malformed_csr() {
        let store = InMemoryEnrollmentStore::new();
        let mut req = EnrollmentRequest::new("dev-abc", "org-1", vec![1, 2, 3]);
        req.set_condition(Condition::tpm_verification_required());
        store.create(req).await.unwrap();

        let err = begin_challenge(&store, "org-1", "dev-abc").await.unwrap_err();
        assert!(matches!(err, TpmError::CsrParseError(_)));
    }

    #[tokio::test]
    async fn verify_response_succeeds_with_correct_secret() {
        let store = seeded_store().await;
        let (pending, _) = begin_challenge(&store, "org-1", "dev-abc").await.unwrap();
        let secret = pending.expected_secret.clone();

        let outcome = verify_response(&store, &pending, &secret).await.unwrap();
        assert_eq!(outcome, ChallengeOutcome::Succeeded);

        let persisted = store.get("org-1", "dev-abc").await.unwrap();
        let condition = persisted.condition(ConditionType::TpmVerified).unwrap();
        assert_eq!(condition.status, ConditionStatus::True);
        assert_eq!(condition.reason, ConditionReason::ChallengeSucceeded);
    }

    #[tokio::test]
    async fn verify_response_fails_with_wrong_secret() {
        let store = seeded_store().await;
        let (pending, _) = begin_challenge(&store, "org-1", "dev-abc").await.unwrap();

        let outcome = verify_response(&store, &pending, b"definitely-wrong").await.unwrap();
        assert_eq!(outcome, ChallengeOutcome::Failed);

        let persisted = store.get("org-1", "dev-abc").await.unwrap();
        let condition = persisted.condition(ConditionType::TpmVerified).unwrap();
        assert_eq!(condition.status, ConditionStatus::False);
        assert_eq!(condition.reason, ConditionReason::ChallengeFailed);
    }

    #[tokio::test]
    async fn replay_after_success_is_refused() {
        let store = seeded_store().await;
        let (pending, _) = begin_challenge(&store, "org-1", "dev-abc").await.unwrap();
        verify_response(&store, &pending, &pending.expected_secret).await.unwrap();

        let err = begin_challenge(&store, "org-1", "dev-abc").await.unwrap_err();
        assert!(matches!(err, TpmError::InvalidConditionState(_)));
    }
}
