//! The `EnrollmentRequest` persistent record and its `TPMVerified` condition,
//! per §3. Persistence itself is out of scope (§1); this module only defines
//! the shape the TPM challenge subsystem reads and writes through the
//! `EnrollmentRequestService` collaborator trait.

use serde::{Deserialize, Serialize};

/// A device's bootstrap request: the raw TCG-CSR plus a condition list the
/// challenge subsystem transitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnrollmentRequest {
    /// Request name — also the device's future fingerprint once approved.
    pub name: String,
    /// Organization the request belongs to.
    pub org_id: String,
    /// Raw TCG-CSR bytes, as submitted via `POST /enrollmentrequests`.
    pub csr: Vec<u8>,
    /// Conditions recorded against this request.
    pub conditions: Vec<Condition>,
}

impl EnrollmentRequest {
    /// Construct a freshly submitted request with no conditions set yet.
    pub fn new(name: impl Into<String>, org_id: impl Into<String>, csr: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            org_id: org_id.into(),
            csr,
            conditions: Vec::new(),
        }
    }

    /// Look up a condition by type.
    pub fn condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.condition_type == condition_type)
    }

    /// Insert or replace the condition of the same type.
    pub fn set_condition(&mut self, condition: Condition) {
        if let Some(existing) = self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition.condition_type)
        {
            *existing = condition;
        } else {
            self.conditions.push(condition);
        }
    }
}

/// The only condition type the core currently writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionType {
    /// Whether the device has proven TPM possession of its EK/AK pair.
    TpmVerified,
}

/// A single condition entry: status plus a reason code explaining it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Which condition this is.
    pub condition_type: ConditionType,
    /// Current status.
    pub status: ConditionStatus,
    /// Why the status is what it is.
    pub reason: ConditionReason,
    /// Free-text message for operators.
    pub message: String,
}

impl Condition {
    /// Construct the initial `TPMVerified=False/ChallengeRequired` condition
    /// a freshly created enrollment request carries.
    pub fn tpm_verification_required() -> Self {
        Condition {
            condition_type: ConditionType::TpmVerified,
            status: ConditionStatus::False,
            reason: ConditionReason::ChallengeRequired,
            message: "awaiting TPM credential-activation challenge".to_string(),
        }
    }

    /// `true` if this condition is `True` or terminally `VerificationFailed`
    /// — the monotonicity boundary of Property 4: once here, the challenge
    /// protocol must refuse to run again.
    pub fn is_terminal(&self) -> bool {
        self.status == ConditionStatus::True || self.reason == ConditionReason::VerificationFailed
    }
}

/// Condition status, per the Kubernetes-style tri-state convention the
/// reference workspace uses elsewhere (though only `True`/`False` appear in
/// this subsystem; `Unknown` exists for forward compatibility with other
/// condition types a full implementation would carry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    /// Condition holds.
    True,
    /// Condition does not hold.
    False,
    /// Status has not yet been determined.
    Unknown,
}

/// Why a `TPMVerified` condition has the status it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionReason {
    /// Device has not yet opened a challenge stream.
    ChallengeRequired,
    /// Device completed the challenge-response exchange successfully.
    ChallengeSucceeded,
    /// Device responded with the wrong secret.
    ChallengeFailed,
    /// An earlier, non-challenge verification stage rejected the request —
    /// terminal; no further challenge is permitted (§4.E precondition 4).
    VerificationFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_request_carries_no_conditions() {
        let req = EnrollmentRequest::new("dev-1", "org-1", vec![1, 2, 3]);
        assert!(req.condition(ConditionType::TpmVerified).is_none());
    }

    #[test]
    fn set_condition_replaces_existing_of_same_type() {
        let mut req = EnrollmentRequest::new("dev-1", "org-1", vec![]);
        req.set_condition(Condition::tpm_verification_required());
        assert_eq!(req.conditions.len(), 1);

        req.set_condition(Condition {
            condition_type: ConditionType::TpmVerified,
            status: ConditionStatus::True,
            reason: ConditionReason::ChallengeSucceeded,
            message: "ok".to_string(),
        });
        assert_eq!(req.conditions.len(), 1);
        assert_eq!(
            req.condition(ConditionType::TpmVerified).unwrap().status,
            ConditionStatus::True
        );
    }

    #[test]
    fn terminal_conditions_per_property_4() {
        let succeeded = Condition {
            condition_type: ConditionType::TpmVerified,
            status: ConditionStatus::True,
            reason: ConditionReason::ChallengeSucceeded,
            message: String::new(),
        };
        assert!(succeeded.is_terminal());

        let verification_failed = Condition {
            condition_type: ConditionType::TpmVerified,
            status: ConditionStatus::False,
            reason: ConditionReason::VerificationFailed,
            message: String::new(),
        };
        assert!(verification_failed.is_terminal());

        let challenge_failed = Condition {
            condition_type: ConditionType::TpmVerified,
            status: ConditionStatus::False,
            reason: ConditionReason::ChallengeFailed,
            message: String::new(),
        };
        assert!(!challenge_failed.is_terminal());
    }
}
