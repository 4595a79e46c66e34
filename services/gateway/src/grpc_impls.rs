//! Unary gRPC service implementations the §6 interface table names but that
//! don't belong to components A-G proper: `EnrollmentService`,
//! `HealthCheckService`, and `AgentService`. Each is a thin adapter from the
//! wire message shapes onto the `agenttrust-collab` collaborator traits;
//! all three run under the identical `AuthInterceptor` component C installs
//! on every other stream (§4.C).

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use agenttrust_collab::{DeviceService, EnrollmentRequestService};
use agenttrust_domain::{Condition, EnrollmentRequest};
use agenttrust_identity::Identity;
use agenttrust_proto::{
    agent_service_server::AgentService, enrollment_service_server::EnrollmentService,
    health_check_service_server::HealthCheckService, Condition as PbCondition, EnrollmentRequestMessage,
    EnrollmentRequestSpec, GetEnrollmentRequest, GetEnrollmentResponse, GetRenderedSpecRequest,
    GetRenderedSpecResponse, HeartBeatRequest, HeartBeatResponse, RequestEnrollmentRequest,
    RequestEnrollmentResponse, UpdateStatusRequest, UpdateStatusResponse,
};
use tonic::{Request, Response, Status};

/// `EnrollmentService` — enrollment-signer mTLS required (§6).
pub struct EnrollmentServiceImpl {
    store: Arc<dyn EnrollmentRequestService>,
}

impl EnrollmentServiceImpl {
    /// Construct the service against `store`.
    pub fn new(store: Arc<dyn EnrollmentRequestService>) -> Self {
        Self { store }
    }
}

#[tonic::async_trait]
impl EnrollmentService for EnrollmentServiceImpl {
    async fn request_enrollment(
        &self,
        request: Request<RequestEnrollmentRequest>,
    ) -> Result<Response<RequestEnrollmentResponse>, Status> {
        let org_id = require_enrollment_org(&request)?;
        let spec = request
            .into_inner()
            .spec
            .ok_or_else(|| Status::invalid_argument("missing enrollment request spec"))?;

        let name = uuid::Uuid::new_v4().to_string();
        let mut request = EnrollmentRequest::new(name, org_id, spec.csr);
        request.set_condition(Condition::tpm_verification_required());

        self.store
            .create(request.clone())
            .await
            .map_err(|err| Status::internal(err.to_string()))?;

        Ok(Response::new(RequestEnrollmentResponse { request: Some(to_proto(&request)) }))
    }

    async fn get_enrollment(
        &self,
        request: Request<GetEnrollmentRequest>,
    ) -> Result<Response<GetEnrollmentResponse>, Status> {
        let org_id = require_enrollment_org(&request)?;
        let name = request.into_inner().name;
        let found = self
            .store
            .get(&org_id, &name)
            .await
            .map_err(|_| Status::not_found(format!("enrollment request {name:?} not found")))?;
        Ok(Response::new(GetEnrollmentResponse { request: Some(to_proto(&found)) }))
    }
}

fn require_enrollment_org<T>(request: &Request<T>) -> Result<String, Status> {
    match request.extensions().get::<Identity>() {
        Some(Identity::Enrollment(enrollment)) => Ok(enrollment.org_id.clone()),
        Some(Identity::Agent(_)) => Err(Status::permission_denied("enrollment-signer certificate required")),
        None => Err(Status::unauthenticated("no identity attached to request")),
    }
}

fn to_proto(request: &EnrollmentRequest) -> EnrollmentRequestMessage {
    EnrollmentRequestMessage {
        name: request.name.clone(),
        org_id: request.org_id.clone(),
        spec: Some(EnrollmentRequestSpec { csr: request.csr.clone() }),
        conditions: request
            .conditions
            .iter()
            .map(|c| PbCondition {
                condition_type: format!("{:?}", c.condition_type),
                status: format!("{:?}", c.status),
                reason: format!("{:?}", c.reason),
                message: c.message.clone(),
            })
            .collect(),
    }
}

/// `HealthCheckService` — liveness probe, no identity required (§6).
#[derive(Default)]
pub struct HealthCheckServiceImpl;

#[tonic::async_trait]
impl HealthCheckService for HealthCheckServiceImpl {
    async fn heartbeat(
        &self,
        _request: Request<HeartBeatRequest>,
    ) -> Result<Response<HeartBeatResponse>, Status> {
        let server_time_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Ok(Response::new(HeartBeatResponse { server_time_unix }))
    }
}

/// `AgentService` — device-management-signer mTLS required; the configured
/// device name must equal the cert-derived fingerprint (§6, §8 Property 3).
pub struct AgentServiceImpl {
    devices: Arc<dyn DeviceService>,
}

impl AgentServiceImpl {
    /// Construct the service against `devices`.
    pub fn new(devices: Arc<dyn DeviceService>) -> Self {
        Self { devices }
    }
}

#[tonic::async_trait]
impl AgentService for AgentServiceImpl {
    async fn get_rendered_spec(
        &self,
        request: Request<GetRenderedSpecRequest>,
    ) -> Result<Response<GetRenderedSpecResponse>, Status> {
        let (org_id, fingerprint) = require_agent_binding(&request, &request.get_ref().device_name)?;
        let rendered = self
            .devices
            .get_rendered(&org_id, &fingerprint)
            .await
            .map_err(|_| Status::not_found(format!("device {fingerprint:?} not found")))?;
        Ok(Response::new(GetRenderedSpecResponse { rendered }))
    }

    async fn update_status(
        &self,
        request: Request<UpdateStatusRequest>,
    ) -> Result<Response<UpdateStatusResponse>, Status> {
        let (org_id, fingerprint) = require_agent_binding(&request, &request.get_ref().device_name)?;
        let status = request.get_ref().status.clone();
        self.devices
            .update_status(&org_id, &fingerprint, status)
            .await
            .map_err(|err| Status::internal(err.to_string()))?;
        Ok(Response::new(UpdateStatusResponse {}))
    }
}

/// Resolve the identity attached to `request` and enforce §8 Property 3:
/// the caller-supplied `device_name` must equal the cert-derived fingerprint.
fn require_agent_binding<T>(request: &Request<T>, device_name: &str) -> Result<(String, String), Status> {
    match request.extensions().get::<Identity>() {
        Some(Identity::Agent(agent)) if agent.device_fingerprint == device_name => {
            Ok((agent.org_id.clone(), agent.device_fingerprint.clone()))
        }
        Some(Identity::Agent(agent)) => Err(Status::unauthenticated(format!(
            "device name {device_name:?} does not match certificate fingerprint {:?}",
            agent.device_fingerprint
        ))),
        Some(Identity::Enrollment(_)) => {
            Err(Status::permission_denied("device-management-signer certificate required"))
        }
        None => Err(Status::unauthenticated("no identity attached to request")),
    }
}
