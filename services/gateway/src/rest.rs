//! REST handlers for the agent-facing HTTPS endpoints enumerated in §6.
//!
//! Persistence, device CRUD, and CSR storage are all peripheral to the core
//! proper (§1); these handlers are thin translations from HTTP onto the
//! `agenttrust-collab` collaborator traits, the same way the gRPC unary
//! services in [`crate::grpc_impls`] are. [`crate::middleware_stack`] is what
//! actually enforces authentication and device-name binding before a handler
//! body ever runs.

use std::sync::Arc;

use agenttrust_collab::{CsrRecord, DeviceService, EnrollmentRequestService, InMemoryCsrStore};
use agenttrust_domain::{Condition, EnrollmentRequest};
use agenttrust_identity::{Identity, IdentityCache};
use agenttrust_middleware::{check_device_name_binding, AuthLayer, IdentityKind};
use axum::extract::{Extension, Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Shared state for every REST handler.
pub struct AppState {
    /// `EnrollmentRequestService` collaborator (§6).
    pub enrollment_requests: Arc<dyn EnrollmentRequestService>,
    /// `DeviceService` collaborator (§6).
    pub devices: Arc<dyn DeviceService>,
    /// CSR stand-in store (ambient; not one of the four named collaborators).
    pub csrs: InMemoryCsrStore,
}

/// Build the agent-facing REST router (§6). Each route group carries its own
/// [`AuthLayer`] demanding the identity kind that group's endpoints require
/// (§4.C: "Agent endpoints demand AgentIdentity. Enrollment endpoints demand
/// EnrollmentIdentity"); `route_layer` runs the layer only for matched
/// routes, so a 404 never pays the auth cost and a route in the wrong group
/// never sees the wrong kind's layer. Rate limiting is installed by the
/// caller uniformly across the merged router (§4.G).
pub fn router(state: Arc<AppState>, cache: Arc<IdentityCache>) -> Router {
    let enrollment_routes = Router::new()
        .route("/api/v1/enrollmentrequests", post(create_enrollment_request))
        .route("/api/v1/enrollmentrequests/:name", get(get_enrollment_request))
        .route_layer(AuthLayer::new(Arc::clone(&cache), IdentityKind::Enrollment));

    let agent_routes = Router::new()
        .route("/api/v1/certificatesigningrequests", post(create_csr))
        .route("/api/v1/certificatesigningrequests/:name", get(get_csr))
        .route("/api/v1/devices/:name/rendered", get(get_rendered_spec))
        .route("/api/v1/devices/:name/status", put(put_device_status).patch(patch_device_status))
        .route_layer(AuthLayer::new(Arc::clone(&cache), IdentityKind::Agent));

    enrollment_routes.merge(agent_routes).with_state(state)
}

/// §7 error envelope: `{ code, message, reason }`.
fn error_response(status: StatusCode, reason: &str, message: impl Into<String>) -> Response {
    (status, Json(json!({ "code": status.as_u16(), "message": message.into(), "reason": reason }))).into_response()
}

#[derive(Debug, Deserialize)]
struct EnrollmentRequestBody {
    spec: EnrollmentRequestSpecBody,
}

#[derive(Debug, Deserialize)]
struct EnrollmentRequestSpecBody {
    csr: String, // base64, matching the REST JSON convention for proto `bytes` fields
}

#[derive(Debug, Serialize)]
struct EnrollmentRequestView {
    name: String,
    #[serde(rename = "orgId")]
    org_id: String,
    status: serde_json::Value,
}

fn view_of(request: &EnrollmentRequest) -> EnrollmentRequestView {
    let conditions: Vec<_> = request
        .conditions
        .iter()
        .map(|c| {
            json!({
                "type": format!("{:?}", c.condition_type),
                "status": format!("{:?}", c.status),
                "reason": format!("{:?}", c.reason),
                "message": c.message,
            })
        })
        .collect();
    EnrollmentRequestView { name: request.name.clone(), org_id: request.org_id.clone(), status: json!({ "conditions": conditions }) }
}

/// `POST /api/v1/enrollmentrequests` — enrollment-signer cert required (§6).
async fn create_enrollment_request(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<EnrollmentRequestBody>,
) -> Response {
    let org_id = identity.org_id().to_string();
    let csr = match base64_decode(&body.spec.csr) {
        Ok(bytes) => bytes,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "BadRequest", "spec.csr is not valid base64"),
    };

    let name = Uuid::new_v4().to_string();
    let mut request = EnrollmentRequest::new(name, org_id, csr);
    request.set_condition(Condition::tpm_verification_required());

    match state.enrollment_requests.create(request.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(view_of(&request))).into_response(),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "InternalError", err.to_string()),
    }
}

/// `GET /api/v1/enrollmentrequests/{name}` — enrollment-signer cert required (§6).
async fn get_enrollment_request(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
) -> Response {
    match state.enrollment_requests.get(identity.org_id(), &name).await {
        Ok(request) => Json(view_of(&request)).into_response(),
        Err(_) => error_response(StatusCode::NOT_FOUND, "NotFound", format!("enrollment request {name:?} not found")),
    }
}

#[derive(Debug, Deserialize)]
struct CsrBody {
    csr: String,
}

#[derive(Debug, Serialize)]
struct CsrView {
    name: String,
}

/// `POST /api/v1/certificatesigningrequests` — agent cert required (§6).
async fn create_csr(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CsrBody>,
) -> Response {
    let csr = match base64_decode(&body.csr) {
        Ok(bytes) => bytes,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "BadRequest", "csr is not valid base64"),
    };
    let name = Uuid::new_v4().to_string();
    state.csrs.create(CsrRecord { name: name.clone(), org_id: identity.org_id().to_string(), csr });
    (StatusCode::CREATED, Json(CsrView { name })).into_response()
}

/// `GET /api/v1/certificatesigningrequests/{name}` — agent cert required (§6).
async fn get_csr(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
) -> Response {
    match state.csrs.get(identity.org_id(), &name) {
        Ok(record) => Json(CsrView { name: record.name }).into_response(),
        Err(_) => error_response(StatusCode::NOT_FOUND, "NotFound", format!("csr {name:?} not found")),
    }
}

/// `GET /api/v1/devices/{name}/rendered` — agent cert; `name == fingerprint` (§6, §8 Property 3).
async fn get_rendered_spec(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
) -> Response {
    if let Err(err) = check_device_name_binding(&identity, &name) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized", err.to_string());
    }
    match state.devices.get_rendered(identity.org_id(), &name).await {
        Ok(rendered) => Json(json!({ "rendered": base64_encode(&rendered) })).into_response(),
        Err(_) => error_response(StatusCode::NOT_FOUND, "NotFound", format!("device {name:?} not found")),
    }
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

/// `PUT /api/v1/devices/{name}/status` — agent cert; `name == fingerprint` (§6, §8 Property 3).
async fn put_device_status(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
    Json(body): Json<StatusBody>,
) -> Response {
    if let Err(err) = check_device_name_binding(&identity, &name) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized", err.to_string());
    }
    let status = match base64_decode(&body.status) {
        Ok(bytes) => bytes,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "BadRequest", "status is not valid base64"),
    };
    match state.devices.update_status(identity.org_id(), &name, status).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "InternalError", err.to_string()),
    }
}

/// `PATCH /api/v1/devices/{name}/status` — agent cert; `name == fingerprint` (§6, §8 Property 3).
async fn patch_device_status(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
    Json(body): Json<StatusBody>,
) -> Response {
    if let Err(err) = check_device_name_binding(&identity, &name) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized", err.to_string());
    }
    let status = match base64_decode(&body.status) {
        Ok(bytes) => bytes,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "BadRequest", "status is not valid base64"),
    };
    match state.devices.patch(identity.org_id(), &name, status).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "InternalError", err.to_string()),
    }
}

fn base64_decode(raw: &str) -> Result<Vec<u8>, ()> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(raw).map_err(|_| ())
}

fn base64_encode(raw: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(raw)
}
