//! Property 3 (device-name binding): for `/devices/{name}/...` routes, the
//! cert-derived fingerprint must equal the `{name}` path parameter.

use agenttrust_identity::Identity;

use crate::error::MiddlewareError;

/// Check that `path_name` (the `{name}` URL segment) matches the
/// fingerprint carried by `identity`. Only meaningful for [`Identity::Agent`];
/// callers must have already rejected [`Identity::Enrollment`] via
/// [`crate::IdentityKind::Agent`] before reaching this check.
pub fn check_device_name_binding(identity: &Identity, path_name: &str) -> Result<(), MiddlewareError> {
    let fingerprint = identity.device_fingerprint().unwrap_or_default();
    if fingerprint == path_name {
        Ok(())
    } else {
        Err(MiddlewareError::DeviceNameMismatch {
            path_name: path_name.to_string(),
            cert_fingerprint: fingerprint.to_string(),
        })
    }
}
