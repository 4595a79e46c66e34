//! Components C and D — `AuthMiddleware` (§4.C) and `RateLimiter` (§4.D).
//!
//! [`classify`] is the single identity-classification function both the REST
//! [`AuthLayer`] and gRPC [`AuthInterceptor`] call through, so the two
//! transport paths cannot drift. [`device_binding`] implements the
//! `/devices/{name}/...` fingerprint check (§8 Property 3). [`RateLimiter`]
//! and [`RateLimitLayer`] implement the token-bucket limiter with
//! trusted-proxy header rewriting.

#![warn(missing_docs)]

pub mod auth_layer;
pub mod classify;
pub mod device_binding;
pub mod error;
pub mod grpc_interceptor;
pub mod rate_limit;
pub mod rate_limit_layer;

pub use auth_layer::{middleware_error_response, AuthLayer, AuthService};
pub use classify::{classify, IdentityKind, PeerCertificateDer};
pub use device_binding::check_device_name_binding;
pub use error::{MiddlewareError, MiddlewareResult};
pub use grpc_interceptor::AuthInterceptor;
pub use rate_limit::{resolve_client_ip, RateLimitDecision, RateLimitKey, RateLimiter, TrustedProxies};
pub use rate_limit_layer::{PeerSocketAddr, RateLimitLayer, RateLimitService};
