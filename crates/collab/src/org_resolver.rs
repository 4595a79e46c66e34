//! `OrgResolver { Resolve(ctx, cert|query) → uuid }` (§6).
//!
//! Most org resolution already happens inside [`agenttrust_identity`] (the
//! cert extension, falling back to a configured default org id). This trait
//! covers the remaining case §6 calls out: resolving an org id from a query
//! parameter for REST paths that accept one explicitly, independent of the
//! peer certificate.

/// Resolves an organization id from something other than the peer
/// certificate's own extension (which `PeerCertIdentifier` already handles).
pub trait OrgResolver: Send + Sync {
    /// Resolve `query_org_id`, falling back to the configured default when
    /// the caller supplied none.
    fn resolve(&self, query_org_id: Option<&str>) -> String;
}

/// An `OrgResolver` that always falls back to one fixed default organization.
#[derive(Debug, Clone)]
pub struct StaticOrgResolver {
    default_org_id: String,
}

impl StaticOrgResolver {
    /// Construct a resolver with the given default org id.
    pub fn new(default_org_id: impl Into<String>) -> Self {
        Self { default_org_id: default_org_id.into() }
    }
}

impl OrgResolver for StaticOrgResolver {
    fn resolve(&self, query_org_id: Option<&str>) -> String {
        query_org_id
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.default_org_id.clone())
    }
}
