//! Component B — `IdentityCache`: a TTL-bounded map from certificate
//! fingerprint to [`Identity`], per §4.B.

use crate::cert::Certificate;
use crate::identity::{Identity, PeerCertIdentifier};
use crate::error::IdentityResult;
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct CacheEntry {
    identity: Identity,
    inserted_at: Instant,
}

/// Wraps [`PeerCertIdentifier`] behind a TTL cache keyed by the hex of the
/// leaf certificate's raw DER bytes.
///
/// `Get` is the only operation callers need: it returns the cached value iff
/// both the cache TTL and the certificate's own `notAfter` are still in the
/// future, otherwise it evicts and recomputes. Built on [`DashMap`] so
/// concurrent gets for distinct keys never contend; gets for the *same*
/// stale key may both recompute (duplicate computations yield the same
/// result, since [`PeerCertIdentifier::identify`] is pure) — coalescing is
/// not implemented, matching the "recommended but not mandatory" language of
/// §4.B.
pub struct IdentityCache {
    identifier: PeerCertIdentifier,
    ttl: Duration,
    entries: DashMap<String, CacheEntry>,
}

impl IdentityCache {
    /// Construct a cache bound to `identifier` with the given TTL.
    pub fn new(identifier: PeerCertIdentifier, ttl: Duration) -> Self {
        Self {
            identifier,
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Resolve `cert` to an [`Identity`], consulting the cache first.
    ///
    /// `now_unix` is the caller-supplied wall-clock time (Unix seconds),
    /// threaded through rather than read from `SystemTime::now()` so tests
    /// can exercise expiry deterministically.
    pub fn get(&self, cert: &Certificate, now_unix: i64) -> IdentityResult<Identity> {
        let key = cert.der_fingerprint_hex();

        if let Some(entry) = self.entries.get(&key) {
            let ttl_fresh = entry.inserted_at.elapsed() < self.ttl;
            let cert_fresh = entry.identity.not_after() > now_unix;
            if ttl_fresh && cert_fresh {
                return Ok(entry.identity.clone());
            }
        }

        // Either a miss or a stale hit: evict, recompute, restore.
        self.entries.remove(&key);
        let identity = self.identifier.identify(cert, now_unix)?;
        self.entries.insert(
            key,
            CacheEntry {
                identity: identity.clone(),
                inserted_at: Instant::now(),
            },
        );
        Ok(identity)
    }

    /// Number of entries currently cached, stale or not. Useful for tests
    /// and for the background eviction sweep's metrics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Sweep every entry, dropping anything past its TTL or its
    /// certificate's `notAfter`. Intended to be driven by a periodic
    /// background task started alongside the middleware, per §5's
    /// "background eviction timer" shared-resource policy.
    pub fn evict_expired(&self, now_unix: i64) {
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() < self.ttl && entry.identity.not_after() > now_unix);
    }
}
