//! Component D — `RateLimiter`: per-IP / per-identity / per-device token
//! bucket with trusted-proxy IP rewriting (§4.D).

use std::net::IpAddr;
use std::str::FromStr;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use http::HeaderMap;
use ipnet::IpNet;

/// A list of CIDRs and literal IPs (v4 and v6) permitted to have their
/// forwarding headers trusted.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies {
    nets: Vec<IpNet>,
}

impl TrustedProxies {
    /// Parse `entries` (CIDRs or bare IPs, the latter widened to a /32 or
    /// /128) from config; unparsable entries are skipped rather than
    /// failing startup, since a typo'd proxy entry should degrade to
    /// "untrusted", not crash the process.
    pub fn parse(entries: &[String]) -> Self {
        let nets = entries
            .iter()
            .filter_map(|entry| {
                IpNet::from_str(entry)
                    .ok()
                    .or_else(|| IpAddr::from_str(entry).ok().map(IpNet::from))
            })
            .collect();
        Self { nets }
    }

    /// `true` if `ip` falls within any configured trusted-proxy range.
    pub fn contains(&self, ip: IpAddr) -> bool {
        self.nets.iter().any(|net| net.contains(&ip))
    }
}

/// Resolve the client address to rate-limit by, given the directly connected
/// TCP peer address, the request headers, and the trusted-proxy list.
///
/// From an untrusted peer, forwarding headers are silently ignored
/// (§8 Property 8). From a trusted peer, headers are consulted in priority
/// order `True-Client-IP > X-Real-IP > X-Forwarded-For[0]`; each candidate is
/// parsed and validated as an IP, falling through to the next on failure,
/// keeping the original peer address if none parse.
pub fn resolve_client_ip(peer_ip: IpAddr, headers: &HeaderMap, trusted: &TrustedProxies) -> IpAddr {
    if !trusted.contains(peer_ip) {
        return peer_ip;
    }

    for header_name in ["True-Client-IP", "X-Real-IP"] {
        if let Some(candidate) = header_value_as_ip(headers, header_name) {
            return candidate;
        }
    }

    if let Some(raw) = headers.get("X-Forwarded-For").and_then(|v| v.to_str().ok()) {
        if let Some(first) = raw.split(',').next() {
            if let Ok(ip) = first.trim().parse::<IpAddr>() {
                return ip;
            }
        }
    }

    peer_ip
}

fn header_value_as_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Which identifier an endpoint rate-limits by, each with a fallback to IP
/// if the preferred key is unavailable (§4.D).
#[derive(Debug, Clone)]
pub enum RateLimitKey {
    /// Keyed purely by (post-rewrite) client IP.
    Ip(IpAddr),
    /// Keyed by authenticated identity, falling back to IP if absent.
    Identity { label: Option<String>, fallback_ip: IpAddr },
    /// Keyed by device fingerprint, falling back to IP if absent.
    DeviceFingerprint { fingerprint: Option<String>, fallback_ip: IpAddr },
}

impl RateLimitKey {
    fn bucket_key(&self) -> String {
        match self {
            RateLimitKey::Ip(ip) => format!("ip:{ip}"),
            RateLimitKey::Identity { label: Some(l), .. } => format!("id:{l}"),
            RateLimitKey::Identity { label: None, fallback_ip } => format!("ip:{fallback_ip}"),
            RateLimitKey::DeviceFingerprint { fingerprint: Some(fp), .. } => format!("fp:{fp}"),
            RateLimitKey::DeviceFingerprint { fingerprint: None, fallback_ip } => {
                format!("ip:{fallback_ip}")
            }
        }
    }
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Outcome of a rate-limit check, carrying everything needed to render the
/// §4.D response headers / 429 envelope.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    /// Whether the request is allowed through.
    pub allowed: bool,
    /// Configured request budget per window (`X-RateLimit-Limit`).
    pub limit: u32,
    /// Tokens remaining after this check (`X-RateLimit-Remaining`).
    pub remaining: u32,
    /// Seconds until the window fully resets (`X-RateLimit-Reset` / `Retry-After`).
    pub reset_secs: u64,
}

/// Token-bucket rate limiter: `requests` tokens refilled continuously over
/// `window`, one bucket per [`RateLimitKey`].
pub struct RateLimiter {
    capacity: f64,
    window: Duration,
    refill_per_sec: f64,
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    /// Construct a limiter allowing `requests` per `window`.
    pub fn new(requests: u32, window: Duration) -> Self {
        let capacity = requests.max(1) as f64;
        let window_secs = window.as_secs_f64().max(0.001);
        Self {
            capacity,
            window,
            refill_per_sec: capacity / window_secs,
            buckets: DashMap::new(),
        }
    }

    /// Consume one token for `key`, refilling lazily based on elapsed time
    /// since the bucket's last access (§4.D: "no background sweep thread
    /// needed for correctness").
    pub fn check(&self, key: &RateLimitKey) -> RateLimitDecision {
        let bucket_key = key.bucket_key();
        let now = Instant::now();

        let mut entry = self.buckets.entry(bucket_key).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: now,
        });

        let elapsed = now.duration_since(entry.last_refill).as_secs_f64();
        entry.tokens = (entry.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        entry.last_refill = now;

        let allowed = entry.tokens >= 1.0;
        if allowed {
            entry.tokens -= 1.0;
        }

        RateLimitDecision {
            allowed,
            limit: self.capacity as u32,
            remaining: entry.tokens.max(0.0) as u32,
            reset_secs: self.window.as_secs().max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn untrusted_peer_headers_are_ignored_property_8() {
        let trusted = TrustedProxies::parse(&[]);
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", HeaderValue::from_static("10.0.0.9"));
        let peer: IpAddr = "203.0.113.5".parse().unwrap();

        let with_header = resolve_client_ip(peer, &headers, &trusted);
        let without_header = resolve_client_ip(peer, &HeaderMap::new(), &trusted);
        assert_eq!(with_header, without_header);
        assert_eq!(with_header, peer);
    }

    #[test]
    fn trusted_peer_header_priority_true_client_ip_wins() {
        let trusted = TrustedProxies::parse(&["203.0.113.0/24".to_string()]);
        let mut headers = HeaderMap::new();
        headers.insert("True-Client-IP", HeaderValue::from_static("198.51.100.1"));
        headers.insert("X-Real-IP", HeaderValue::from_static("198.51.100.2"));
        let peer: IpAddr = "203.0.113.5".parse().unwrap();

        let resolved = resolve_client_ip(peer, &headers, &trusted);
        assert_eq!(resolved.to_string(), "198.51.100.1");
    }

    #[test]
    fn trusted_peer_falls_through_invalid_headers() {
        let trusted = TrustedProxies::parse(&["203.0.113.0/24".to_string()]);
        let mut headers = HeaderMap::new();
        headers.insert("True-Client-IP", HeaderValue::from_static("not-an-ip"));
        headers.insert("X-Forwarded-For", HeaderValue::from_static("198.51.100.9, 10.0.0.1"));
        let peer: IpAddr = "203.0.113.5".parse().unwrap();

        let resolved = resolve_client_ip(peer, &headers, &trusted);
        assert_eq!(resolved.to_string(), "198.51.100.9");
    }

    #[test]
    fn trusted_peer_keeps_original_when_nothing_parses() {
        let trusted = TrustedProxies::parse(&["203.0.113.0/24".to_string()]);
        let headers = HeaderMap::new();
        let peer: IpAddr = "203.0.113.5".parse().unwrap();
        assert_eq!(resolve_client_ip(peer, &headers, &trusted), peer);
    }

    #[test]
    fn token_bucket_allows_up_to_limit_then_blocks() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let key = RateLimitKey::Ip("127.0.0.1".parse().unwrap());

        let first = limiter.check(&key);
        let second = limiter.check(&key);
        let third = limiter.check(&key);

        assert!(first.allowed);
        assert_eq!(first.remaining, 1);
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);
        assert!(!third.allowed);
    }

    #[test]
    fn distinct_keys_have_independent_buckets() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let a = RateLimitKey::Ip("127.0.0.1".parse().unwrap());
        let b = RateLimitKey::Ip("127.0.0.2".parse().unwrap());
        assert!(limiter.check(&a).allowed);
        assert!(limiter.check(&b).allowed);
    }

    #[test]
    fn identity_key_falls_back_to_ip_when_absent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let ip: IpAddr = "127.0.0.3".parse().unwrap();
        let by_identity = RateLimitKey::Identity { label: None, fallback_ip: ip };
        let by_ip = RateLimitKey::Ip(ip);

        assert!(limiter.check(&by_identity).allowed);
        // Same bucket as a direct IP key, since the identity key fell back.
        assert!(!limiter.check(&by_ip).allowed);
    }
}
