//! Random secret generation and constant-time comparison.

use rand::RngCore;
use subtle::ConstantTimeEq;

/// Minimum length, in bytes, of an `expectedSecret` per §4.E ("at least 32 bytes").
pub const MIN_SECRET_LEN: usize = 32;

/// Generate a fresh random secret of `len` bytes (minimum [`MIN_SECRET_LEN`]).
///
/// Uses the OS CSPRNG via [`rand::rngs::OsRng`]; callers needing a seeded RNG
/// for deterministic tests should construct bytes directly rather than call
/// this function.
pub fn random_secret(len: usize) -> Vec<u8> {
    let len = len.max(MIN_SECRET_LEN);
    let mut buf = vec![0u8; len];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}

/// Compare two byte slices in constant time. Returns `false` immediately
/// (non-constant-time) if lengths differ, since length is not secret here —
/// only the challenge-response equality is.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_secret_respects_minimum() {
        assert_eq!(random_secret(4).len(), MIN_SECRET_LEN);
        assert_eq!(random_secret(64).len(), 64);
    }

    #[test]
    fn random_secret_is_actually_random() {
        let a = random_secret(32);
        let b = random_secret(32);
        assert_ne!(a, b);
    }

    #[test]
    fn constant_time_eq_matches_equal_secrets() {
        let secret = random_secret(32);
        assert!(constant_time_eq(&secret, &secret.clone()));
    }

    #[test]
    fn constant_time_eq_rejects_mismatch() {
        let a = vec![1u8; 32];
        let mut b = a.clone();
        b[31] ^= 1;
        assert!(!constant_time_eq(&a, &b));
    }

    #[test]
    fn constant_time_eq_rejects_length_mismatch() {
        assert!(!constant_time_eq(&[1, 2, 3], &[1, 2, 3, 4]));
    }
}
