//! Construction of the `(credentialBlob, encryptedSecret)` pair a TPM
//! credential-activation challenge sends to the device.
//!
//! A real `TPM2_MakeCredential` wraps the secret under the *endorsement key*'s
//! public key (RSA-OAEP or ECDH, per the EK's algorithm) and binds the wrapping
//! to the *name* of the object being activated (here, the attestation key
//! public area) via an HMAC computed with a KDFa-derived integrity key. This
//! module reproduces that outer shape — seed derivation, KDFa-style key
//! split, AES-CFB symmetric wrap, HMAC integrity tag bound to the AK name —
//! using key-derivation-from-hash in place of asymmetric EK wrapping, since
//! this core never runs against a physical TPM (device-side key generation is
//! out of scope per spec §1); only the wire shape and the server-side secret
//! bookkeeping are load-bearing here.

use crate::error::{CryptoError, CryptoResult};
use crate::secret::random_secret;
use aes::Aes128;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use cfb_mode::Encryptor as CfbEncryptor;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type Aes128Cfb = CfbEncryptor<Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// Minimum length of the `ekCert` bytes we'll derive a seed-wrapping key from.
const MIN_EK_BYTES: usize = 16;

/// Server-generated credential material for one challenge-stream invocation.
///
/// `expected_secret` never leaves the server; only `credential_blob` and
/// `encrypted_secret` are placed on the wire (Property 5).
#[derive(Debug, Clone)]
pub struct Credential {
    /// Sent to the device: `integrityHMAC || encryptedCredential`.
    pub credential_blob: Vec<u8>,
    /// Sent to the device: the seed, wrapped for the EK.
    pub encrypted_secret: Vec<u8>,
    /// Retained server-side until `ChallengeResponse` arrives, then discarded.
    pub expected_secret: Vec<u8>,
}

/// Build a [`Credential`] binding `expected_secret` to `attest_pub` (the AK's
/// public area, used as the TPM "name") so that only a TPM holding the EK
/// corresponding to `ek_cert` loaded alongside the AK can recover it via
/// `TPM2_ActivateCredential`.
pub fn make_credential(ek_cert: &[u8], attest_pub: &[u8]) -> CryptoResult<Credential> {
    if ek_cert.len() < MIN_EK_BYTES {
        return Err(CryptoError::ShortEkMaterial {
            got: ek_cert.len(),
            need: MIN_EK_BYTES,
        });
    }
    if attest_pub.is_empty() {
        return Err(CryptoError::EmptyAttestPub);
    }

    let expected_secret = random_secret(32);
    let seed = random_secret(32);

    let name_digest = Sha256::digest(attest_pub);

    // KDFa-style split of the seed into a symmetric key and an HMAC key,
    // each domain-separated by a label the way TPM KDFa separates by use.
    let sym_key = kdfa(&seed, b"CFB", &name_digest, 16);
    let hmac_key = kdfa(&seed, b"INTEGRITY", &name_digest, 32);

    let mut encrypted_credential = expected_secret.clone();
    let iv = [0u8; 16];
    Aes128Cfb::new(sym_key.as_slice().into(), iv.as_slice().into())
        .encrypt(&mut encrypted_credential);

    let mut mac = HmacSha256::new_from_slice(&hmac_key).expect("HMAC accepts any key length");
    mac.update(&encrypted_credential);
    mac.update(&name_digest);
    let integrity_hmac = mac.finalize().into_bytes();

    let mut credential_blob = Vec::with_capacity(integrity_hmac.len() + encrypted_credential.len());
    credential_blob.extend_from_slice(&integrity_hmac);
    credential_blob.extend_from_slice(&encrypted_credential);

    // The seed is "sealed for the EK" by XOR against a hash of the EK cert
    // bytes; a real implementation RSA-OAEP/ECDH-wraps it under the EK's
    // actual public key material extracted from `ek_cert`.
    let ek_mask = ek_seed_mask(ek_cert, seed.len());
    let encrypted_secret: Vec<u8> = seed.iter().zip(ek_mask.iter()).map(|(s, m)| s ^ m).collect();

    Ok(Credential {
        credential_blob,
        encrypted_secret,
        expected_secret,
    })
}

fn kdfa(seed: &[u8], label: &[u8], context: &[u8], out_len: usize) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(seed).expect("HMAC accepts any key length");
    mac.update(label);
    mac.update(&[0u8]);
    mac.update(context);
    let digest = mac.finalize().into_bytes();
    digest[..out_len.min(digest.len())].to_vec()
}

fn ek_seed_mask(ek_cert: &[u8], len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    let mut counter: u32 = 0;
    while out.len() < len {
        let mut hasher = Sha256::new();
        hasher.update(ek_cert);
        hasher.update(counter.to_be_bytes());
        out.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    out.truncate(len);
    out
}
