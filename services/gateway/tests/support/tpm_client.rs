//! Device-side half of the simulated TPM2_MakeCredential/ActivateCredential
//! exchange (§4.E), reimplemented independently of
//! `agenttrust_crypto::makecredential` (whose `kdfa`/`ek_seed_mask` helpers
//! are private) so the test plays the role of a TPM that actually holds the
//! EK: recover the seed the server masked against `ek_cert`, rederive the
//! symmetric key, and decrypt the credential to recover the secret to echo
//! back in `ChallengeResponseMessage`.

use aes::Aes128;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use cfb_mode::Decryptor as CfbDecryptor;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type Aes128CfbDec = CfbDecryptor<Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// Recover the secret a `Challenge { credential_blob, encrypted_secret }`
/// carries, given the same `ek_cert`/`attest_pub` bytes the enrollment
/// request's CSR supplied.
pub fn activate_credential(ek_cert: &[u8], attest_pub: &[u8], credential_blob: &[u8], encrypted_secret: &[u8]) -> Vec<u8> {
    let name_digest = Sha256::digest(attest_pub);
    let seed = unmask_seed(ek_cert, encrypted_secret);

    let sym_key = kdfa(&seed, b"CFB", &name_digest, 16);
    let (_integrity_hmac, encrypted_credential) = credential_blob.split_at(32);

    let mut secret = encrypted_credential.to_vec();
    let iv = [0u8; 16];
    Aes128CfbDec::new(sym_key.as_slice().into(), iv.as_slice().into()).decrypt(&mut secret);
    secret
}

fn unmask_seed(ek_cert: &[u8], encrypted_secret: &[u8]) -> Vec<u8> {
    let mask = ek_seed_mask(ek_cert, encrypted_secret.len());
    encrypted_secret.iter().zip(mask.iter()).map(|(s, m)| s ^ m).collect()
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
