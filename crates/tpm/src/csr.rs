//! Parsing of the TCG-CSR bytes an `EnrollmentRequest` carries (§3, §4.E
//! precondition 5).
//!
//! A real TCG-CSR is the TCG-specified extended CSR format bundling an EK
//! certificate, an attestation-key public area, and a proof-of-possession
//! signature in a single ASN.1/TPM-marshaled blob. Device-side generation of
//! that blob is out of scope (§1 non-goals) and the wire-level TCG encoding
//! is not otherwise load-bearing for this core — only that the four fields
//! round-trip intact. This module defines a length-prefixed TLV encoding
//! carrying the same four fields, used consistently by the in-memory test
//! harness and the server-side parser.

use crate::error::{TpmError, TpmResult};

/// The four fields a TCG-CSR carries, per §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcgCsr {
    /// DER-encoded X.509 EK certificate, issued by a TPM manufacturer CA.
    pub ek_cert: Vec<u8>,
    /// TPM public area blob for the attestation key.
    pub attest_pub: Vec<u8>,
    /// TPM public area blob for the LAK.
    pub lak_pub: Vec<u8>,
    /// Proof-of-possession signature over the attestation key.
    pub proof_of_possession: Vec<u8>,
}

impl TcgCsr {
    /// Encode as `u32-le length || bytes` repeated for each of the four
    /// fields, in field order. Used by tests and by any harness standing in
    /// for the (out-of-scope) device-side CSR generator.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for field in [&self.ek_cert, &self.attest_pub, &self.lak_pub, &self.proof_of_possession] {
            out.extend_from_slice(&(field.len() as u32).to_le_bytes());
            out.extend_from_slice(field);
        }
        out
    }

    /// Parse the encoding produced by [`Self::encode`]. Any truncation or
    /// length mismatch is a parse error (§4.E precondition failure →
    /// `INVALID_ARGUMENT`).
    pub fn parse(raw: &[u8]) -> TpmResult<Self> {
        let mut cursor = raw;
        let mut fields = Vec::with_capacity(4);
        for _ in 0..4 {
            let field = take_field(&mut cursor)?;
            fields.push(field);
        }
        if !cursor.is_empty() {
            return Err(TpmError::CsrParseError("trailing bytes after proof of possession".into()));
        }
        let mut fields = fields.into_iter();
        Ok(TcgCsr {
            ek_cert: fields.next().unwrap(),
            attest_pub: fields.next().unwrap(),
            lak_pub: fields.next().unwrap(),
            proof_of_possession: fields.next().unwrap(),
        })
    }
}

fn take_field(cursor: &mut &[u8]) -> TpmResult<Vec<u8>> {
    if cursor.len() < 4 {
        return Err(TpmError::CsrParseError("truncated length prefix".into()));
    }
    let (len_bytes, rest) = cursor.split_at(4);
    let len = u32::from_le_bytes(len_bytes.try_into().unwrap()) as usize;
    if rest.len() < len {
        return Err(TpmError::CsrParseError(format!(
            "declared field length {len} exceeds remaining {} bytes",
            rest.len()
        )));
    }
    let (field, rest) = rest.split_at(len);
    *cursor = rest;
    Ok(field.to_vec())
}
