#![forbid(unsafe_code)]

//! Protective code derivation.
//!
//! Every invoice carries a merchant-computed code derived from its
//! identifying fields and the merchant private key: the fields are
//! concatenated in fixed order, signed with RSA-SHA1, and the raw
//! signature bytes are hashed with MD5 and rendered as 32 lowercase hex
//! characters. The code is independent of the message signature and is
//! usable as an offline integrity proof.
//!
//! RSA-SHA1 (PKCS#1 v1.5) is deterministic for a given key and message,
//! so identical inputs always produce the identical code.

use chrono::NaiveDateTime;
use fiskal_core::{algorithm, Error};
use fiskal_crypto::{digest, sign};

/// Timestamp rendering used inside the concatenated string.
const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Invoice fields entering the protective code, in concatenation order.
///
/// The timestamp is the invoice's displayed issue instant as a naive
/// local date-time; no zone conversion is applied here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectiveCodeInput {
    /// Taxpayer identifier of the issuing merchant.
    pub taxpayer_id: String,
    /// Invoice issue date and time.
    pub issued_at: NaiveDateTime,
    /// Invoice sequence number.
    pub sequence_number: String,
    /// Business location code.
    pub location_code: String,
    /// Issuing device code.
    pub device_code: String,
    /// Total invoice amount as a decimal string (e.g. `36.25`).
    pub total_amount: String,
}

impl ProtectiveCodeInput {
    /// Concatenate the fields into the string to be signed.
    fn to_signing_string(&self) -> String {
        let mut s = String::new();
        s.push_str(&self.taxpayer_id);
        s.push_str(&self.issued_at.format(TIMESTAMP_FORMAT).to_string());
        s.push_str(&self.sequence_number);
        s.push_str(&self.location_code);
        s.push_str(&self.device_code);
        s.push_str(&self.total_amount);
        s
    }
}

/// A computed protective code: 32 lowercase hexadecimal characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectiveCode(String);

impl ProtectiveCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ProtectiveCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the protective code for an invoice.
///
/// Any signing failure propagates as `Error::Computation` — an invalid
/// or placeholder code on an invoice is a compliance defect, so there is
/// no fallback output.
pub fn compute(
    input: &ProtectiveCodeInput,
    private_key: &rsa::RsaPrivateKey,
) -> Result<ProtectiveCode, Error> {
    let message = input.to_signing_string();

    let sig_alg = sign::from_uri(algorithm::RSA_SHA1)?;
    let key = sign::SigningKey::Rsa(private_key.clone());
    let signature = sig_alg
        .sign(&key, message.as_bytes())
        .map_err(|e| Error::Computation(e.to_string()))?;

    let hash = digest::digest(algorithm::MD5, &signature)
        .map_err(|e| Error::Computation(e.to_string()))?;

    let hex: String = hash.iter().map(|b| format!("{b:02x}")).collect();
    Ok(ProtectiveCode(hex))
}
