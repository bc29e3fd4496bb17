#![forbid(unsafe_code)]

/// Errors produced by the fiskal client security layer.
///
/// None of these are retried internally: they stem from deterministic
/// inputs (bad keys, malformed documents, tampered data) that a retry
/// cannot fix. Callers must abort the in-flight exchange.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("invalid XML structure: {0}")]
    XmlStructure(String),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("invalid URI reference: {0}")]
    InvalidUri(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("digest mismatch for reference: {0}")]
    DigestMismatch(String),

    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("protective code computation failed: {0}")]
    Computation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
