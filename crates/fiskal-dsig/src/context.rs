#![forbid(unsafe_code)]

//! Contexts holding the key material and configuration for signature
//! operations.
//!
//! A context is built once at process start and shared by reference
//! across concurrently executing calls; nothing in it is mutated after
//! construction.

use fiskal_keys::{SigningKeyMaterial, VerificationCertificate};

/// Context for outbound signing.
pub struct SigningContext {
    /// Private key and signing certificate.
    pub key_material: SigningKeyMaterial,
    /// Additional ID attribute names to register.
    pub id_attrs: Vec<String>,
}

impl SigningContext {
    /// Create a new signing context with the given key material.
    pub fn new(key_material: SigningKeyMaterial) -> Self {
        Self {
            key_material,
            id_attrs: Vec::new(),
        }
    }

    /// Add an ID attribute name to register during processing.
    pub fn add_id_attr(&mut self, name: &str) {
        self.id_attrs.push(name.to_owned());
    }
}

/// Context for inbound verification.
pub struct VerifyContext {
    /// The authority certificate inbound signatures must match.
    pub certificate: VerificationCertificate,
    /// Additional ID attribute names to register.
    pub id_attrs: Vec<String>,
}

impl VerifyContext {
    /// Create a new verification context with the given certificate.
    pub fn new(certificate: VerificationCertificate) -> Self {
        Self {
            certificate,
            id_attrs: Vec::new(),
        }
    }

    /// Add an ID attribute name to register during processing.
    pub fn add_id_attr(&mut self, name: &str) {
        self.id_attrs.push(name.to_owned());
    }
}
