#![forbid(unsafe_code)]

//! Message pipeline call-in points.
//!
//! The surrounding exchange mechanism invokes
//! [`OutboundSignatureHandler`] exactly once immediately before an
//! outbound message is transmitted, and [`InboundVerificationHandler`]
//! exactly once after an inbound message is parsed, before its content
//! is handed to callers. Handlers own immutable key material for the
//! process lifetime and may be shared freely across concurrently
//! executing requests.
//!
//! A verification failure is fatal to the exchange and is never
//! retried: the inputs are deterministic, so a retry cannot change a
//! forged or corrupted response.

use fiskal_core::Error;
use fiskal_dsig::{sign_enveloped, verify_enveloped, SigningContext, VerifyContext, VerifyOutcome};
use fiskal_keys::{SigningKeyMaterial, VerificationCertificate};

/// Pre-send hook: signs the outbound message body.
pub struct OutboundSignatureHandler {
    ctx: SigningContext,
}

impl OutboundSignatureHandler {
    /// Create a handler owning the merchant signing key material.
    pub fn new(key_material: SigningKeyMaterial) -> Self {
        Self {
            ctx: SigningContext::new(key_material),
        }
    }

    /// Register an additional ID attribute name.
    pub fn add_id_attr(&mut self, name: &str) {
        self.ctx.add_id_attr(name);
    }

    /// Sign an outbound message, returning the augmented document text.
    ///
    /// The document must not be sent if this call fails.
    pub fn handle(&self, xml: &str) -> Result<String, Error> {
        tracing::debug!("signing outbound message");
        let signed = sign_enveloped(xml, &self.ctx)?;
        tracing::info!("outbound message signed");
        Ok(signed)
    }
}

/// Post-receive hook: verifies the inbound message body.
pub struct InboundVerificationHandler {
    ctx: VerifyContext,
}

impl InboundVerificationHandler {
    /// Create a handler owning the authority verification certificate.
    pub fn new(certificate: VerificationCertificate) -> Self {
        Self {
            ctx: VerifyContext::new(certificate),
        }
    }

    /// Register an additional ID attribute name.
    pub fn add_id_attr(&mut self, name: &str) {
        self.ctx.add_id_attr(name);
    }

    /// Verify an inbound message before its content is trusted.
    ///
    /// Every outcome other than a valid signature — including a missing
    /// signature — is an error. The caller must abort the exchange; the
    /// payload must not reach business logic.
    pub fn handle(&self, xml: &str) -> Result<(), Error> {
        tracing::debug!("verifying inbound message");
        match verify_enveloped(xml, &self.ctx)? {
            VerifyOutcome::Valid => {
                tracing::info!("inbound message verified");
                Ok(())
            }
            VerifyOutcome::Invalid { reason } => {
                tracing::warn!(%reason, "inbound message rejected");
                Err(Error::SignatureInvalid(reason))
            }
        }
    }
}
