#![forbid(unsafe_code)]

//! Key material types.

use fiskal_core::Error;

/// Private key and certificate pair used for outbound signing.
///
/// The certificate's public key must match the private key; the pairing
/// is checked once at construction so that a misconfigured keystore
/// fails at startup rather than at the first rejected message.
pub struct SigningKeyMaterial {
    private: rsa::RsaPrivateKey,
    public: rsa::RsaPublicKey,
    certificate_der: Vec<u8>,
}

impl SigningKeyMaterial {
    /// Create signing key material from a private key and its
    /// DER-encoded X.509 certificate.
    pub fn new(private: rsa::RsaPrivateKey, certificate_der: Vec<u8>) -> Result<Self, Error> {
        let public = crate::loader::public_key_from_cert_der(&certificate_der)?;
        if public != private.to_public_key() {
            return Err(Error::Key(
                "certificate public key does not match private key".into(),
            ));
        }
        Ok(Self {
            private,
            public,
            certificate_der,
        })
    }

    /// The private signing key.
    pub fn private_key(&self) -> &rsa::RsaPrivateKey {
        &self.private
    }

    /// The public key extracted from the certificate.
    pub fn public_key(&self) -> &rsa::RsaPublicKey {
        &self.public
    }

    /// The DER-encoded signing certificate.
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }
}

impl std::fmt::Debug for SigningKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material is never printed
        write!(f, "SigningKeyMaterial(RSA private+certificate)")
    }
}

/// Authority certificate used only to check inbound signatures.
pub struct VerificationCertificate {
    der: Vec<u8>,
    public: rsa::RsaPublicKey,
}

impl VerificationCertificate {
    /// Create from a DER-encoded X.509 certificate.
    pub fn from_der(der: Vec<u8>) -> Result<Self, Error> {
        let public = crate::loader::public_key_from_cert_der(&der)?;
        Ok(Self { der, public })
    }

    /// Create from a PEM-encoded X.509 certificate.
    pub fn from_pem(pem_data: &[u8]) -> Result<Self, Error> {
        let der = crate::loader::certificate_der_from_pem(pem_data)?;
        Self::from_der(der)
    }

    /// The public key extracted from the certificate.
    pub fn public_key(&self) -> &rsa::RsaPublicKey {
        &self.public
    }

    /// The DER-encoded certificate.
    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

impl std::fmt::Debug for VerificationCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerificationCertificate(RSA public)")
    }
}
