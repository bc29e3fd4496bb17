#![forbid(unsafe_code)]

//! Key and certificate loading from PEM/DER.
//!
//! Covers the formats the client and its tests need: PKCS#8 or PKCS#1
//! RSA private keys and X.509 certificates. Keystore container formats
//! are the caller's concern; this layer accepts already-extracted keys.

use fiskal_core::Error;

/// Load an RSA private key from PEM data.
pub fn load_rsa_private_pem(pem_data: &[u8]) -> Result<rsa::RsaPrivateKey, Error> {
    use pkcs8::DecodePrivateKey;
    let pem_str = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))?;

    // Try PKCS#8 first
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_pem(pem_str) {
        return Ok(pk);
    }

    // Try PKCS#1
    use pkcs1::DecodeRsaPrivateKey;
    rsa::RsaPrivateKey::from_pkcs1_pem(pem_str)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key PEM: {e}")))
}

/// Load an RSA private key from DER data (PKCS#8, then PKCS#1).
pub fn load_rsa_private_der(der: &[u8]) -> Result<rsa::RsaPrivateKey, Error> {
    use pkcs8::DecodePrivateKey;
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
        return Ok(pk);
    }
    use pkcs1::DecodeRsaPrivateKey;
    rsa::RsaPrivateKey::from_pkcs1_der(der)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key DER: {e}")))
}

/// Extract the DER bytes from a PEM-encoded X.509 certificate.
pub fn certificate_der_from_pem(pem_data: &[u8]) -> Result<Vec<u8>, Error> {
    let pem_str = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Certificate(format!("invalid PEM encoding: {e}")))?;

    // Trim trailing whitespace — some PEM files have extra newlines
    let trimmed = pem_str.trim();

    let (label, der_bytes) = pem_rfc7468::decode_vec(trimmed.as_bytes())
        .map_err(|e| Error::Certificate(format!("failed to decode certificate PEM: {e}")))?;

    if label != "CERTIFICATE" {
        return Err(Error::Certificate(format!(
            "expected CERTIFICATE PEM label, got: {label}"
        )));
    }

    Ok(der_bytes)
}

/// Extract the RSA public key from a DER-encoded X.509 certificate.
pub fn public_key_from_cert_der(der_bytes: &[u8]) -> Result<rsa::RsaPublicKey, Error> {
    use der::{Decode, Encode};
    use x509_cert::Certificate;

    let cert = Certificate::from_der(der_bytes)
        .map_err(|e| Error::Certificate(format!("failed to parse X.509 certificate: {e}")))?;

    let spki_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| Error::Certificate(format!("failed to encode SPKI: {e}")))?;

    use spki::DecodePublicKey;
    rsa::RsaPublicKey::from_public_key_der(&spki_der)
        .map_err(|e| Error::Certificate(format!("certificate does not carry an RSA key: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY_PEM: &str = include_str!("../testdata/test_rsa_key.pem");
    const TEST_CERT_PEM: &str = include_str!("../testdata/test_cert.pem");

    #[test]
    fn test_load_rsa_private_pem_pkcs8() {
        let key = load_rsa_private_pem(TEST_KEY_PEM.as_bytes()).expect("load PKCS#8 PEM");
        use rsa::traits::PublicKeyParts;
        assert_eq!(key.n().bits(), 2048);
    }

    #[test]
    fn test_load_rsa_private_pem_garbage_rejected() {
        assert!(load_rsa_private_pem(b"not a pem").is_err());
    }

    #[test]
    fn test_certificate_der_from_pem() {
        let der = certificate_der_from_pem(TEST_CERT_PEM.as_bytes()).expect("decode PEM");
        // DER certificates start with a SEQUENCE tag
        assert_eq!(der[0], 0x30);
    }

    #[test]
    fn test_certificate_pem_wrong_label_rejected() {
        assert!(certificate_der_from_pem(TEST_KEY_PEM.as_bytes()).is_err());
    }

    #[test]
    fn test_public_key_from_cert_matches_private() {
        let key = load_rsa_private_pem(TEST_KEY_PEM.as_bytes()).unwrap();
        let der = certificate_der_from_pem(TEST_CERT_PEM.as_bytes()).unwrap();
        let public = public_key_from_cert_der(&der).expect("extract public key");
        assert_eq!(public, key.to_public_key());
    }
}
