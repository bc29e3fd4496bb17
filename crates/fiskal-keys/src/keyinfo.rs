#![forbid(unsafe_code)]

//! `<ds:KeyInfo>` construction.
//!
//! The remote verifier selects its trust anchor from the embedded key
//! material, so the signature block carries both the full certificate
//! (`X509Data/X509Certificate`) and the bare public key
//! (`KeyValue/RSAKeyValue`), in that order.

use crate::key::SigningKeyMaterial;
use base64::Engine;
use fiskal_core::Error;
use rsa::traits::PublicKeyParts;

/// Build the `<ds:KeyInfo>` element for a signature block.
///
/// The `ds` prefix must be bound to the XML-DSig namespace by an
/// enclosing element.
pub fn key_info_xml(material: &SigningKeyMaterial) -> Result<String, Error> {
    let engine = base64::engine::general_purpose::STANDARD;
    let cert_b64 = engine.encode(material.certificate_der());
    let modulus_b64 = engine.encode(material.public_key().n().to_bytes_be());
    let exponent_b64 = engine.encode(material.public_key().e().to_bytes_be());

    Ok(format!(
        "<ds:KeyInfo>\
         <ds:X509Data><ds:X509Certificate>{cert_b64}</ds:X509Certificate></ds:X509Data>\
         <ds:KeyValue><ds:RSAKeyValue>\
         <ds:Modulus>{modulus_b64}</ds:Modulus>\
         <ds:Exponent>{exponent_b64}</ds:Exponent>\
         </ds:RSAKeyValue></ds:KeyValue>\
         </ds:KeyInfo>"
    ))
}
