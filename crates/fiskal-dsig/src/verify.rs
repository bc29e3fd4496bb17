#![forbid(unsafe_code)]

//! Enveloped signature verification.
//!
//! Processing order:
//! 1. Parse the document and register ID attributes (identically to the
//!    signing side — the signature covers the canonicalized element by
//!    reference, not by raw bytes).
//! 2. Locate the single `<Signature>` under the signable root; a missing
//!    signature is a failure, never "unsigned, allow through".
//! 3. For each `<Reference>`: resolve the URI, run the declared
//!    transforms (profile only), recompute the digest, compare.
//! 4. Canonicalize `<SignedInfo>` and check `<SignatureValue>` against
//!    the supplied certificate. Embedded KeyInfo is never trusted.

use crate::context::VerifyContext;
use crate::signable_root;
use crate::transforms::{apply_transform, read_inclusive_prefixes, TransformData};
use base64::Engine;
use fiskal_c14n::C14nMode;
use fiskal_core::{ns, Error};
use fiskal_crypto::{digest, sign as crypto_sign};
use fiskal_xml::{document, xpath, NodeSet};
use std::collections::HashMap;

/// Result of signature verification.
#[derive(Debug)]
pub enum VerifyOutcome {
    /// Signature is valid: the payload is provably unmodified since it
    /// was signed by the holder of the matching private key.
    Valid,
    /// Signature is invalid. The document must not be trusted.
    Invalid { reason: String },
}

impl VerifyOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyOutcome::Valid)
    }
}

/// Verify the enveloped signature of a message document against the
/// supplied authority certificate.
pub fn verify_enveloped(xml: &str, ctx: &VerifyContext) -> Result<VerifyOutcome, Error> {
    let doc = fiskal_xml::parse(xml)?;
    let id_map = document::build_id_map(&doc, &ctx.id_attrs);

    // Locate the signature under the signable root
    let root = signable_root(&doc)?;
    let sig_node = document::find_descendant_element(root, ns::DSIG, ns::node::SIGNATURE)
        .ok_or_else(|| Error::MissingElement("Signature".into()))?;
    let signed_info = document::find_child_element(sig_node, ns::DSIG, ns::node::SIGNED_INFO)
        .ok_or_else(|| Error::MissingElement("SignedInfo".into()))?;

    // Read CanonicalizationMethod
    let c14n_method =
        document::find_child_element(signed_info, ns::DSIG, ns::node::CANONICALIZATION_METHOD)
            .ok_or_else(|| Error::MissingElement("CanonicalizationMethod".into()))?;
    let c14n_uri = c14n_method
        .attribute(ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingAttribute("Algorithm on CanonicalizationMethod".into()))?;
    let c14n_mode = C14nMode::from_uri(c14n_uri)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {c14n_uri}")))?;
    let inclusive_prefixes = read_inclusive_prefixes(c14n_method);

    // Read SignatureMethod
    let sig_method =
        document::find_child_element(signed_info, ns::DSIG, ns::node::SIGNATURE_METHOD)
            .ok_or_else(|| Error::MissingElement("SignatureMethod".into()))?;
    let sig_method_uri = sig_method
        .attribute(ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingAttribute("Algorithm on SignatureMethod".into()))?;
    let sig_alg = crypto_sign::from_uri(sig_method_uri)?;

    // Verify each Reference
    let references = document::find_child_elements(signed_info, ns::DSIG, ns::node::REFERENCE);
    if references.is_empty() {
        return Err(Error::MissingElement("Reference".into()));
    }
    for reference in &references {
        if let VerifyOutcome::Invalid { reason } =
            verify_reference(*reference, &doc, &id_map, sig_node)?
        {
            tracing::debug!(%reason, "reference digest check failed");
            return Ok(VerifyOutcome::Invalid {
                reason: format!("Reference digest failed: {reason}"),
            });
        }
    }

    // Canonicalize SignedInfo
    let signed_info_set = NodeSet::tree_without_comments(signed_info);
    let c14n_signed_info =
        fiskal_c14n::canonicalize_doc(&doc, c14n_mode, Some(&signed_info_set), &inclusive_prefixes)?;

    // Verify SignatureValue against the supplied certificate
    let sig_value_node =
        document::find_child_element(sig_node, ns::DSIG, ns::node::SIGNATURE_VALUE)
            .ok_or_else(|| Error::MissingElement("SignatureValue".into()))?;
    let sig_value_b64: String = sig_value_node
        .text()
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let sig_value = base64::engine::general_purpose::STANDARD
        .decode(&sig_value_b64)
        .map_err(|e| Error::Base64(format!("SignatureValue: {e}")))?;

    let key = crypto_sign::SigningKey::RsaPublic(ctx.certificate.public_key().clone());
    let valid = sig_alg.verify(&key, &c14n_signed_info, &sig_value)?;

    if valid {
        Ok(VerifyOutcome::Valid)
    } else {
        Ok(VerifyOutcome::Invalid {
            reason: "signature value verification failed".into(),
        })
    }
}

/// Verify a single `<Reference>` element.
fn verify_reference(
    reference: roxmltree::Node<'_, '_>,
    doc: &roxmltree::Document<'_>,
    id_map: &HashMap<String, roxmltree::NodeId>,
    sig_node: roxmltree::Node<'_, '_>,
) -> Result<VerifyOutcome, Error> {
    let uri = reference.attribute(ns::attr::URI).unwrap_or("");

    // Read DigestMethod
    let digest_method = document::find_child_element(reference, ns::DSIG, ns::node::DIGEST_METHOD)
        .ok_or_else(|| Error::MissingElement("DigestMethod".into()))?;
    let digest_uri = digest_method
        .attribute(ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingAttribute("Algorithm on DigestMethod".into()))?;

    // Read expected DigestValue
    let digest_value_node =
        document::find_child_element(reference, ns::DSIG, ns::node::DIGEST_VALUE)
            .ok_or_else(|| Error::MissingElement("DigestValue".into()))?;
    let expected_b64: String = digest_value_node
        .text()
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let expected_digest = base64::engine::general_purpose::STANDARD
        .decode(&expected_b64)
        .map_err(|e| Error::Base64(format!("DigestValue: {e}")))?;

    // Resolve the reference URI
    let initial = if uri.is_empty() {
        // Whole document without comments
        None
    } else if let Some(id) = xpath::parse_same_document_ref(uri) {
        let node = xpath::resolve_id(doc, id_map, id)?;
        Some(NodeSet::tree_without_comments(node))
    } else {
        return Err(Error::InvalidUri(format!(
            "external URI not supported: {uri}"
        )));
    };

    // Apply the declared transforms
    let mut data = TransformData::Xml(initial);
    if let Some(transforms) =
        document::find_child_element(reference, ns::DSIG, ns::node::TRANSFORMS)
    {
        for transform_node in transforms.children() {
            if !transform_node.is_element()
                || transform_node.tag_name().name() != ns::node::TRANSFORM
            {
                continue;
            }
            let transform_uri = transform_node.attribute(ns::attr::ALGORITHM).unwrap_or("");
            data = apply_transform(transform_uri, data, doc, transform_node, sig_node)?;
        }
    }

    // Digest and compare
    let bytes = data.into_binary()?;
    let computed = digest::digest(digest_uri, &bytes)?;

    if computed == expected_digest {
        Ok(VerifyOutcome::Valid)
    } else {
        Ok(VerifyOutcome::Invalid {
            reason: format!("URI={uri}: expected digest does not match computed digest"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SigningContext;
    use crate::sign::sign_enveloped;
    use fiskal_keys::{loader, SigningKeyMaterial, VerificationCertificate};

    const TEST_KEY_PEM: &str = include_str!("../testdata/test_rsa_key.pem");
    const TEST_CERT_PEM: &str = include_str!("../testdata/test_cert.pem");
    const OTHER_CERT_PEM: &str = include_str!("../testdata/other_cert.pem");

    fn signing_context() -> SigningContext {
        let key = loader::load_rsa_private_pem(TEST_KEY_PEM.as_bytes()).unwrap();
        let cert = loader::certificate_der_from_pem(TEST_CERT_PEM.as_bytes()).unwrap();
        SigningContext::new(SigningKeyMaterial::new(key, cert).unwrap())
    }

    fn verify_context() -> VerifyContext {
        VerifyContext::new(VerificationCertificate::from_pem(TEST_CERT_PEM.as_bytes()).unwrap())
    }

    fn wrong_verify_context() -> VerifyContext {
        VerifyContext::new(VerificationCertificate::from_pem(OTHER_CERT_PEM.as_bytes()).unwrap())
    }

    const PLAIN_REQUEST: &str = r#"<tns:InvoiceRequest xmlns:tns="http://example.com/invoice"><tns:Header><tns:MessageId>7a1f</tns:MessageId></tns:Header><tns:Invoice><tns:Total>36.25</tns:Total></tns:Invoice></tns:InvoiceRequest>"#;

    const SOAP_REQUEST: &str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><tns:InvoiceRequest xmlns:tns="http://example.com/invoice"><tns:Invoice><tns:Total>36.25</tns:Total></tns:Invoice></tns:InvoiceRequest></s:Body></s:Envelope>"#;

    #[test]
    fn test_sign_verify_roundtrip() {
        let signed = sign_enveloped(PLAIN_REQUEST, &signing_context()).expect("sign");
        let outcome = verify_enveloped(&signed, &verify_context()).expect("verify");
        assert!(outcome.is_valid(), "round trip must verify: {outcome:?}");
    }

    #[test]
    fn test_sign_verify_roundtrip_soap() {
        let signed = sign_enveloped(SOAP_REQUEST, &signing_context()).expect("sign");
        let outcome = verify_enveloped(&signed, &verify_context()).expect("verify");
        assert!(outcome.is_valid(), "SOAP round trip must verify: {outcome:?}");
    }

    #[test]
    fn test_tampered_content_rejected() {
        let signed = sign_enveloped(PLAIN_REQUEST, &signing_context()).expect("sign");
        let tampered = signed.replace("36.25", "36.26");
        assert_ne!(signed, tampered);
        let outcome = verify_enveloped(&tampered, &verify_context()).expect("verify");
        assert!(!outcome.is_valid(), "tampered payload must not verify");
    }

    #[test]
    fn test_wrong_certificate_rejected() {
        let signed = sign_enveloped(PLAIN_REQUEST, &signing_context()).expect("sign");
        let outcome = verify_enveloped(&signed, &wrong_verify_context()).expect("verify");
        assert!(
            !outcome.is_valid(),
            "signature must not verify against a different certificate"
        );
    }

    #[test]
    fn test_missing_signature_rejected() {
        let result = verify_enveloped(PLAIN_REQUEST, &verify_context());
        assert!(matches!(result, Err(Error::MissingElement(_))));
    }

    #[test]
    fn test_tampered_digest_value_rejected() {
        let signed = sign_enveloped(PLAIN_REQUEST, &signing_context()).expect("sign");
        // Corrupt the stored digest: swap the first character for another
        let start = signed.find("<ds:DigestValue>").unwrap() + "<ds:DigestValue>".len();
        let mut tampered = signed.clone();
        let original = tampered.as_bytes()[start];
        let replacement = if original == b'A' { 'B' } else { 'A' };
        tampered.replace_range(start..start + 1, &replacement.to_string());
        let outcome = verify_enveloped(&tampered, &verify_context()).expect("verify");
        assert!(!outcome.is_valid());
    }

    #[test]
    fn test_unsupported_signature_algorithm_rejected() {
        let signed = sign_enveloped(PLAIN_REQUEST, &signing_context()).expect("sign");
        let downgraded = signed.replace(
            "http://www.w3.org/2000/09/xmldsig#rsa-sha1",
            "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
        );
        let result = verify_enveloped(&downgraded, &verify_context());
        assert!(matches!(result, Err(Error::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn test_unsupported_canonicalization_rejected() {
        let signed = sign_enveloped(PLAIN_REQUEST, &signing_context()).expect("sign");
        let downgraded = signed.replacen(
            "http://www.w3.org/2001/10/xml-exc-c14n#",
            "http://www.w3.org/TR/2001/REC-xml-c14n-20010315",
            1,
        );
        let result = verify_enveloped(&downgraded, &verify_context());
        assert!(matches!(result, Err(Error::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn test_whitespace_in_signature_values_tolerated() {
        // Other toolkits line-wrap base64 payloads; the decoder must
        // strip whitespace before decoding.
        let signed = sign_enveloped(PLAIN_REQUEST, &signing_context()).expect("sign");
        let start = signed.find("<ds:SignatureValue>").unwrap() + "<ds:SignatureValue>".len();
        let mut wrapped = signed.clone();
        wrapped.insert_str(start + 20, "\n");
        let outcome = verify_enveloped(&wrapped, &verify_context()).expect("verify");
        assert!(outcome.is_valid(), "wrapped base64 must still verify");
    }

    #[test]
    fn test_signed_document_with_comment_outside_payload_still_verifies() {
        // Comments outside the signed subtree must not affect the digest.
        let signed = sign_enveloped(SOAP_REQUEST, &signing_context()).expect("sign");
        let with_comment = signed.replace("<s:Body>", "<!-- relayed --><s:Body>");
        let outcome = verify_enveloped(&with_comment, &verify_context()).expect("verify");
        assert!(outcome.is_valid());
    }
}
