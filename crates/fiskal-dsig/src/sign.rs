#![forbid(unsafe_code)]

//! Enveloped signature creation.
//!
//! Signing is a pure text-to-text transform: the input document is never
//! aliased with the signed output. Each step edits the XML text and
//! re-parses:
//! 1. Stamp the `Id` attribute on the signable root if absent.
//! 2. Append a signature block with empty DigestValue/SignatureValue
//!    as the last child of the root.
//! 3. Compute the reference digest over the canonicalized subtree
//!    (signature excluded) and patch DigestValue.
//! 4. Canonicalize SignedInfo, sign it, and patch SignatureValue.

use crate::context::SigningContext;
use crate::signable_root;
use base64::Engine;
use fiskal_c14n::{escape, C14nMode};
use fiskal_core::{algorithm, ns, Error};
use fiskal_crypto::{digest, sign as crypto_sign};
use fiskal_keys::keyinfo;
use fiskal_xml::{document, xpath, NodeSet};

/// Sign a message document with an enveloped RSA-SHA1 signature.
///
/// The document must carry no prior signature under its signable root;
/// a second signing attempt is rejected rather than silently replaced.
/// Returns the signed document text.
pub fn sign_enveloped(xml: &str, ctx: &SigningContext) -> Result<String, Error> {
    let mut text = xml.to_owned();

    // 1. Locate the signable root, reject double signing, stamp the Id.
    let (id_value, stamped) = {
        let doc = fiskal_xml::parse(&text)?;
        let root = signable_root(&doc)?;
        if document::find_descendant_element(root, ns::DSIG, ns::node::SIGNATURE).is_some() {
            return Err(Error::Signing(
                "document already carries a signature".into(),
            ));
        }
        match root.attribute(ns::attr::ID) {
            Some(v) => (v.to_owned(), None),
            None => {
                let id = root.tag_name().name().to_owned();
                let new_text = insert_id_attribute(&text, root, &id)?;
                (id, Some(new_text))
            }
        }
    };
    if let Some(t) = stamped {
        text = t;
    }
    tracing::debug!(id = %id_value, "signing document");

    // 2. Append the signature block inside the signed root.
    let template = signature_template(&id_value, ctx)?;
    text = {
        let doc = fiskal_xml::parse(&text)?;
        let root = signable_root(&doc)?;
        insert_as_last_child(&text, root, &template)?
    };

    // 3. Compute the reference digest.
    let digest_b64 = {
        let doc = fiskal_xml::parse(&text)?;
        let id_map = document::build_id_map(&doc, &ctx.id_attrs);
        let target = xpath::resolve_id(&doc, &id_map, &id_value)?;
        let sig_node = document::find_descendant_element(target, ns::DSIG, ns::node::SIGNATURE)
            .ok_or_else(|| Error::MissingElement("Signature".into()))?;
        let mut node_set = NodeSet::tree_without_comments(target);
        node_set.remove_subtree(sig_node);
        let bytes = fiskal_c14n::canonicalize_doc(&doc, C14nMode::Exclusive, Some(&node_set), &[])?;
        let computed = digest::digest(algorithm::SHA1, &bytes)?;
        base64::engine::general_purpose::STANDARD.encode(computed)
    };
    text = text.replacen(
        "<ds:DigestValue></ds:DigestValue>",
        &format!("<ds:DigestValue>{digest_b64}</ds:DigestValue>"),
        1,
    );

    // 4. Canonicalize SignedInfo and compute the signature value.
    let sig_b64 = {
        let doc = fiskal_xml::parse(&text)?;
        let root = signable_root(&doc)?;
        let sig_node = document::find_descendant_element(root, ns::DSIG, ns::node::SIGNATURE)
            .ok_or_else(|| Error::MissingElement("Signature".into()))?;
        let signed_info =
            document::find_child_element(sig_node, ns::DSIG, ns::node::SIGNED_INFO)
                .ok_or_else(|| Error::MissingElement("SignedInfo".into()))?;
        let node_set = NodeSet::tree_without_comments(signed_info);
        let bytes = fiskal_c14n::canonicalize_doc(&doc, C14nMode::Exclusive, Some(&node_set), &[])?;

        let sig_alg = crypto_sign::from_uri(algorithm::RSA_SHA1)?;
        let key = crypto_sign::SigningKey::Rsa(ctx.key_material.private_key().clone());
        let signature = sig_alg.sign(&key, &bytes)?;
        base64::engine::general_purpose::STANDARD.encode(signature)
    };
    text = text.replacen(
        "<ds:SignatureValue></ds:SignatureValue>",
        &format!("<ds:SignatureValue>{sig_b64}</ds:SignatureValue>"),
        1,
    );

    tracing::debug!(id = %id_value, "document signed");
    Ok(text)
}

/// Build the signature block with empty DigestValue/SignatureValue.
fn signature_template(id: &str, ctx: &SigningContext) -> Result<String, Error> {
    let key_info = keyinfo::key_info_xml(&ctx.key_material)?;
    let id_ref = escape::escape_attr(id);
    Ok(format!(
        "<ds:Signature xmlns:ds=\"{dsig}\">\
         <ds:SignedInfo>\
         <ds:CanonicalizationMethod Algorithm=\"{c14n}\"></ds:CanonicalizationMethod>\
         <ds:SignatureMethod Algorithm=\"{sig}\"></ds:SignatureMethod>\
         <ds:Reference URI=\"#{id_ref}\">\
         <ds:Transforms>\
         <ds:Transform Algorithm=\"{enveloped}\"></ds:Transform>\
         <ds:Transform Algorithm=\"{c14n}\"></ds:Transform>\
         </ds:Transforms>\
         <ds:DigestMethod Algorithm=\"{digest}\"></ds:DigestMethod>\
         <ds:DigestValue></ds:DigestValue>\
         </ds:Reference>\
         </ds:SignedInfo>\
         <ds:SignatureValue></ds:SignatureValue>\
         {key_info}\
         </ds:Signature>",
        dsig = ns::DSIG,
        c14n = algorithm::EXC_C14N,
        sig = algorithm::RSA_SHA1,
        enveloped = algorithm::ENVELOPED_SIGNATURE,
        digest = algorithm::SHA1,
    ))
}

/// Return the byte offset just past an element's qualified name in its
/// start tag, and the qualified name itself.
fn start_tag_name(text: &str, node: roxmltree::Node<'_, '_>) -> Result<(usize, String), Error> {
    let range = node.range();
    let after = &text[range.start + 1..];
    let name_len = after
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .ok_or_else(|| Error::XmlStructure("unterminated start tag".into()))?;
    Ok((
        range.start + 1 + name_len,
        after[..name_len].to_owned(),
    ))
}

/// Insert an `Id` attribute into an element's start tag.
fn insert_id_attribute(
    text: &str,
    node: roxmltree::Node<'_, '_>,
    id: &str,
) -> Result<String, Error> {
    let (at, _) = start_tag_name(text, node)?;
    let mut out = String::with_capacity(text.len() + id.len() + 8);
    out.push_str(&text[..at]);
    out.push_str(" Id=\"");
    out.push_str(&escape::escape_attr(id));
    out.push('"');
    out.push_str(&text[at..]);
    Ok(out)
}

/// Insert an XML fragment as the last child of an element, expanding a
/// self-closing tag when necessary.
fn insert_as_last_child(
    text: &str,
    node: roxmltree::Node<'_, '_>,
    fragment: &str,
) -> Result<String, Error> {
    let range = node.range();
    let slice = &text[range.clone()];
    let mut out = String::with_capacity(text.len() + fragment.len() + 16);

    if slice.ends_with("/>") {
        let (_, qname) = start_tag_name(text, node)?;
        out.push_str(&text[..range.end - 2]);
        out.push('>');
        out.push_str(fragment);
        out.push_str("</");
        out.push_str(&qname);
        out.push('>');
        out.push_str(&text[range.end..]);
    } else {
        // The element's own end tag is the last "</" inside its range.
        let end_tag = slice
            .rfind("</")
            .ok_or_else(|| Error::XmlStructure("element has no end tag".into()))?;
        let at = range.start + end_tag;
        out.push_str(&text[..at]);
        out.push_str(fragment);
        out.push_str(&text[at..]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fiskal_keys::{loader, SigningKeyMaterial};

    const TEST_KEY_PEM: &str = include_str!("../testdata/test_rsa_key.pem");
    const TEST_CERT_PEM: &str = include_str!("../testdata/test_cert.pem");

    fn signing_context() -> SigningContext {
        let key = loader::load_rsa_private_pem(TEST_KEY_PEM.as_bytes()).unwrap();
        let cert = loader::certificate_der_from_pem(TEST_CERT_PEM.as_bytes()).unwrap();
        SigningContext::new(SigningKeyMaterial::new(key, cert).unwrap())
    }

    const PLAIN_REQUEST: &str = r#"<tns:InvoiceRequest xmlns:tns="http://example.com/invoice"><tns:Header><tns:MessageId>7a1f</tns:MessageId></tns:Header><tns:Invoice><tns:Total>36.25</tns:Total></tns:Invoice></tns:InvoiceRequest>"#;

    #[test]
    fn test_sign_stamps_id_from_local_name() {
        let signed = sign_enveloped(PLAIN_REQUEST, &signing_context()).expect("sign");
        assert!(signed.contains(r#" Id="InvoiceRequest""#));
        assert!(signed.contains(r##"URI="#InvoiceRequest""##));
    }

    #[test]
    fn test_sign_keeps_existing_id() {
        let xml = r#"<Req Id="req-7"><a>x</a></Req>"#;
        let signed = sign_enveloped(xml, &signing_context()).expect("sign");
        assert!(signed.contains(r#"<Req Id="req-7">"#));
        assert!(signed.contains(r##"URI="#req-7""##));
        // no second Id was stamped
        assert_eq!(signed.matches("Id=\"req-7\"").count(), 1);
    }

    #[test]
    fn test_signature_is_last_child_of_root() {
        let signed = sign_enveloped(PLAIN_REQUEST, &signing_context()).expect("sign");
        let doc = fiskal_xml::parse(&signed).unwrap();
        let root = doc.root_element();
        let last_element = root
            .children()
            .filter(|n| n.is_element())
            .last()
            .unwrap();
        assert_eq!(last_element.tag_name().name(), "Signature");
        assert_eq!(
            last_element.tag_name().namespace(),
            Some(fiskal_core::ns::DSIG)
        );
    }

    #[test]
    fn test_signature_values_are_filled() {
        let signed = sign_enveloped(PLAIN_REQUEST, &signing_context()).expect("sign");
        assert!(!signed.contains("<ds:DigestValue></ds:DigestValue>"));
        assert!(!signed.contains("<ds:SignatureValue></ds:SignatureValue>"));
        assert!(signed.contains("<ds:X509Certificate>"));
        assert!(signed.contains("<ds:Modulus>"));
    }

    #[test]
    fn test_double_signing_rejected() {
        let signed = sign_enveloped(PLAIN_REQUEST, &signing_context()).expect("sign");
        let again = sign_enveloped(&signed, &signing_context());
        assert!(matches!(again, Err(Error::Signing(_))));
    }

    #[test]
    fn test_sign_soap_envelope_signs_body_child() {
        let xml = format!(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body>{PLAIN_REQUEST}</s:Body></s:Envelope>"#
        );
        let signed = sign_enveloped(&xml, &signing_context()).expect("sign");
        let doc = fiskal_xml::parse(&signed).unwrap();
        let root = crate::signable_root(&doc).unwrap();
        assert_eq!(root.tag_name().name(), "InvoiceRequest");
        assert_eq!(root.attribute("Id"), Some("InvoiceRequest"));
        let sig = document::find_child_element(root, ns::DSIG, ns::node::SIGNATURE);
        assert!(sig.is_some(), "signature must be enveloped in the payload");
    }

    #[test]
    fn test_sign_self_closing_root() {
        let signed = sign_enveloped("<Ping/>", &signing_context()).expect("sign");
        let doc = fiskal_xml::parse(&signed).expect("signed output parses");
        let root = doc.root_element();
        assert_eq!(root.attribute("Id"), Some("Ping"));
        assert!(
            document::find_child_element(root, ns::DSIG, ns::node::SIGNATURE).is_some()
        );
    }

    #[test]
    fn test_sign_produces_single_signature() {
        let signed = sign_enveloped(PLAIN_REQUEST, &signing_context()).expect("sign");
        assert_eq!(signed.matches("<ds:Signature ").count(), 1);
    }
}
