#![forbid(unsafe_code)]

//! Enveloped XML signing and verification.
//!
//! Implements the single signature profile of the exchange: an enveloped
//! RSA-SHA1 signature over the message's signable root element,
//! referenced by its `Id` attribute and canonicalized with exclusive
//! C14N (comments omitted).

pub mod context;
pub mod sign;
pub mod transforms;
pub mod verify;

pub use context::{SigningContext, VerifyContext};
pub use sign::sign_enveloped;
pub use verify::{verify_enveloped, VerifyOutcome};

use fiskal_core::{ns, Error};
use fiskal_xml::document;

/// Locate the signable root of a message document.
///
/// For a SOAP envelope this is the first element child of `Body` (the
/// business payload); for any other document it is the document root.
pub fn signable_root<'a>(
    doc: &'a roxmltree::Document<'a>,
) -> Result<roxmltree::Node<'a, 'a>, Error> {
    let root = doc.root_element();
    if root.tag_name().name() == ns::node::ENVELOPE
        && root.tag_name().namespace() == Some(ns::SOAP_ENVELOPE)
    {
        let body = document::find_child_element(root, ns::SOAP_ENVELOPE, ns::node::BODY)
            .ok_or_else(|| Error::MissingElement("Body".into()))?;
        body.children()
            .find(|n| n.is_element())
            .ok_or_else(|| Error::XmlStructure("SOAP Body has no element child".into()))
    } else {
        Ok(root)
    }
}
