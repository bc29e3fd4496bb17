#![forbid(unsafe_code)]

//! XML document helpers for the fiskal client.
//!
//! Provides lookup helpers over `roxmltree`, ID-attribute registration,
//! and the `NodeSet` operations needed for document-subset
//! canonicalization and the enveloped-signature transform.

pub mod document;
pub mod nodeset;
pub mod xpath;

pub use nodeset::NodeSet;

/// Return roxmltree parsing options that allow DTD.
///
/// DTD is allowed because roxmltree does not expand external entities or
/// perform entity substitution beyond the five predefined XML entities,
/// so it is safe.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}

/// Parse an XML document with the shared parsing options.
pub fn parse(text: &str) -> Result<roxmltree::Document<'_>, fiskal_core::Error> {
    roxmltree::Document::parse_with_options(text, parsing_options())
        .map_err(|e: roxmltree::Error| fiskal_core::Error::XmlParse(e.to_string()))
}
