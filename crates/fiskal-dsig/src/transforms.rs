#![forbid(unsafe_code)]

//! Reference transforms of the exchange profile.
//!
//! Exactly two transforms exist: the enveloped-signature transform
//! (removing the signature subtree from the node set) and exclusive
//! C14N (producing the bytes to digest). Anything else in an inbound
//! document is rejected.

use fiskal_c14n::C14nMode;
use fiskal_core::{algorithm, ns, Error};
use fiskal_xml::NodeSet;

/// Data flowing through the transform chain.
pub enum TransformData {
    /// An XML node set (`None` = the whole document without comments).
    Xml(Option<NodeSet>),
    /// Canonicalized bytes.
    Binary(Vec<u8>),
}

impl TransformData {
    /// Convert to bytes for digesting.
    ///
    /// The profile requires a canonicalization transform at the end of
    /// the chain, so reaching this point with a bare node set means the
    /// document declared an unsupported chain.
    pub fn into_binary(self) -> Result<Vec<u8>, Error> {
        match self {
            TransformData::Binary(data) => Ok(data),
            TransformData::Xml(_) => Err(Error::UnsupportedAlgorithm(
                "reference transform chain does not end in canonicalization".into(),
            )),
        }
    }
}

/// Apply a single transform.
pub fn apply_transform(
    uri: &str,
    data: TransformData,
    doc: &roxmltree::Document<'_>,
    transform_node: roxmltree::Node<'_, '_>,
    sig_node: roxmltree::Node<'_, '_>,
) -> Result<TransformData, Error> {
    match uri {
        algorithm::ENVELOPED_SIGNATURE => {
            let TransformData::Xml(node_set) = data else {
                return Err(Error::UnsupportedAlgorithm(
                    "enveloped-signature transform requires XML input".into(),
                ));
            };
            let mut ns = node_set.unwrap_or_else(|| NodeSet::all_without_comments(doc));
            ns.remove_subtree(sig_node);
            Ok(TransformData::Xml(Some(ns)))
        }
        algorithm::EXC_C14N | algorithm::EXC_C14N_WITH_COMMENTS => {
            let mode = C14nMode::from_uri(uri)
                .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {uri}")))?;
            let TransformData::Xml(node_set) = data else {
                return Err(Error::UnsupportedAlgorithm(
                    "canonicalization transform requires XML input".into(),
                ));
            };
            let prefixes = read_inclusive_prefixes(transform_node);
            let bytes =
                fiskal_c14n::canonicalize_doc(doc, mode, node_set.as_ref(), &prefixes)?;
            Ok(TransformData::Binary(bytes))
        }
        _ => Err(Error::UnsupportedAlgorithm(format!("transform: {uri}"))),
    }
}

/// Read the exc-C14N `InclusiveNamespaces PrefixList` from a transform
/// or canonicalization-method element.
pub fn read_inclusive_prefixes(node: roxmltree::Node<'_, '_>) -> Vec<String> {
    for child in node.children() {
        if child.is_element() && child.tag_name().name() == ns::node::INCLUSIVE_NAMESPACES {
            if let Some(prefix_list) = child.attribute(ns::attr::PREFIX_LIST) {
                return prefix_list
                    .split_whitespace()
                    .map(|s| s.to_owned())
                    .collect();
            }
        }
    }
    Vec::new()
}
