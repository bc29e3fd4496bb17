#![forbid(unsafe_code)]

//! Same-document reference resolution.
//!
//! Only the pattern the enveloped profile uses: `URI="#id-value"`
//! resolved against registered ID attributes.

use fiskal_core::Error;
use std::collections::HashMap;

/// Parse a same-document reference (e.g., `#foo` → `foo`).
pub fn parse_same_document_ref(uri: &str) -> Option<&str> {
    uri.strip_prefix('#')
}

/// Resolve an ID value in a parsed document using a pre-built ID map.
pub fn resolve_id<'a>(
    doc: &'a roxmltree::Document<'a>,
    id_map: &HashMap<String, roxmltree::NodeId>,
    id: &str,
) -> Result<roxmltree::Node<'a, 'a>, Error> {
    id_map
        .get(id)
        .and_then(|nid| doc.get_node(*nid))
        .ok_or_else(|| Error::InvalidUri(format!("ID not found: {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_same_document_ref() {
        assert_eq!(parse_same_document_ref("#abc"), Some("abc"));
        assert_eq!(parse_same_document_ref("http://other/"), None);
        assert_eq!(parse_same_document_ref(""), None);
    }

    #[test]
    fn test_resolve_id() {
        let xml = r#"<a Id="root"><b Id="inner"/></a>"#;
        let doc = crate::parse(xml).unwrap();
        let map = crate::document::build_id_map(&doc, &[]);
        let node = resolve_id(&doc, &map, "inner").unwrap();
        assert_eq!(node.tag_name().name(), "b");
        assert!(resolve_id(&doc, &map, "missing").is_err());
    }
}
