#![forbid(unsafe_code)]

//! Element lookup helpers and ID-attribute registration.

use std::collections::HashMap;

/// Default ID attribute names registered during processing.
///
/// The exchange profile stamps `Id`; the case variants cover documents
/// produced by other toolkits.
const DEFAULT_ID_ATTRS: [&str; 3] = ["Id", "ID", "id"];

/// Find the first descendant element with the given local name and namespace.
pub fn find_element<'a>(
    doc: &'a roxmltree::Document<'a>,
    ns_uri: &str,
    local_name: &str,
) -> Option<roxmltree::Node<'a, 'a>> {
    doc.descendants().find(|n| {
        n.is_element()
            && n.tag_name().name() == local_name
            && n.tag_name().namespace().unwrap_or("") == ns_uri
    })
}

/// Find the first child element with the given local name and namespace.
pub fn find_child_element<'a>(
    parent: roxmltree::Node<'a, 'a>,
    ns_uri: &str,
    local_name: &str,
) -> Option<roxmltree::Node<'a, 'a>> {
    parent.children().find(|n| {
        n.is_element()
            && n.tag_name().name() == local_name
            && n.tag_name().namespace().unwrap_or("") == ns_uri
    })
}

/// Find all child elements with the given local name and namespace.
pub fn find_child_elements<'a>(
    parent: roxmltree::Node<'a, 'a>,
    ns_uri: &str,
    local_name: &str,
) -> Vec<roxmltree::Node<'a, 'a>> {
    parent
        .children()
        .filter(|n| {
            n.is_element()
                && n.tag_name().name() == local_name
                && n.tag_name().namespace().unwrap_or("") == ns_uri
        })
        .collect()
}

/// Find the first descendant element with the given local name and
/// namespace below (and including) `scope`.
pub fn find_descendant_element<'a>(
    scope: roxmltree::Node<'a, 'a>,
    ns_uri: &str,
    local_name: &str,
) -> Option<roxmltree::Node<'a, 'a>> {
    scope.descendants().find(|n| {
        n.is_element()
            && n.tag_name().name() == local_name
            && n.tag_name().namespace().unwrap_or("") == ns_uri
    })
}

/// Build the ID value → node mapping for a parsed document.
///
/// Registers the default ID attribute names plus any extra names the
/// caller configured. Registration must happen identically on the
/// signing and the verification side, since the signature covers the
/// canonicalized element by reference.
pub fn build_id_map(
    doc: &roxmltree::Document<'_>,
    extra_id_attrs: &[String],
) -> HashMap<String, roxmltree::NodeId> {
    let mut map = HashMap::new();
    for node in doc.descendants() {
        if node.is_element() {
            for attr_name in &DEFAULT_ID_ATTRS {
                if let Some(val) = node.attribute(*attr_name) {
                    map.insert(val.to_owned(), node.id());
                }
            }
            for attr_name in extra_id_attrs {
                if let Some(val) = node.attribute(attr_name.as_str()) {
                    map.insert(val.to_owned(), node.id());
                }
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_id_map_registers_default_attrs() {
        let xml = r#"<a Id="one"><b id="two"/><c ID="three"/></a>"#;
        let doc = crate::parse(xml).unwrap();
        let map = build_id_map(&doc, &[]);
        assert_eq!(map.len(), 3);
        assert!(map.contains_key("one"));
        assert!(map.contains_key("two"));
        assert!(map.contains_key("three"));
    }

    #[test]
    fn test_build_id_map_extra_attrs() {
        let xml = r#"<a MsgId="m1"/>"#;
        let doc = crate::parse(xml).unwrap();
        assert!(build_id_map(&doc, &[]).is_empty());
        let map = build_id_map(&doc, &["MsgId".to_owned()]);
        assert!(map.contains_key("m1"));
    }

    #[test]
    fn test_find_child_element_matches_namespace() {
        let xml = r#"<a xmlns:x="http://x/"><x:b/><b/></a>"#;
        let doc = crate::parse(xml).unwrap();
        let root = doc.root_element();
        let in_ns = find_child_element(root, "http://x/", "b").unwrap();
        assert_eq!(in_ns.tag_name().namespace(), Some("http://x/"));
        let no_ns = find_child_element(root, "", "b").unwrap();
        assert_eq!(no_ns.tag_name().namespace(), None);
    }
}
