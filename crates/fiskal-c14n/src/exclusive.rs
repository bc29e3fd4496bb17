#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//! With comments: `http://www.w3.org/2001/10/xml-exc-c14n#WithComments`
//!
//! The key difference from inclusive C14N: only "visibly utilized"
//! namespace declarations are output. A namespace is visibly utilized if:
//! 1. Its prefix is used by the element's tag name, OR
//! 2. Its prefix is used by one of the element's attributes, OR
//! 3. The prefix appears in the InclusiveNamespaces PrefixList, OR
//! 4. It's the default namespace and the element is in that namespace.

use crate::escape;
use crate::render::{Attr, NsDecl};
use fiskal_core::{ns as xmlns, Error};
use fiskal_xml::NodeSet;
use std::collections::{BTreeMap, HashSet};

/// Canonicalize using Exclusive C14N 1.0.
pub fn canonicalize(
    doc: &roxmltree::Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let prefix_set: HashSet<String> = inclusive_prefixes.iter().cloned().collect();
    let mut output = Vec::new();
    let ctx = ExcC14nContext {
        with_comments,
        node_set,
        inclusive_prefixes: prefix_set,
    };
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new())?;
    Ok(output)
}

struct ExcC14nContext<'a> {
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
    inclusive_prefixes: HashSet<String>,
}

impl ExcC14nContext<'_> {
    fn is_visible(&self, node: roxmltree::Node<'_, '_>) -> bool {
        match self.node_set {
            None => true,
            Some(ns) => ns.contains(node.id()),
        }
    }

    fn process_node(
        &self,
        node: roxmltree::Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        if node.is_root() {
            for child in node.children() {
                self.process_node(child, output, rendered_ns)?;
            }
        } else if node.is_element() {
            self.process_element(node, output, rendered_ns)?;
        } else if node.is_text() {
            if self.is_visible(node) {
                let text = node.text().unwrap_or("");
                output.extend_from_slice(escape::escape_text(text).as_bytes());
            }
        } else if node.is_comment() {
            if self.with_comments && self.is_visible(node) {
                let text = node.text().unwrap_or("");
                let parent_is_root = node.parent().is_some_and(|p| p.is_root());

                if parent_is_root && has_preceding_element(node) {
                    output.push(b'\n');
                }

                output.extend_from_slice(b"<!--");
                output.extend_from_slice(text.as_bytes());
                output.extend_from_slice(b"-->");

                if parent_is_root && has_following_element(node) {
                    output.push(b'\n');
                }
            }
        } else if node.is_pi() {
            if self.is_visible(node) {
                let pi = node.pi().ok_or_else(|| {
                    Error::Canonicalization("processing instruction without target".into())
                })?;
                let parent_is_root = node.parent().is_some_and(|p| p.is_root());

                if parent_is_root && has_preceding_element(node) {
                    output.push(b'\n');
                }

                output.extend_from_slice(b"<?");
                output.extend_from_slice(pi.target.as_bytes());
                if let Some(value) = pi.value {
                    if !value.is_empty() {
                        output.push(b' ');
                        output.extend_from_slice(escape::escape_pi(value).as_bytes());
                    }
                }
                output.extend_from_slice(b"?>");

                if parent_is_root && has_following_element(node) {
                    output.push(b'\n');
                }
            }
        }
        Ok(())
    }

    fn process_element(
        &self,
        node: roxmltree::Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        if !self.is_visible(node) {
            // In exclusive C14N, namespace declarations are only rendered
            // on visible element start tags. Children inherit the same
            // rendered context.
            for child in node.children() {
                self.process_node(child, output, rendered_ns)?;
            }
            return Ok(());
        }

        // Determine which namespace prefixes are "visibly utilized"
        let mut utilized_prefixes: HashSet<String> = HashSet::new();

        // 1. Prefix used by the element's tag name
        let elem_prefix = element_prefix(node);
        utilized_prefixes.insert(elem_prefix.clone());

        // 2. Prefixes used by attributes
        for attr in node.attributes() {
            if let Some(prefix) = attr_prefix(node, &attr) {
                if !prefix.is_empty() {
                    utilized_prefixes.insert(prefix);
                }
            }
        }

        // 3. Prefixes in the InclusiveNamespaces PrefixList
        // "#default" means the default namespace
        for p in &self.inclusive_prefixes {
            if p == "#default" {
                utilized_prefixes.insert(String::new());
            } else {
                utilized_prefixes.insert(p.clone());
            }
        }

        // Collect all in-scope namespaces
        let inscope_ns = inscope_namespaces(node);

        // Determine which namespace declarations to output
        let mut ns_decls: Vec<NsDecl> = Vec::new();
        for prefix in &utilized_prefixes {
            // The xml prefix is never re-declared
            if prefix == "xml" {
                continue;
            }

            if let Some(uri) = inscope_ns.get(prefix) {
                // Only output if different from what was previously rendered
                if rendered_ns.get(prefix) != Some(uri) {
                    ns_decls.push(NsDecl {
                        prefix: prefix.clone(),
                        uri: uri.clone(),
                    });
                }
            } else if prefix.is_empty() {
                // Default namespace: if it was previously rendered non-empty
                // and is now unbound, output xmlns=""
                let previously_rendered = rendered_ns.get("");
                if previously_rendered.is_some_and(|uri| !uri.is_empty()) {
                    ns_decls.push(NsDecl {
                        prefix: String::new(),
                        uri: String::new(),
                    });
                }
            }
        }
        ns_decls.sort();

        // Collect attributes
        let mut attrs: Vec<Attr> = Vec::new();
        for attr in node.attributes() {
            let ns_uri = attr.namespace().unwrap_or("");
            let qname = match attr_prefix(node, &attr) {
                Some(prefix) if !prefix.is_empty() => {
                    format!("{}:{}", prefix, attr.name())
                }
                _ => attr.name().to_string(),
            };
            attrs.push(Attr {
                ns_uri: ns_uri.to_owned(),
                local_name: attr.name().to_owned(),
                qualified_name: qname,
                value: attr.value().to_owned(),
            });
        }
        attrs.sort();

        // Build qualified element name
        let elem_name = if elem_prefix.is_empty() {
            node.tag_name().name().to_owned()
        } else {
            format!("{}:{}", elem_prefix, node.tag_name().name())
        };

        // Output start tag
        output.push(b'<');
        output.extend_from_slice(elem_name.as_bytes());
        for ns_decl in &ns_decls {
            output.extend_from_slice(ns_decl.render().as_bytes());
        }
        for attr in &attrs {
            output.extend_from_slice(attr.render().as_bytes());
        }
        output.push(b'>');

        // Update rendered namespace context for children
        let mut child_rendered_ns = rendered_ns.clone();
        for ns_decl in &ns_decls {
            child_rendered_ns.insert(ns_decl.prefix.clone(), ns_decl.uri.clone());
        }

        // Process children
        for child in node.children() {
            self.process_node(child, output, &child_rendered_ns)?;
        }

        // Close tag
        output.extend_from_slice(b"</");
        output.extend_from_slice(elem_name.as_bytes());
        output.push(b'>');

        Ok(())
    }
}

/// Check if any preceding sibling is an element.
fn has_preceding_element(node: roxmltree::Node<'_, '_>) -> bool {
    let mut sib = node.prev_sibling();
    while let Some(s) = sib {
        if s.is_element() {
            return true;
        }
        sib = s.prev_sibling();
    }
    false
}

/// Check if any following sibling is an element.
fn has_following_element(node: roxmltree::Node<'_, '_>) -> bool {
    let mut sib = node.next_sibling();
    while let Some(s) = sib {
        if s.is_element() {
            return true;
        }
        sib = s.next_sibling();
    }
    false
}

/// Get the prefix for an element's tag name ("" for none/default).
fn element_prefix(node: roxmltree::Node<'_, '_>) -> String {
    match node.tag_name().namespace() {
        None => String::new(),
        Some(uri) => lookup_prefix(node, uri),
    }
}

/// Get the prefix for an attribute.
///
/// Returns `None` for attributes in no namespace, `Some("xml")` for
/// attributes in the XML namespace, and the bound prefix otherwise.
fn attr_prefix(node: roxmltree::Node<'_, '_>, attr: &roxmltree::Attribute<'_, '_>) -> Option<String> {
    match attr.namespace() {
        None => None,
        Some(uri) if uri == xmlns::XML => Some("xml".to_owned()),
        Some(uri) => Some(lookup_prefix(node, uri)),
    }
}

/// Find the prefix bound to a namespace URI in the scope of `node`.
///
/// The default binding wins when it matches, mirroring how unprefixed
/// names resolve; otherwise the first prefixed binding is used.
fn lookup_prefix(node: roxmltree::Node<'_, '_>, uri: &str) -> String {
    let mut prefixed: Option<String> = None;
    for ns in node.namespaces() {
        if ns.uri() != uri {
            continue;
        }
        match ns.name() {
            None => return String::new(),
            Some(p) => {
                if prefixed.is_none() {
                    prefixed = Some(p.to_owned());
                }
            }
        }
    }
    prefixed.unwrap_or_default()
}

/// Collect all in-scope namespaces for an element as prefix → URI.
fn inscope_namespaces(node: roxmltree::Node<'_, '_>) -> BTreeMap<String, String> {
    let mut result = BTreeMap::new();
    for ns in node.namespaces() {
        let prefix = ns.name().unwrap_or("").to_owned();
        if !ns.uri().is_empty() {
            result.insert(prefix, ns.uri().to_owned());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exc(xml: &str) -> String {
        let doc = fiskal_xml::parse(xml).unwrap();
        let out = canonicalize(&doc, false, None, &[]).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn exc_subtree(xml: &str, local_name: &str) -> String {
        let doc = fiskal_xml::parse(xml).unwrap();
        let target = doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == local_name)
            .unwrap();
        let ns = NodeSet::tree_without_comments(target);
        let out = canonicalize(&doc, false, Some(&ns), &[]).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_self_closing_expands() {
        assert_eq!(exc("<a/>"), "<a></a>");
    }

    #[test]
    fn test_comments_omitted() {
        assert_eq!(exc("<a><!--x--><b>t</b></a>"), "<a><b>t</b></a>");
    }

    #[test]
    fn test_attributes_sorted() {
        assert_eq!(
            exc(r#"<a c="3" b="2" a="1"/>"#),
            r#"<a a="1" b="2" c="3"></a>"#
        );
    }

    #[test]
    fn test_unprefixed_attrs_before_namespaced() {
        assert_eq!(
            exc(r#"<a xmlns:x="http://x/" x:b="1" a="2"/>"#),
            r#"<a xmlns:x="http://x/" a="2" x:b="1"></a>"#
        );
    }

    #[test]
    fn test_unused_namespace_dropped() {
        // exc-C14N only renders visibly utilized declarations
        assert_eq!(
            exc(r#"<a xmlns:u="http://unused/"><b>t</b></a>"#),
            "<a><b>t</b></a>"
        );
    }

    #[test]
    fn test_default_namespace_rendered_when_utilized() {
        assert_eq!(
            exc(r#"<a xmlns="http://e/" id="1">t</a>"#),
            r#"<a xmlns="http://e/" id="1">t</a>"#
        );
    }

    #[test]
    fn test_namespace_not_redeclared_on_children() {
        assert_eq!(
            exc(r#"<x:a xmlns:x="http://x/"><x:b/></x:a>"#),
            r#"<x:a xmlns:x="http://x/"><x:b></x:b></x:a>"#
        );
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(
            exc("<a>1 &lt; 2 &amp; 3</a>"),
            "<a>1 &lt; 2 &amp; 3</a>"
        );
    }

    #[test]
    fn test_attr_escaping() {
        assert_eq!(
            exc(r#"<a v="a&quot;b&amp;c"/>"#),
            r#"<a v="a&quot;b&amp;c"></a>"#
        );
    }

    #[test]
    fn test_subtree_redeclares_inherited_namespace() {
        // When canonicalizing a subtree, the prefix declared on an
        // ancestor must be re-declared on the subtree root.
        assert_eq!(
            exc_subtree(r#"<a xmlns:p="http://p/"><p:b x="1">t</p:b></a>"#, "b"),
            r#"<p:b xmlns:p="http://p/" x="1">t</p:b>"#
        );
    }

    #[test]
    fn test_subtree_excludes_siblings() {
        assert_eq!(
            exc_subtree("<a><b>keep</b><c>drop</c></a>", "b"),
            "<b>keep</b>"
        );
    }

    #[test]
    fn test_with_comments_kept() {
        let doc = fiskal_xml::parse("<a><!--x--></a>").unwrap();
        let out = canonicalize(&doc, true, None, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "<a><!--x--></a>");
    }

    #[test]
    fn test_inclusive_prefix_forces_declaration() {
        // A prefix from the PrefixList is rendered even when not utilized,
        // but not re-declared once an ancestor has rendered it.
        let doc =
            fiskal_xml::parse(r#"<a xmlns:u="http://u/"><b>t</b></a>"#).unwrap();
        let out = canonicalize(&doc, false, None, &["u".to_owned()]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<a xmlns:u="http://u/"><b>t</b></a>"#
        );
    }

    #[test]
    fn test_cdata_rendered_as_text() {
        assert_eq!(exc("<a><![CDATA[1 < 2]]></a>"), "<a>1 &lt; 2</a>");
    }
}
