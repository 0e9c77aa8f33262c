#![forbid(unsafe_code)]

//! URI resolution for XML-DSig references.
//!
//! Handles:
//! - Empty URI (`""`): the whole document without comments
//! - Bare-name references (`#id`): the identified subtree without comments
//! - `#xpointer(/)` and `#xpointer(id('id'))`: as above, keeping comments
//!
//! External URIs are not dereferenced.

use solna_core::Error;
use solna_xml::{Document, IdRegistry, NodeId, NodeSet};

/// Resolve `uri` against `doc`, looking identifiers up in `ids`.
pub fn resolve_uri(doc: &Document, ids: &IdRegistry, uri: &str) -> Result<NodeSet, Error> {
    if uri.is_empty() {
        return Ok(NodeSet::all_without_comments(doc));
    }
    let Some(fragment) = uri.strip_prefix('#') else {
        return Err(Error::ReferenceResolution(format!(
            "external URI not supported: {uri}"
        )));
    };
    if fragment == "xpointer(/)" {
        return Ok(NodeSet::all(doc));
    }
    if let Some(id) = parse_xpointer_id(fragment) {
        let node = lookup(ids, id)?;
        return Ok(NodeSet::tree(doc, node, true));
    }
    if fragment.is_empty() {
        return Err(Error::ReferenceResolution("empty fragment identifier".into()));
    }
    let node = lookup(ids, fragment)?;
    Ok(NodeSet::tree(doc, node, false))
}

fn lookup(ids: &IdRegistry, id: &str) -> Result<NodeId, Error> {
    ids.lookup(id)
        .ok_or_else(|| Error::ReferenceResolution(format!("ID not found: {id}")))
}

/// `xpointer(id('foo'))` or `xpointer(id("foo"))` → `foo`.
fn parse_xpointer_id(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix("xpointer(id(")?.strip_suffix("))")?;
    inner
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Document, IdRegistry) {
        let doc = Document::parse(r#"<r><!--top--><a ID="a1"><!--in-->t</a></r>"#).unwrap();
        let ids = IdRegistry::scan(&doc, &["ID"]).unwrap();
        (doc, ids)
    }

    #[test]
    fn test_empty_uri_is_document_without_comments() {
        let (doc, ids) = fixture();
        let set = resolve_uri(&doc, &ids, "").unwrap();
        // document, r, a, text
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_bare_name() {
        let (doc, ids) = fixture();
        let set = resolve_uri(&doc, &ids, "#a1").unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(ids.lookup("a1").unwrap()));
    }

    #[test]
    fn test_xpointer_keeps_comments() {
        let (doc, ids) = fixture();
        assert_eq!(resolve_uri(&doc, &ids, "#xpointer(id('a1'))").unwrap().len(), 3);
        assert_eq!(resolve_uri(&doc, &ids, "#xpointer(/)").unwrap().len(), 6);
    }

    #[test]
    fn test_unresolvable() {
        let (doc, ids) = fixture();
        for uri in ["#missing", "http://example.com/doc.xml", "#"] {
            assert!(matches!(
                resolve_uri(&doc, &ids, uri),
                Err(Error::ReferenceResolution(_))
            ));
        }
    }
}
