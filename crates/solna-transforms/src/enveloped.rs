#![forbid(unsafe_code)]

//! Enveloped signature transform.
//!
//! Removes the `<Signature>` element being processed, with everything below
//! it, from the node-set. The document itself is never modified, so a
//! signature can be verified any number of times.

use solna_core::{ns, Error};
use solna_xml::{Document, NodeId, NodeSet};

pub fn apply(doc: &Document, signature: NodeId, node_set: &mut NodeSet) -> Result<(), Error> {
    if !doc.is_named(signature, ns::DSIG, ns::node::SIGNATURE) {
        return Err(Error::Transform(
            "enveloped-signature transform needs the Signature element in context".into(),
        ));
    }
    node_set.remove_subtree(doc, signature);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_subtree_removed() {
        let doc = Document::parse(&format!(
            r#"<r><a/><ds:Signature xmlns:ds="{}"><ds:SignedInfo/></ds:Signature></r>"#,
            ns::DSIG
        ))
        .unwrap();
        let r = doc.document_element().unwrap();
        let sig = doc.find_element(r, ns::DSIG, ns::node::SIGNATURE).unwrap();

        let mut set = NodeSet::all(&doc);
        let before = set.len();
        apply(&doc, sig, &mut set).unwrap();
        assert_eq!(set.len(), before - 2);
        assert!(set.contains(doc.children(r)[0]));
        assert!(!set.contains(sig));
        // the tree itself is untouched
        assert_eq!(doc.children(r).len(), 2);
    }

    #[test]
    fn test_requires_signature_element() {
        let doc = Document::parse("<r/>").unwrap();
        let r = doc.document_element().unwrap();
        let mut set = NodeSet::all(&doc);
        assert!(apply(&doc, r, &mut set).is_err());
    }
}
