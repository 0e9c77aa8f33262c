#![forbid(unsafe_code)]

//! Node sets selected by same-document references and narrowed by
//! transforms before canonicalization.

use crate::document::{Document, NodeId, NodeKind};
use std::collections::HashSet;

/// A set of nodes from one [`Document`].
///
/// Membership is tracked per node; attributes and namespace declarations
/// belong to their element and are rendered whenever the element is.
#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    nodes: HashSet<NodeId>,
}

impl NodeSet {
    /// Every node reachable from the document root, including comments.
    pub fn all(doc: &Document) -> Self {
        Self::tree(doc, doc.root(), true)
    }

    /// Every node reachable from the document root, except comments.
    pub fn all_without_comments(doc: &Document) -> Self {
        Self::tree(doc, doc.root(), false)
    }

    /// The subtree rooted at `root`.
    pub fn tree(doc: &Document, root: NodeId, with_comments: bool) -> Self {
        let mut nodes = HashSet::new();
        collect_subtree(doc, root, &mut nodes, with_comments);
        Self { nodes }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// Remove `root` and every node below it.
    pub fn remove_subtree(&mut self, doc: &Document, root: NodeId) {
        self.nodes.remove(&root);
        for d in doc.descendants(root) {
            self.nodes.remove(&d);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn collect_subtree(doc: &Document, id: NodeId, set: &mut HashSet<NodeId>, with_comments: bool) {
    if !with_comments && matches!(doc.kind(id), NodeKind::Comment(_)) {
        return;
    }
    set.insert(id);
    for &child in doc.children(id) {
        collect_subtree(doc, child, set, with_comments);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    #[test]
    fn test_all_and_without_comments() {
        let doc = parse("<a><!--c--><b>t</b></a>").unwrap();
        let all = NodeSet::all(&doc);
        let bare = NodeSet::all_without_comments(&doc);
        // document, a, comment, b, text
        assert_eq!(all.len(), 5);
        assert_eq!(bare.len(), 4);
    }

    #[test]
    fn test_remove_subtree() {
        let doc = parse("<a><b><c/></b><d/></a>").unwrap();
        let a = doc.document_element().unwrap();
        let b = doc.children(a)[0];
        let mut set = NodeSet::all(&doc);
        set.remove_subtree(&doc, b);
        assert!(!set.contains(b));
        assert!(!set.contains(doc.children(b)[0]));
        assert!(set.contains(doc.children(a)[1]));
        assert_eq!(set.len(), 3);
    }
}
