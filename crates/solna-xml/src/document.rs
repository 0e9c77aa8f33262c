#![forbid(unsafe_code)]

//! Owned XML document tree.
//!
//! The [`Document`] owns every node in a flat arena and hands out copyable
//! [`NodeId`] handles. Nodes are never freed individually: detaching a node
//! only unlinks it from its parent, so handles stay valid for the lifetime
//! of the document.

use crate::idmap::IdRegistry;
use solna_core::{ns, Error};

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// A namespace-qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    /// The prefix as written (`None` for unprefixed names).
    pub prefix: Option<String>,
    pub local_name: String,
    /// The resolved namespace URI (`None` for no namespace).
    pub namespace_uri: Option<String>,
}

impl QName {
    /// A name in no namespace.
    pub fn local(local_name: &str) -> Self {
        Self {
            prefix: None,
            local_name: local_name.to_owned(),
            namespace_uri: None,
        }
    }

    /// A name bound to `namespace_uri`, written with `prefix` (empty or `None`
    /// means the default namespace).
    pub fn with_ns(namespace_uri: &str, prefix: Option<&str>, local_name: &str) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_owned),
            local_name: local_name.to_owned(),
            namespace_uri: Some(namespace_uri.to_owned()),
        }
    }

    /// `prefix:local` or just `local`.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.local_name),
            None => self.local_name.clone(),
        }
    }

    pub fn prefix_str(&self) -> &str {
        self.prefix.as_deref().unwrap_or("")
    }

    pub fn namespace_str(&self) -> &str {
        self.namespace_uri.as_deref().unwrap_or("")
    }

    /// Match on namespace URI and local name.
    pub fn is(&self, namespace_uri: &str, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace_str() == namespace_uri
    }
}

/// An attribute on an element. Namespace declarations are not attributes;
/// they live in [`Element::namespace_declarations`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    /// Attributes in source (or insertion) order.
    pub attributes: Vec<Attribute>,
    /// Namespace declarations made on this element, as `(prefix, uri)`.
    /// The empty prefix is the default namespace; an empty URI undeclares it.
    pub namespace_declarations: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            namespace_declarations: Vec::new(),
        }
    }

    /// Look up a no-namespace attribute by local name.
    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace_uri.is_none() && a.name.local_name == local_name)
            .map(|a| a.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, data: Option<String> },
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An in-memory XML document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    ids: IdRegistry,
}

impl Document {
    /// Create an empty document containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            ids: IdRegistry::new(),
        }
    }

    /// The document (root) node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The document element, if one has been attached.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&c| self.is_element(c))
    }

    /// Whether `id` is a handle into this document.
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Like [`contains`](Self::contains), as an `XmlStructure` error.
    pub fn check_node(&self, id: NodeId) -> Result<(), Error> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(Error::XmlStructure("node does not belong to this document".into()))
        }
    }

    // ── Node access ──────────────────────────────────────────────────

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element(_))
    }

    /// True if `id` is an element named `{namespace_uri}local_name`.
    pub fn is_named(&self, id: NodeId, namespace_uri: &str, local_name: &str) -> bool {
        self.element(id)
            .is_some_and(|e| e.name.is(namespace_uri, local_name))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|&c| c == id)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings.get(pos + 1).copied()
    }

    /// All descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Look up a no-namespace attribute on an element.
    pub fn attribute(&self, id: NodeId, local_name: &str) -> Option<&str> {
        self.element(id)?.attribute(local_name)
    }

    /// The character data of a text node, or the concatenated text of all
    /// descendant text nodes of an element.
    pub fn text_content(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Text(t) => t.clone(),
            NodeKind::Element(_) | NodeKind::Document => self
                .descendants(id)
                .filter_map(|d| match self.kind(d) {
                    NodeKind::Text(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect(),
            _ => String::new(),
        }
    }

    // ── Namespace lookup ─────────────────────────────────────────────

    /// Resolve `prefix` ("" for the default namespace) in the scope of `id`.
    pub fn lookup_namespace(&self, id: NodeId, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(ns::XML);
        }
        let mut current = Some(id);
        while let Some(n) = current {
            if let Some(elem) = self.element(n) {
                if let Some((_, uri)) = elem
                    .namespace_declarations
                    .iter()
                    .find(|(p, _)| p == prefix)
                {
                    return if uri.is_empty() { None } else { Some(uri) };
                }
            }
            current = self.parent(n);
        }
        None
    }

    // ── Search ───────────────────────────────────────────────────────

    /// Depth-first search for the first element named `{ns}local`, starting
    /// with `start` itself.
    pub fn find_element(&self, start: NodeId, ns_uri: &str, local_name: &str) -> Option<NodeId> {
        if self.is_named(start, ns_uri, local_name) {
            return Some(start);
        }
        self.descendants(start)
            .find(|&n| self.is_named(n, ns_uri, local_name))
    }

    pub fn find_child_element(
        &self,
        parent: NodeId,
        ns_uri: &str,
        local_name: &str,
    ) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.is_named(c, ns_uri, local_name))
    }

    pub fn find_child_elements(
        &self,
        parent: NodeId,
        ns_uri: &str,
        local_name: &str,
    ) -> Vec<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|&c| self.is_named(c, ns_uri, local_name))
            .collect()
    }

    // ── Identifier registry ──────────────────────────────────────────

    pub fn ids(&self) -> &IdRegistry {
        &self.ids
    }

    /// Register `value` as the identifier declared by `node`.
    ///
    /// Fails with [`Error::ReferenceResolution`] if the value is already
    /// registered to a different node.
    pub fn register_id(&mut self, value: &str, node: NodeId) -> Result<(), Error> {
        if !self.is_element(node) {
            return Err(Error::ReferenceResolution(format!(
                "ID {value:?} must be declared by an element"
            )));
        }
        self.ids.register(value, node)
    }

    /// Register every attribute named in `attr_names` found on any element
    /// of the document.
    pub fn register_id_attributes(&mut self, attr_names: &[&str]) -> Result<(), Error> {
        let scanned = IdRegistry::scan(self, attr_names)?;
        for (value, node) in scanned.iter() {
            self.ids.register(value, node)?;
        }
        Ok(())
    }

    // ── Construction and mutation ────────────────────────────────────

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: QName) -> NodeId {
        self.push(NodeKind::Element(Element::new(name)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_owned()))
    }

    /// Create a detached comment node.
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Comment(text.to_owned()))
    }

    /// Create a detached processing instruction.
    pub fn create_processing_instruction(&mut self, target: &str, data: Option<&str>) -> NodeId {
        self.push(NodeKind::ProcessingInstruction {
            target: target.to_owned(),
            data: data.map(str::to_owned),
        })
    }

    /// Append a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        self.insert_child(parent, usize::MAX, child)
    }

    /// Insert a detached node among the children of `parent` at `index`
    /// (clamped to the number of children).
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), Error> {
        self.check_node(parent)?;
        self.check_node(child)?;
        if child == self.root() {
            return Err(Error::XmlStructure("the document node cannot be a child".into()));
        }
        if self.nodes[child.0].parent.is_some() {
            return Err(Error::XmlStructure("node is already attached".into()));
        }
        match self.kind(parent) {
            NodeKind::Element(_) => {}
            NodeKind::Document => {
                if self.is_element(child) && self.document_element().is_some() {
                    return Err(Error::XmlStructure(
                        "document already has a document element".into(),
                    ));
                }
                if matches!(self.kind(child), NodeKind::Text(_)) {
                    return Err(Error::XmlStructure(
                        "text cannot be a child of the document node".into(),
                    ));
                }
            }
            _ => {
                return Err(Error::XmlStructure(
                    "only elements and the document node can have children".into(),
                ))
            }
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(Error::XmlStructure("cannot append a node to itself".into()));
        }
        let siblings = &mut self.nodes[parent.0].children;
        let index = index.min(siblings.len());
        siblings.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    /// Unlink `id` from its parent. The subtree stays in the arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Set (or replace) a no-namespace attribute.
    pub fn set_attribute(&mut self, id: NodeId, local_name: &str, value: &str) -> Result<(), Error> {
        self.set_attribute_ns(id, QName::local(local_name), value)
    }

    /// Set (or replace) an attribute matched by namespace URI and local name.
    pub fn set_attribute_ns(&mut self, id: NodeId, name: QName, value: &str) -> Result<(), Error> {
        let elem = self
            .element_mut(id)
            .ok_or_else(|| Error::XmlStructure("attributes can only be set on elements".into()))?;
        if let Some(existing) = elem.attributes.iter_mut().find(|a| {
            a.name.namespace_uri == name.namespace_uri && a.name.local_name == name.local_name
        }) {
            existing.value = value.to_owned();
        } else {
            elem.attributes.push(Attribute {
                name,
                value: value.to_owned(),
            });
        }
        Ok(())
    }

    /// Declare `prefix` ("" for the default namespace) on an element.
    pub fn declare_namespace(&mut self, id: NodeId, prefix: &str, uri: &str) -> Result<(), Error> {
        let elem = self
            .element_mut(id)
            .ok_or_else(|| Error::XmlStructure("namespaces can only be declared on elements".into()))?;
        if let Some(existing) = elem
            .namespace_declarations
            .iter_mut()
            .find(|(p, _)| p == prefix)
        {
            existing.1 = uri.to_owned();
        } else {
            elem.namespace_declarations
                .push((prefix.to_owned(), uri.to_owned()));
        }
        Ok(())
    }

    /// Replace the content of `id`: for a text or comment node the character
    /// data, for an element all children with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<(), Error> {
        if let NodeKind::Text(t) | NodeKind::Comment(t) = &mut self.nodes[id.0].kind {
            *t = text.to_owned();
            return Ok(());
        }
        match self.kind(id) {
            NodeKind::Element(_) => {
                for child in std::mem::take(&mut self.nodes[id.0].children) {
                    self.nodes[child.0].parent = None;
                }
                if !text.is_empty() {
                    let t = self.create_text(text);
                    self.append_child(id, t)?;
                }
                Ok(())
            }
            _ => Err(Error::XmlStructure(
                "text content can only be set on elements, text or comments".into(),
            )),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-order iterator returned by [`Document::descendants`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}
