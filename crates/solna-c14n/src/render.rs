#![forbid(unsafe_code)]

//! Rendering pieces shared by the inclusive and exclusive canonicalizers.

use solna_core::{ns, Error};
use solna_xml::escape::{escape_attr, escape_text};
use solna_xml::{Document, NodeId, NodeKind, NodeSet};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::io::Write;

/// Namespace bindings keyed by prefix ("" is the default namespace).
pub type NsMap = BTreeMap<String, String>;

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    pub prefix: String,
    pub uri: String,
}

impl NsDecl {
    pub fn render<W: Write>(&self, out: &mut W) -> Result<(), Error> {
        if self.prefix.is_empty() {
            write!(out, " xmlns=\"{}\"", escape_attr(&self.uri))?;
        } else {
            write!(out, " xmlns:{}=\"{}\"", self.prefix, escape_attr(&self.uri))?;
        }
        Ok(())
    }
}

impl Ord for NsDecl {
    // Default namespace first, then by prefix.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.prefix.is_empty(), other.prefix.is_empty()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self.prefix.cmp(&other.prefix),
        }
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// "" for no namespace.
    pub ns_uri: String,
    pub local_name: String,
    pub qualified_name: String,
    pub value: String,
}

impl Attr {
    pub fn render<W: Write>(&self, out: &mut W) -> Result<(), Error> {
        write!(out, " {}=\"{}\"", self.qualified_name, escape_attr(&self.value))?;
        Ok(())
    }
}

impl Ord for Attr {
    // No-namespace attributes first, by local name; then by (namespace URI, local name).
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, true) => self.local_name.cmp(&other.local_name),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .ns_uri
                .cmp(&other.ns_uri)
                .then_with(|| self.local_name.cmp(&other.local_name)),
        }
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// State shared by both canonicalizers for one run.
pub struct Output<'a, W: Write> {
    pub doc: &'a Document,
    pub node_set: Option<&'a NodeSet>,
    pub with_comments: bool,
    pub sink: &'a mut W,
}

impl<W: Write> Output<'_, W> {
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.node_set.map_or(true, |set| set.contains(id))
    }

    /// Render a non-element node. Elements are the caller's business.
    pub fn leaf(&mut self, id: NodeId) -> Result<(), Error> {
        if !self.is_visible(id) {
            return Ok(());
        }
        let doc = self.doc;
        match doc.kind(id) {
            NodeKind::Text(t) => {
                self.sink.write_all(escape_text(t).as_bytes())?;
            }
            NodeKind::Comment(c) if self.with_comments => {
                self.document_level_prefix(id)?;
                write!(self.sink, "<!--{c}-->")?;
                self.document_level_suffix(id)?;
            }
            NodeKind::ProcessingInstruction { target, data } => {
                self.document_level_prefix(id)?;
                match data.as_deref().filter(|d| !d.is_empty()) {
                    Some(d) => write!(self.sink, "<?{target} {d}?>")?,
                    None => write!(self.sink, "<?{target}?>")?,
                }
                self.document_level_suffix(id)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Emit the start tag of a visible element.
    pub fn start_tag(&mut self, name: &str, decls: &[NsDecl], attrs: &[Attr]) -> Result<(), Error> {
        write!(self.sink, "<{name}")?;
        for d in decls {
            d.render(&mut *self.sink)?;
        }
        for a in attrs {
            a.render(&mut *self.sink)?;
        }
        self.sink.write_all(b">")?;
        Ok(())
    }

    pub fn end_tag(&mut self, name: &str) -> Result<(), Error> {
        write!(self.sink, "</{name}>")?;
        Ok(())
    }

    // Comments and PIs outside the document element are separated from it
    // by a line feed.
    fn document_level_prefix(&mut self, id: NodeId) -> Result<(), Error> {
        if self.at_document_level(id) && self.element_before(id) {
            self.sink.write_all(b"\n")?;
        }
        Ok(())
    }

    fn document_level_suffix(&mut self, id: NodeId) -> Result<(), Error> {
        if self.at_document_level(id) && !self.element_before(id) && self.has_document_element() {
            self.sink.write_all(b"\n")?;
        }
        Ok(())
    }

    fn at_document_level(&self, id: NodeId) -> bool {
        self.doc.parent(id) == Some(self.doc.root())
    }

    fn element_before(&self, id: NodeId) -> bool {
        let siblings = self.doc.children(self.doc.root());
        siblings
            .iter()
            .take_while(|&&s| s != id)
            .any(|&s| self.doc.is_element(s))
    }

    fn has_document_element(&self) -> bool {
        self.doc.document_element().is_some()
    }
}

/// Namespaces in scope at `id`, with `xmlns=""` removing the default.
pub fn inscope_namespaces(doc: &Document, id: NodeId) -> NsMap {
    let mut chain = Vec::new();
    let mut current = Some(id);
    while let Some(n) = current {
        if let Some(e) = doc.element(n) {
            chain.push(e);
        }
        current = doc.parent(n);
    }
    let mut result = NsMap::new();
    for elem in chain.into_iter().rev() {
        for (prefix, uri) in &elem.namespace_declarations {
            if uri.is_empty() {
                result.remove(prefix);
            } else {
                result.insert(prefix.clone(), uri.clone());
            }
        }
    }
    result.remove("xml");
    result
}

/// The element's qualified name, after checking that its prefix and those of
/// its attributes are bound in scope.
pub fn checked_name(doc: &Document, id: NodeId, inscope: &NsMap) -> Result<String, Error> {
    let elem = doc
        .element(id)
        .ok_or_else(|| Error::Canonicalization("expected an element".into()))?;
    let name = &elem.name;
    let bound = match name.prefix.as_deref() {
        Some("xml") => Some(ns::XML),
        Some(p) => inscope.get(p).map(String::as_str),
        None => inscope.get("").map(String::as_str),
    };
    if name.prefix.is_some() && bound.is_none() {
        return Err(Error::Canonicalization(format!(
            "unresolved namespace prefix on element <{}>",
            name.qualified()
        )));
    }
    if bound != name.namespace_uri.as_deref() {
        return Err(Error::Canonicalization(format!(
            "namespace of <{}> is not declared in scope",
            name.qualified()
        )));
    }
    for attr in &elem.attributes {
        if let Some(p) = attr.name.prefix.as_deref() {
            if p != "xml" && !inscope.contains_key(p) {
                return Err(Error::Canonicalization(format!(
                    "unresolved namespace prefix on attribute {}",
                    attr.name.qualified()
                )));
            }
        }
    }
    Ok(name.qualified())
}

/// The element's own attributes, sorted canonically.
pub fn sorted_attrs(doc: &Document, id: NodeId) -> Vec<Attr> {
    let mut attrs: Vec<Attr> = doc
        .element(id)
        .map(|e| {
            e.attributes
                .iter()
                .map(|a| Attr {
                    ns_uri: a.name.namespace_str().to_owned(),
                    local_name: a.name.local_name.clone(),
                    qualified_name: a.name.qualified(),
                    value: a.value.clone(),
                })
                .collect()
        })
        .unwrap_or_default();
    attrs.sort();
    attrs
}
