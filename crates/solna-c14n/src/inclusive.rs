#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.0.
//!
//! Algorithm URI: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315`
//! With comments: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments`
//!
//! Every namespace in scope at an output element is rendered unless the
//! nearest output ancestor already rendered the same binding, so a subtree
//! carries the namespace context it inherited from outside the node-set.

use crate::render::{self, Attr, NsDecl, NsMap, Output};
use solna_core::{ns, Error};
use solna_xml::{Document, NodeId, NodeKind, NodeSet};
use std::io::Write;

pub fn canonicalize<W: Write>(
    doc: &Document,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    sink: &mut W,
) -> Result<(), Error> {
    let mut out = Output {
        doc,
        node_set,
        with_comments,
        sink,
    };
    process_node(&mut out, doc.root(), &NsMap::new())
}

fn process_node<W: Write>(out: &mut Output<'_, W>, id: NodeId, rendered: &NsMap) -> Result<(), Error> {
    let doc = out.doc;
    match doc.kind(id) {
        NodeKind::Document => {
            for &child in doc.children(id) {
                process_node(out, child, rendered)?;
            }
            Ok(())
        }
        NodeKind::Element(_) => process_element(out, id, rendered),
        _ => out.leaf(id),
    }
}

fn process_element<W: Write>(
    out: &mut Output<'_, W>,
    id: NodeId,
    rendered: &NsMap,
) -> Result<(), Error> {
    let doc = out.doc;
    if !out.is_visible(id) {
        for &child in doc.children(id) {
            process_node(out, child, rendered)?;
        }
        return Ok(());
    }

    let inscope = render::inscope_namespaces(doc, id);
    let name = render::checked_name(doc, id, &inscope)?;

    let mut decls: Vec<NsDecl> = inscope
        .iter()
        .filter(|(prefix, uri)| rendered.get(*prefix) != Some(*uri))
        .map(|(prefix, uri)| NsDecl {
            prefix: prefix.clone(),
            uri: uri.clone(),
        })
        .collect();
    if !inscope.contains_key("") && rendered.get("").is_some_and(|d| !d.is_empty()) {
        decls.push(NsDecl {
            prefix: String::new(),
            uri: String::new(),
        });
    }
    decls.sort();

    let mut attrs = render::sorted_attrs(doc, id);
    if out.node_set.is_some() {
        let parent_is_output = doc
            .parent(id)
            .is_some_and(|p| doc.is_element(p) && out.is_visible(p));
        if !parent_is_output {
            attrs.extend(inherited_xml_attrs(doc, id, &attrs));
            attrs.sort();
        }
    }

    out.start_tag(&name, &decls, &attrs)?;
    for &child in doc.children(id) {
        process_node(out, child, &inscope)?;
    }
    out.end_tag(&name)
}

/// `xml:*` attributes of ancestors, nearest first, that the element does not
/// already carry itself.
fn inherited_xml_attrs(doc: &Document, id: NodeId, own: &[Attr]) -> Vec<Attr> {
    let mut found: Vec<Attr> = Vec::new();
    let mut current = doc.parent(id);
    while let Some(ancestor) = current {
        if let Some(elem) = doc.element(ancestor) {
            for attr in &elem.attributes {
                if attr.name.namespace_str() != ns::XML {
                    continue;
                }
                let local = &attr.name.local_name;
                let shadowed = own
                    .iter()
                    .chain(found.iter())
                    .any(|a| a.ns_uri == ns::XML && &a.local_name == local);
                if !shadowed {
                    found.push(Attr {
                        ns_uri: ns::XML.to_owned(),
                        local_name: local.clone(),
                        qualified_name: format!("xml:{local}"),
                        value: attr.value.clone(),
                    });
                }
            }
        }
        current = doc.parent(ancestor);
    }
    found
}
