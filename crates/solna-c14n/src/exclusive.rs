#![forbid(unsafe_code)]

//! Exclusive XML Canonicalization 1.0.
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//! With comments: `http://www.w3.org/2001/10/xml-exc-c14n#WithComments`
//!
//! Only namespaces visibly utilized by an output element (its own prefix and
//! those of its attributes) are rendered, plus any prefix named in the
//! InclusiveNamespaces PrefixList, which follows the inclusive rules.

use crate::render::{self, NsDecl, NsMap, Output};
use solna_core::Error;
use solna_xml::{Document, NodeId, NodeKind, NodeSet};
use std::collections::BTreeSet;
use std::io::Write;

/// Token in the PrefixList that stands for the default namespace.
pub const DEFAULT_PREFIX_TOKEN: &str = "#default";

pub fn canonicalize<W: Write>(
    doc: &Document,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
    sink: &mut W,
) -> Result<(), Error> {
    let forced: BTreeSet<String> = inclusive_prefixes
        .iter()
        .map(|p| {
            if p == DEFAULT_PREFIX_TOKEN {
                String::new()
            } else {
                p.clone()
            }
        })
        .collect();
    let mut ctx = ExcContext {
        out: Output {
            doc,
            node_set,
            with_comments,
            sink,
        },
        forced,
    };
    ctx.process_node(doc.root(), &NsMap::new())
}

struct ExcContext<'a, W: Write> {
    out: Output<'a, W>,
    forced: BTreeSet<String>,
}

impl<W: Write> ExcContext<'_, W> {
    fn process_node(&mut self, id: NodeId, rendered: &NsMap) -> Result<(), Error> {
        let doc = self.out.doc;
        match doc.kind(id) {
            NodeKind::Document => {
                for &child in doc.children(id) {
                    self.process_node(child, rendered)?;
                }
                Ok(())
            }
            NodeKind::Element(_) => self.process_element(id, rendered),
            _ => self.out.leaf(id),
        }
    }

    fn process_element(&mut self, id: NodeId, rendered: &NsMap) -> Result<(), Error> {
        let doc = self.out.doc;
        if !self.out.is_visible(id) {
            for &child in doc.children(id) {
                self.process_node(child, rendered)?;
            }
            return Ok(());
        }

        let inscope = render::inscope_namespaces(doc, id);
        let name = render::checked_name(doc, id, &inscope)?;

        let mut utilized = self.forced.clone();
        if let Some(elem) = doc.element(id) {
            utilized.insert(elem.name.prefix_str().to_owned());
            for attr in &elem.attributes {
                if let Some(p) = &attr.name.prefix {
                    utilized.insert(p.clone());
                }
            }
        }
        utilized.remove("xml");

        let mut decls = Vec::new();
        for prefix in &utilized {
            match inscope.get(prefix) {
                Some(uri) if rendered.get(prefix) != Some(uri) => decls.push(NsDecl {
                    prefix: prefix.clone(),
                    uri: uri.clone(),
                }),
                Some(_) => {}
                None if prefix.is_empty()
                    && rendered.get("").is_some_and(|d| !d.is_empty()) =>
                {
                    decls.push(NsDecl {
                        prefix: String::new(),
                        uri: String::new(),
                    })
                }
                None => {}
            }
        }
        decls.sort();

        let attrs = render::sorted_attrs(doc, id);
        self.out.start_tag(&name, &decls, &attrs)?;

        let mut child_rendered = rendered.clone();
        for d in &decls {
            child_rendered.insert(d.prefix.clone(), d.uri.clone());
        }
        for &child in doc.children(id) {
            self.process_node(child, &child_rendered)?;
        }
        self.out.end_tag(&name)
    }
}
