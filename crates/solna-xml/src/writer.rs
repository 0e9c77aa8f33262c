#![forbid(unsafe_code)]

//! Serializer: renders a document (or one subtree) back to XML text.
//!
//! Declarations and attributes are written in stored order and empty
//! elements get an explicit end tag. The output re-parses to the same tree.

use crate::document::{Document, NodeId, NodeKind};
use crate::escape::{escape_attr, escape_text};
use solna_core::Error;
use std::io::Write;

impl Document {
    /// Write `node` and everything below it to `sink`.
    pub fn write_to<W: Write>(&self, node: NodeId, sink: &mut W) -> Result<(), Error> {
        match self.kind(node) {
            NodeKind::Document => {
                let mut first = true;
                for &child in self.children(node) {
                    if !first {
                        sink.write_all(b"\n")?;
                    }
                    first = false;
                    self.write_to(child, sink)?;
                }
            }
            NodeKind::Element(elem) => {
                let name = elem.name.qualified();
                write!(sink, "<{name}")?;
                for (prefix, uri) in &elem.namespace_declarations {
                    if prefix.is_empty() {
                        write!(sink, " xmlns=\"{}\"", escape_attr(uri))?;
                    } else {
                        write!(sink, " xmlns:{prefix}=\"{}\"", escape_attr(uri))?;
                    }
                }
                for attr in &elem.attributes {
                    write!(
                        sink,
                        " {}=\"{}\"",
                        attr.name.qualified(),
                        escape_attr(&attr.value)
                    )?;
                }
                sink.write_all(b">")?;
                for &child in self.children(node) {
                    self.write_to(child, sink)?;
                }
                write!(sink, "</{name}>")?;
            }
            NodeKind::Text(t) => sink.write_all(escape_text(t).as_bytes())?,
            NodeKind::Comment(c) => write!(sink, "<!--{c}-->")?,
            NodeKind::ProcessingInstruction { target, data } => match data {
                Some(d) => write!(sink, "<?{target} {d}?>")?,
                None => write!(sink, "<?{target}?>")?,
            },
        }
        Ok(())
    }

    /// Serialize the whole document.
    pub fn to_xml_string(&self) -> Result<String, Error> {
        self.node_to_xml_string(self.root())
    }

    /// Serialize one node and its subtree.
    pub fn node_to_xml_string(&self, node: NodeId) -> Result<String, Error> {
        let mut out = Vec::new();
        self.write_to(node, &mut out)?;
        String::from_utf8(out).map_err(|e| Error::XmlStructure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::document::{Document, QName};

    #[test]
    fn test_serialize_built_tree() {
        let mut doc = Document::new();
        let root = doc.create_element(QName::with_ns("urn:x", Some("x"), "root"));
        doc.append_child(doc.root(), root).unwrap();
        doc.declare_namespace(root, "x", "urn:x").unwrap();
        doc.set_attribute(root, "note", "a\"b\n").unwrap();
        let empty = doc.create_element(QName::local("empty"));
        doc.append_child(root, empty).unwrap();
        let text = doc.create_text("1 < 2 & 3");
        doc.append_child(root, text).unwrap();

        assert_eq!(
            doc.to_xml_string().unwrap(),
            "<x:root xmlns:x=\"urn:x\" note=\"a&quot;b&#xA;\"><empty></empty>1 &lt; 2 &amp; 3</x:root>"
        );
    }

    #[test]
    fn test_serialize_reparses() {
        let src = "<!--c-->\n<a xmlns=\"urn:d\" k=\"v\"><b>t&#xD;</b><?p d?></a>";
        let doc = Document::parse(src).unwrap();
        let out = doc.to_xml_string().unwrap();
        let again = Document::parse(&out).unwrap();
        assert_eq!(again.to_xml_string().unwrap(), out);
        assert_eq!(out, "<!--c-->\n<a xmlns=\"urn:d\" k=\"v\"><b>t&#xD;</b><?p d?></a>");
    }
}
