#![forbid(unsafe_code)]

//! Parser adapter: builds a [`Document`] from quick-xml events.
//!
//! Namespace prefixes are resolved here, against the declarations in scope,
//! so that every element and attribute carries both its written prefix and
//! its namespace URI. Line endings and attribute whitespace are normalized
//! as an XML processor would.

use crate::document::{Attribute, Document, NodeId, QName};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use solna_core::{ns, Error};

/// Parse a UTF-8 XML document.
pub fn parse(xml: &str) -> Result<Document, Error> {
    let normalized = normalize_line_endings(xml);
    Builder::new().run(&normalized)
}

/// Parse raw bytes, rejecting anything that is not valid UTF-8.
pub fn parse_bytes(bytes: &[u8]) -> Result<Document, Error> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::XmlParse(format!("input is not valid UTF-8: {e}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    parse(text)
}

impl Document {
    /// See [`parse`].
    pub fn parse(xml: &str) -> Result<Self, Error> {
        parse(xml)
    }

    /// See [`parse_bytes`].
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, Error> {
        parse_bytes(bytes)
    }
}

fn normalize_line_endings(xml: &str) -> String {
    if xml.contains('\r') {
        xml.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        xml.to_owned()
    }
}

struct Builder {
    doc: Document,
    open: Vec<NodeId>,
    /// Text accumulated since the last markup event.
    pending_text: String,
}

impl Builder {
    fn new() -> Self {
        Self {
            doc: Document::new(),
            open: Vec::new(),
            pending_text: String::new(),
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or_else(|| self.doc.root())
    }

    fn run(mut self, xml: &str) -> Result<Document, Error> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        loop {
            let event = reader.read_event().map_err(|e| {
                Error::XmlParse(format!("at byte {}: {e}", reader.error_position()))
            })?;
            match event {
                Event::Start(e) => {
                    self.flush_text()?;
                    let el = self.start_element(&e)?;
                    self.open.push(el);
                }
                Event::Empty(e) => {
                    self.flush_text()?;
                    self.start_element(&e)?;
                }
                Event::End(_) => {
                    self.flush_text()?;
                    self.open.pop();
                }
                Event::Text(e) => {
                    let text = e.unescape().map_err(|e| Error::XmlParse(e.to_string()))?;
                    self.pending_text.push_str(&text);
                }
                Event::CData(e) => {
                    let raw = e.into_inner();
                    let text = std::str::from_utf8(&raw)
                        .map_err(|e| Error::XmlParse(e.to_string()))?;
                    self.pending_text.push_str(text);
                }
                Event::Comment(e) => {
                    self.flush_text()?;
                    let text = std::str::from_utf8(&e)
                        .map_err(|e| Error::XmlParse(e.to_string()))?;
                    let c = self.doc.create_comment(text);
                    self.doc.append_child(self.current(), c)?;
                }
                Event::PI(e) => {
                    self.flush_text()?;
                    let target = utf8(e.target())?;
                    let data = utf8(e.content())?.trim_start();
                    let data = (!data.is_empty()).then_some(data);
                    let pi = self.doc.create_processing_instruction(target, data);
                    self.doc.append_child(self.current(), pi)?;
                }
                Event::Decl(_) | Event::DocType(_) => {
                    self.flush_text()?;
                }
                Event::Eof => break,
            }
        }

        self.flush_text()?;
        if let Some(&unclosed) = self.open.last() {
            let name = self
                .doc
                .element(unclosed)
                .map(|e| e.name.qualified())
                .unwrap_or_default();
            return Err(Error::XmlParse(format!("unclosed element <{name}>")));
        }
        if self.doc.document_element().is_none() {
            return Err(Error::XmlParse("document has no root element".into()));
        }
        Ok(self.doc)
    }

    fn flush_text(&mut self) -> Result<(), Error> {
        if self.pending_text.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.pending_text);
        if self.open.is_empty() {
            if text.chars().all(is_xml_whitespace) {
                return Ok(());
            }
            return Err(Error::XmlParse(
                "character data outside the root element".into(),
            ));
        }
        let t = self.doc.create_text(&text);
        self.doc.append_child(self.current(), t)
    }

    fn start_element(&mut self, e: &BytesStart<'_>) -> Result<NodeId, Error> {
        let parent = self.current();
        if self.open.is_empty() && self.doc.document_element().is_some() {
            return Err(Error::XmlParse("document has more than one root element".into()));
        }

        let mut declarations = Vec::new();
        let mut raw_attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|e| Error::XmlParse(e.to_string()))?;
            let key = utf8(attr.key.as_ref())?;
            let value = attribute_value(&attr.value)?;
            if key == "xmlns" {
                declarations.push((String::new(), value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                if value.is_empty() {
                    return Err(Error::XmlParse(format!(
                        "prefix {prefix:?} cannot be undeclared"
                    )));
                }
                declarations.push((prefix.to_owned(), value));
            } else {
                raw_attrs.push((key.to_owned(), value));
            }
        }

        let qname = utf8(e.name().as_ref())?.to_owned();
        let el = self.doc.create_element(QName::local(&qname));
        self.doc.append_child(parent, el)?;
        for (prefix, uri) in &declarations {
            self.doc.declare_namespace(el, prefix, uri)?;
        }

        let name = self.resolve(el, &qname, true)?;
        let mut attributes = Vec::with_capacity(raw_attrs.len());
        for (key, value) in raw_attrs {
            let name = self.resolve(el, &key, false)?;
            if attributes.iter().any(|a: &Attribute| {
                a.name.local_name == name.local_name && a.name.namespace_uri == name.namespace_uri
            }) {
                return Err(Error::XmlParse(format!("duplicate attribute {key:?}")));
            }
            attributes.push(Attribute { name, value });
        }

        if let Some(elem) = self.doc.element_mut(el) {
            elem.name = name;
            elem.attributes = attributes;
        }
        Ok(el)
    }

    /// Split `prefix:local` and bind the prefix in the scope of `el`.
    /// Unprefixed attributes are in no namespace; unprefixed elements take
    /// the default namespace.
    fn resolve(&self, el: NodeId, raw: &str, is_element: bool) -> Result<QName, Error> {
        match raw.split_once(':') {
            Some((prefix, local)) => {
                let uri = if prefix == "xml" {
                    ns::XML
                } else {
                    self.doc.lookup_namespace(el, prefix).ok_or_else(|| {
                        Error::XmlParse(format!("unbound namespace prefix {prefix:?}"))
                    })?
                };
                Ok(QName::with_ns(uri, Some(prefix), local))
            }
            None if is_element => Ok(match self.doc.lookup_namespace(el, "") {
                Some(uri) => QName::with_ns(uri, None, raw),
                None => QName::local(raw),
            }),
            None => Ok(QName::local(raw)),
        }
    }
}

/// Attribute-value normalization: literal whitespace becomes a space, then
/// entity and character references are expanded.
fn attribute_value(raw: &[u8]) -> Result<String, Error> {
    let raw = utf8(raw)?;
    let spaced: String = raw
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect();
    quick_xml::escape::unescape(&spaced)
        .map(|v| v.into_owned())
        .map_err(|e| Error::XmlParse(e.to_string()))
}

fn utf8(bytes: &[u8]) -> Result<&str, Error> {
    std::str::from_utf8(bytes).map_err(|e| Error::XmlParse(e.to_string()))
}

fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}
