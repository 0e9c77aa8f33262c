#![forbid(unsafe_code)]

//! XML Canonicalization (C14N) for Solna.
//!
//! Implements the four W3C Canonical XML 1.0 variants used by XML-DSig:
//! inclusive and exclusive, each with or without comments. Output is the
//! canonical byte stream of a whole document or of a node-set drawn from it.

pub mod exclusive;
pub mod inclusive;
pub mod render;

use solna_core::{algorithm, Error};
use solna_xml::{Document, NodeId, NodeSet};
use std::io::Write;

/// The canonicalization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum C14nMode {
    /// Canonical XML 1.0
    Inclusive,
    /// Canonical XML 1.0 with comments
    InclusiveWithComments,
    /// Exclusive Canonical XML 1.0
    Exclusive,
    /// Exclusive Canonical XML 1.0 with comments
    ExclusiveWithComments,
}

impl C14nMode {
    pub fn new(exclusive: bool, with_comments: bool) -> Self {
        match (exclusive, with_comments) {
            (false, false) => Self::Inclusive,
            (false, true) => Self::InclusiveWithComments,
            (true, false) => Self::Exclusive,
            (true, true) => Self::ExclusiveWithComments,
        }
    }

    /// Get the algorithm URI for this mode.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Inclusive => algorithm::C14N,
            Self::InclusiveWithComments => algorithm::C14N_WITH_COMMENTS,
            Self::Exclusive => algorithm::EXC_C14N,
            Self::ExclusiveWithComments => algorithm::EXC_C14N_WITH_COMMENTS,
        }
    }

    /// Parse a C14N mode from an algorithm URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithm::C14N => Some(Self::Inclusive),
            algorithm::C14N_WITH_COMMENTS => Some(Self::InclusiveWithComments),
            algorithm::EXC_C14N => Some(Self::Exclusive),
            algorithm::EXC_C14N_WITH_COMMENTS => Some(Self::ExclusiveWithComments),
            _ => None,
        }
    }

    pub fn with_comments(&self) -> bool {
        matches!(self, Self::InclusiveWithComments | Self::ExclusiveWithComments)
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::Exclusive | Self::ExclusiveWithComments)
    }
}

impl std::fmt::Display for C14nMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.uri())
    }
}

/// Canonicalize a document, or the node-set `node_set` drawn from it.
///
/// `inclusive_prefixes` is the InclusiveNamespaces PrefixList and only
/// affects the exclusive modes.
pub fn canonicalize(
    doc: &Document,
    node_set: Option<&NodeSet>,
    mode: C14nMode,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    canonicalize_to(doc, node_set, mode, inclusive_prefixes, &mut out)?;
    Ok(out)
}

/// Like [`canonicalize`], writing into a caller-supplied sink.
pub fn canonicalize_to<W: Write>(
    doc: &Document,
    node_set: Option<&NodeSet>,
    mode: C14nMode,
    inclusive_prefixes: &[String],
    sink: &mut W,
) -> Result<(), Error> {
    if mode.is_exclusive() {
        exclusive::canonicalize(doc, mode.with_comments(), node_set, inclusive_prefixes, sink)
    } else {
        inclusive::canonicalize(doc, mode.with_comments(), node_set, sink)
    }
}

/// Canonicalize the subtree rooted at `root`.
pub fn canonicalize_subtree(
    doc: &Document,
    root: NodeId,
    mode: C14nMode,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    if !doc.contains(root) {
        return Err(Error::Canonicalization("node does not belong to this document".into()));
    }
    let set = NodeSet::tree(doc, root, true);
    canonicalize(doc, Some(&set), mode, inclusive_prefixes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_MODES: [C14nMode; 4] = [
        C14nMode::Inclusive,
        C14nMode::InclusiveWithComments,
        C14nMode::Exclusive,
        C14nMode::ExclusiveWithComments,
    ];

    fn c14n_str(xml: &str, mode: C14nMode) -> Vec<u8> {
        let doc = Document::parse(xml).unwrap();
        canonicalize(&doc, None, mode, &[]).unwrap()
    }

    #[test]
    fn test_mode_uri_roundtrip() {
        for mode in ALL_MODES {
            assert_eq!(C14nMode::from_uri(mode.uri()), Some(mode));
        }
        assert_eq!(C14nMode::new(true, true), C14nMode::ExclusiveWithComments);
        assert_eq!(C14nMode::from_uri("urn:unknown"), None);
    }

    #[test]
    fn test_attribute_order_insensitive() {
        let a = r#"<doc xmlns:x="urn:x" b="2" a="1" x:z="3"><e/></doc>"#;
        let b = "<doc   x:z='3' a=\"1\"\n  xmlns:x=\"urn:x\" b='2'><e></e></doc>";
        for mode in ALL_MODES {
            assert_eq!(c14n_str(a, mode), c14n_str(b, mode), "{mode:?}");
        }
    }

    #[test]
    fn test_idempotent() {
        let src = "<?xml version=\"1.0\"?>\n<!--lead-->\n<a:doc xmlns:a=\"urn:a\" xmlns=\"urn:d\" k='v &amp; &#9;w'>\r\n  <b x=\"1\"/><![CDATA[1 < 2]]><?pi  data ?></a:doc>";
        for mode in ALL_MODES {
            let once = c14n_str(src, mode);
            let twice = c14n_str(std::str::from_utf8(&once).unwrap(), mode);
            assert_eq!(once, twice, "{mode:?}");
        }
    }

    #[test]
    fn test_empty_element_has_end_tag() {
        assert_eq!(c14n_str("<a/>", C14nMode::Exclusive), b"<a></a>");
    }

    #[test]
    fn test_escaping() {
        let out = c14n_str("<a v=\"&lt;&gt;&quot;&#xA;\">&gt;&#xD;</a>", C14nMode::Inclusive);
        assert_eq!(out, b"<a v=\"&lt;>&quot;&#xA;\">&gt;&#xD;</a>");
    }

    #[test]
    fn test_subtree() {
        let doc = Document::parse(r#"<r xmlns:a="urn:a"><a:s><!--c--></a:s></r>"#).unwrap();
        let r = doc.document_element().unwrap();
        let s = doc.children(r)[0];
        assert_eq!(
            canonicalize_subtree(&doc, s, C14nMode::ExclusiveWithComments, &[]).unwrap(),
            b"<a:s xmlns:a=\"urn:a\"><!--c--></a:s>"
        );
        assert_eq!(
            canonicalize_subtree(&doc, s, C14nMode::Inclusive, &[]).unwrap(),
            b"<a:s xmlns:a=\"urn:a\"></a:s>"
        );
    }

    #[test]
    fn test_unresolved_prefix_is_error() {
        let mut doc = Document::new();
        let el = doc.create_element(solna_xml::QName::with_ns("urn:p", Some("p"), "e"));
        doc.append_child(doc.root(), el).unwrap();
        for mode in ALL_MODES {
            assert!(matches!(
                canonicalize(&doc, None, mode, &[]),
                Err(Error::Canonicalization(_))
            ));
        }
    }
}
