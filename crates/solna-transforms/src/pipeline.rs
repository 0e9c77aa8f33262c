#![forbid(unsafe_code)]

//! Transform chain for XML-DSig references.

use crate::enveloped;
use solna_c14n::C14nMode;
use solna_core::{algorithm, ns, Error};
use solna_xml::{Document, NodeId, NodeSet};
use tracing::debug;

/// Data flowing through the transform chain.
#[derive(Debug, Clone)]
pub enum TransformData {
    /// Nodes of the document being signed or verified.
    NodeSet(NodeSet),
    /// Octets produced by a canonicalization step.
    Binary(Vec<u8>),
}

impl TransformData {
    /// Octets of this data; a node-set is serialized with inclusive C14N
    /// without comments.
    pub fn into_bytes(self, doc: &Document) -> Result<Vec<u8>, Error> {
        match self {
            Self::Binary(data) => Ok(data),
            Self::NodeSet(set) => solna_c14n::canonicalize(doc, Some(&set), C14nMode::Inclusive, &[]),
        }
    }
}

/// A supported `Transform`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    EnvelopedSignature,
    Canonicalization {
        mode: C14nMode,
        /// InclusiveNamespaces PrefixList (exclusive modes only).
        inclusive_prefixes: Vec<String>,
    },
}

impl Transform {
    pub fn c14n(mode: C14nMode) -> Self {
        Self::Canonicalization {
            mode,
            inclusive_prefixes: Vec::new(),
        }
    }

    pub fn uri(&self) -> &'static str {
        match self {
            Self::EnvelopedSignature => algorithm::ENVELOPED_SIGNATURE,
            Self::Canonicalization { mode, .. } => mode.uri(),
        }
    }

    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        if uri == algorithm::ENVELOPED_SIGNATURE {
            return Ok(Self::EnvelopedSignature);
        }
        C14nMode::from_uri(uri)
            .map(Self::c14n)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("transform: {uri}")))
    }

    /// Read a `<Transform>` element, including an `InclusiveNamespaces`
    /// child of an exclusive canonicalization transform.
    pub fn from_node(doc: &Document, node: NodeId) -> Result<Self, Error> {
        let uri = doc.attribute(node, ns::attr::ALGORITHM).ok_or_else(|| {
            Error::MissingAttribute(format!("{} on Transform", ns::attr::ALGORITHM))
        })?;
        let mut transform = Self::from_uri(uri)?;
        if let Self::Canonicalization {
            mode,
            inclusive_prefixes,
        } = &mut transform
        {
            if mode.is_exclusive() {
                *inclusive_prefixes = read_inclusive_prefixes(doc, node);
            }
        }
        Ok(transform)
    }

    /// Run this transform over `input`. `signature` is the Signature element
    /// whose reference is being processed.
    pub fn execute(
        &self,
        doc: &Document,
        signature: NodeId,
        input: TransformData,
    ) -> Result<TransformData, Error> {
        match self {
            Self::EnvelopedSignature => match input {
                TransformData::NodeSet(mut set) => {
                    enveloped::apply(doc, signature, &mut set)?;
                    Ok(TransformData::NodeSet(set))
                }
                TransformData::Binary(_) => Err(Error::Transform(
                    "enveloped-signature transform requires a node-set".into(),
                )),
            },
            Self::Canonicalization {
                mode,
                inclusive_prefixes,
            } => match input {
                TransformData::NodeSet(set) => Ok(TransformData::Binary(
                    solna_c14n::canonicalize(doc, Some(&set), *mode, inclusive_prefixes)?,
                )),
                TransformData::Binary(data) => {
                    let reparsed = Document::parse_bytes(&data)
                        .map_err(|e| Error::Transform(format!("canonicalization input: {e}")))?;
                    Ok(TransformData::Binary(solna_c14n::canonicalize(
                        &reparsed,
                        None,
                        *mode,
                        inclusive_prefixes,
                    )?))
                }
            },
        }
    }
}

/// Run `chain` left to right over `start` and return the octets to digest.
pub fn apply_chain(
    doc: &Document,
    signature: NodeId,
    start: NodeSet,
    chain: &[Transform],
) -> Result<Vec<u8>, Error> {
    let mut data = TransformData::NodeSet(start);
    for transform in chain {
        debug!(transform = transform.uri(), "applying transform");
        data = transform.execute(doc, signature, data)?;
    }
    data.into_bytes(doc)
}

/// The whitespace-separated `PrefixList` of an `InclusiveNamespaces` child.
pub fn read_inclusive_prefixes(doc: &Document, transform: NodeId) -> Vec<String> {
    doc.find_child_element(transform, ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES)
        .and_then(|n| doc.attribute(n, ns::attr::PREFIX_LIST))
        .map(|list| list.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}
