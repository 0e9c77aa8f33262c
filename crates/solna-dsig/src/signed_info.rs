#![forbid(unsafe_code)]

//! Reading `<SignedInfo>` and its references out of a Signature element.
//! Signing and verification share this so both see exactly the same bytes.

use solna_c14n::C14nMode;
use solna_core::{ns, Error};
use solna_crypto::{DigestMethod, SignatureMethod};
use solna_transforms::{pipeline, Transform};
use solna_xml::{Document, IdRegistry, NodeId, NodeSet};
use tracing::debug;

#[derive(Debug)]
pub(crate) struct SignedInfo {
    pub node: NodeId,
    pub c14n: C14nMode,
    pub inclusive_prefixes: Vec<String>,
    pub signature_method: SignatureMethod,
    pub references: Vec<Reference>,
}

#[derive(Debug)]
pub(crate) struct Reference {
    pub uri: String,
    pub digest_method: DigestMethod,
    pub transforms: Vec<Transform>,
    pub digest_value: NodeId,
}

fn required_child(doc: &Document, parent: NodeId, local_name: &str) -> Result<NodeId, Error> {
    doc.find_child_element(parent, ns::DSIG, local_name)
        .ok_or_else(|| Error::MissingElement(local_name.to_owned()))
}

fn algorithm<'a>(doc: &'a Document, node: NodeId, owner: &str) -> Result<&'a str, Error> {
    doc.attribute(node, ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingAttribute(format!("{} on {owner}", ns::attr::ALGORITHM)))
}

impl SignedInfo {
    pub fn read(doc: &Document, signature: NodeId) -> Result<Self, Error> {
        let node = required_child(doc, signature, ns::node::SIGNED_INFO)?;

        let c14n_node = required_child(doc, node, ns::node::CANONICALIZATION_METHOD)?;
        let c14n_uri = algorithm(doc, c14n_node, ns::node::CANONICALIZATION_METHOD)?;
        let c14n = C14nMode::from_uri(c14n_uri)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {c14n_uri}")))?;
        let inclusive_prefixes = if c14n.is_exclusive() {
            pipeline::read_inclusive_prefixes(doc, c14n_node)
        } else {
            Vec::new()
        };

        let sig_node = required_child(doc, node, ns::node::SIGNATURE_METHOD)?;
        let signature_method =
            SignatureMethod::from_uri(algorithm(doc, sig_node, ns::node::SIGNATURE_METHOD)?)?;

        let references = doc
            .find_child_elements(node, ns::DSIG, ns::node::REFERENCE)
            .into_iter()
            .map(|r| Reference::read(doc, r))
            .collect::<Result<Vec<_>, _>>()?;
        if references.is_empty() {
            return Err(Error::MissingElement(ns::node::REFERENCE.into()));
        }

        Ok(Self {
            node,
            c14n,
            inclusive_prefixes,
            signature_method,
            references,
        })
    }

    /// The octets that are signed: SignedInfo canonicalized with its own
    /// CanonicalizationMethod.
    pub fn canonical_bytes(&self, doc: &Document) -> Result<Vec<u8>, Error> {
        let set = NodeSet::tree(doc, self.node, true);
        let bytes = solna_c14n::canonicalize(doc, Some(&set), self.c14n, &self.inclusive_prefixes)?;
        debug!(
            c14n = %self.c14n,
            signed_info = %String::from_utf8_lossy(&bytes),
            "canonical SignedInfo"
        );
        Ok(bytes)
    }
}

impl Reference {
    fn read(doc: &Document, node: NodeId) -> Result<Self, Error> {
        let uri = doc.attribute(node, ns::attr::URI).unwrap_or_default().to_owned();

        let transforms = match doc.find_child_element(node, ns::DSIG, ns::node::TRANSFORMS) {
            Some(list) => doc
                .find_child_elements(list, ns::DSIG, ns::node::TRANSFORM)
                .into_iter()
                .map(|t| Transform::from_node(doc, t))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let dm_node = required_child(doc, node, ns::node::DIGEST_METHOD)?;
        let digest_method =
            DigestMethod::from_uri(algorithm(doc, dm_node, ns::node::DIGEST_METHOD)?)?;
        let digest_value = required_child(doc, node, ns::node::DIGEST_VALUE)?;

        Ok(Self {
            uri,
            digest_method,
            transforms,
            digest_value,
        })
    }

    /// Resolve the URI, run the transform chain and hash the result.
    pub fn compute_digest(
        &self,
        doc: &Document,
        ids: &IdRegistry,
        signature: NodeId,
    ) -> Result<Vec<u8>, Error> {
        let start = solna_transforms::resolve_uri(doc, ids, &self.uri)?;
        let data = solna_transforms::apply_chain(doc, signature, start, &self.transforms)?;
        debug!(
            uri = %self.uri,
            pre_digest = %String::from_utf8_lossy(&data),
            "reference data"
        );
        Ok(self.digest_method.digest(&data))
    }
}
