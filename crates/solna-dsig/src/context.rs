#![forbid(unsafe_code)]

//! DSig context: trusted keys, identifier attributes and the signing profile.

use solna_c14n::C14nMode;
use solna_core::{ns, Error};
use solna_crypto::{DigestMethod, SignatureMethod};
use solna_keys::{Key, KeysManager};
use solna_xml::{Document, IdRegistry, NodeId};

/// Algorithms and prefix used when building a signature from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureProfile {
    /// SignedInfo canonicalization, also used as the reference transform.
    pub c14n: C14nMode,
    pub signature_method: SignatureMethod,
    pub digest_method: DigestMethod,
    /// Prefix bound to the XML-DSig namespace; empty for the default namespace.
    pub ns_prefix: String,
}

impl Default for SignatureProfile {
    fn default() -> Self {
        Self {
            c14n: C14nMode::ExclusiveWithComments,
            signature_method: SignatureMethod::RsaSha256,
            digest_method: DigestMethod::Sha256,
            ns_prefix: ns::DSIG_PREFIX.to_owned(),
        }
    }
}

/// Context for verification against a set of trusted keys.
#[derive(Debug, Clone, Default)]
pub struct DsigContext {
    /// Trust anchors. No chain validation is performed.
    pub keys_manager: KeysManager,
    /// Extra attribute names treated as identifiers besides `Id`, `ID`, `id`.
    pub id_attrs: Vec<String>,
}

impl DsigContext {
    pub fn new(keys_manager: KeysManager) -> Self {
        Self {
            keys_manager,
            id_attrs: Vec::new(),
        }
    }

    pub fn add_id_attr(&mut self, name: &str) {
        self.id_attrs.push(name.to_owned());
    }

    /// Pick the key for `signature`: the manager entry named by
    /// `KeyInfo/KeyName` if there is one, otherwise the first key.
    pub fn resolve_key(&self, doc: &Document, signature: NodeId) -> Result<&Key, Error> {
        let named = doc
            .find_child_element(signature, ns::DSIG, ns::node::KEY_INFO)
            .map(|ki| doc.find_child_elements(ki, ns::DSIG, ns::node::KEY_NAME))
            .unwrap_or_default()
            .into_iter()
            .map(|n| doc.text_content(n))
            .find_map(|name| self.keys_manager.find_by_name(name.trim()));
        match named {
            Some(key) => Ok(key),
            None => self.keys_manager.first_key(),
        }
    }
}

/// Identifier registry for processing `doc`: everything registered on the
/// document plus every attribute in the default and `extra` ID names.
pub(crate) fn id_registry(doc: &Document, extra: &[String]) -> Result<IdRegistry, Error> {
    let mut names: Vec<&str> = ns::attr::DEFAULT_ID_ATTRS.to_vec();
    names.extend(extra.iter().map(String::as_str));

    let mut ids = doc.ids().clone();
    for (value, node) in IdRegistry::scan(doc, &names)?.iter() {
        ids.register(value, node)?;
    }
    Ok(ids)
}
