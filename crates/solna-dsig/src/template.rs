#![forbid(unsafe_code)]

//! Signature template construction.
//!
//! A template is a `<Signature>` subtree whose `DigestValue` and
//! `SignatureValue` elements are still empty; [`crate::sign::sign`] fills them.
//! Calling [`add_reference`] twice with the same arguments adds two references.

use solna_c14n::C14nMode;
use solna_core::{ns, Error};
use solna_crypto::{DigestMethod, SignatureMethod};
use solna_transforms::Transform;
use solna_xml::{Document, NodeId, QName};

const EXC_C14N_PREFIX: &str = "ec";

/// Create an element in the XML-DSig namespace using the prefix of `parent`
/// and append it to `parent`.
fn append_dsig_element(doc: &mut Document, parent: NodeId, local_name: &str) -> Result<NodeId, Error> {
    let prefix = doc
        .element(parent)
        .and_then(|e| e.name.prefix.clone());
    let el = doc.create_element(QName::with_ns(ns::DSIG, prefix.as_deref(), local_name));
    doc.append_child(parent, el)?;
    Ok(el)
}

fn dsig_child(doc: &Document, parent: NodeId, local_name: &str) -> Result<NodeId, Error> {
    doc.find_child_element(parent, ns::DSIG, local_name)
        .ok_or_else(|| Error::MissingElement(local_name.to_owned()))
}

/// Build an empty Signature and attach it as the last child of `target`.
///
/// `prefix` is bound to the XML-DSig namespace on the Signature element; an
/// empty prefix makes it the default namespace.
pub fn build_template(
    doc: &mut Document,
    target: NodeId,
    c14n: C14nMode,
    signature_method: SignatureMethod,
    prefix: &str,
) -> Result<NodeId, Error> {
    if !doc.is_element(target) {
        return Err(Error::XmlStructure("signature target must be an element".into()));
    }
    let signature = doc.create_element(QName::with_ns(ns::DSIG, Some(prefix), ns::node::SIGNATURE));
    doc.declare_namespace(signature, prefix, ns::DSIG)?;

    let signed_info = append_dsig_element(doc, signature, ns::node::SIGNED_INFO)?;
    let c14n_method = append_dsig_element(doc, signed_info, ns::node::CANONICALIZATION_METHOD)?;
    doc.set_attribute(c14n_method, ns::attr::ALGORITHM, c14n.uri())?;
    let sig_method = append_dsig_element(doc, signed_info, ns::node::SIGNATURE_METHOD)?;
    doc.set_attribute(sig_method, ns::attr::ALGORITHM, signature_method.uri())?;
    append_dsig_element(doc, signature, ns::node::SIGNATURE_VALUE)?;

    doc.append_child(target, signature)?;
    Ok(signature)
}

/// Add a `<Reference>` with an empty `DigestValue` to the SignedInfo of
/// `signature`.
pub fn add_reference(
    doc: &mut Document,
    signature: NodeId,
    digest_method: DigestMethod,
    uri: &str,
    transforms: &[Transform],
) -> Result<NodeId, Error> {
    let signed_info = dsig_child(doc, signature, ns::node::SIGNED_INFO)?;
    let reference = append_dsig_element(doc, signed_info, ns::node::REFERENCE)?;
    doc.set_attribute(reference, ns::attr::URI, uri)?;
    let dm = append_dsig_element(doc, reference, ns::node::DIGEST_METHOD)?;
    doc.set_attribute(dm, ns::attr::ALGORITHM, digest_method.uri())?;
    append_dsig_element(doc, reference, ns::node::DIGEST_VALUE)?;

    for transform in transforms {
        add_transform(doc, reference, transform)?;
    }
    Ok(reference)
}

/// Append `transform` to the chain of `reference`, creating `<Transforms>`
/// ahead of `DigestMethod` when needed.
pub fn add_transform(doc: &mut Document, reference: NodeId, transform: &Transform) -> Result<NodeId, Error> {
    if !doc.is_named(reference, ns::DSIG, ns::node::REFERENCE) {
        return Err(Error::XmlStructure("transforms can only be added to a Reference".into()));
    }
    let transforms = match doc.find_child_element(reference, ns::DSIG, ns::node::TRANSFORMS) {
        Some(t) => t,
        None => {
            let prefix = doc.element(reference).and_then(|e| e.name.prefix.clone());
            let t = doc.create_element(QName::with_ns(ns::DSIG, prefix.as_deref(), ns::node::TRANSFORMS));
            doc.insert_child(reference, 0, t)?;
            t
        }
    };

    let node = append_dsig_element(doc, transforms, ns::node::TRANSFORM)?;
    doc.set_attribute(node, ns::attr::ALGORITHM, transform.uri())?;
    if let Transform::Canonicalization {
        mode,
        inclusive_prefixes,
    } = transform
    {
        if mode.is_exclusive() && !inclusive_prefixes.is_empty() {
            let inc = doc.create_element(QName::with_ns(
                ns::EXC_C14N,
                Some(EXC_C14N_PREFIX),
                ns::node::INCLUSIVE_NAMESPACES,
            ));
            doc.declare_namespace(inc, EXC_C14N_PREFIX, ns::EXC_C14N)?;
            doc.set_attribute(inc, ns::attr::PREFIX_LIST, &inclusive_prefixes.join(" "))?;
            doc.append_child(node, inc)?;
        }
    }
    Ok(node)
}

/// Add (or return the existing) `<KeyInfo>` of `signature`.
pub fn add_key_info(doc: &mut Document, signature: NodeId) -> Result<NodeId, Error> {
    if let Some(existing) = doc.find_child_element(signature, ns::DSIG, ns::node::KEY_INFO) {
        return Ok(existing);
    }
    dsig_child(doc, signature, ns::node::SIGNATURE_VALUE)?;
    append_dsig_element(doc, signature, ns::node::KEY_INFO)
}

/// Add a `<KeyName>`. An empty `name` is filled from the signing key.
pub fn add_key_name(doc: &mut Document, key_info: NodeId, name: &str) -> Result<NodeId, Error> {
    let node = append_dsig_element(doc, key_info, ns::node::KEY_NAME)?;
    doc.set_text_content(node, name)?;
    Ok(node)
}

/// Add an empty `<X509Data>`; signing fills it with the key's certificates.
pub fn add_x509_data(doc: &mut Document, key_info: NodeId) -> Result<NodeId, Error> {
    append_dsig_element(doc, key_info, ns::node::X509_DATA)
}

/// Reference URI for signing `target`: `#<ID>` when the element carries an
/// `ID` attribute (registered on the document), otherwise `""`.
pub fn reference_uri(doc: &mut Document, target: NodeId) -> Result<String, Error> {
    doc.check_node(target)?;
    let Some(id) = doc.attribute(target, ns::attr::ID).map(str::to_owned) else {
        return Ok(String::new());
    };
    if id.is_empty() {
        return Err(Error::ReferenceResolution("empty ID attribute on signed element".into()));
    }
    doc.register_id(&id, target)?;
    Ok(format!("#{id}"))
}
