#![forbid(unsafe_code)]

//! XML-DSig signature creation.
//!
//! Fills a template in place: every `DigestValue`, then `SignatureValue`,
//! then any empty `KeyName`/`X509Data` the template asks for. A failed call
//! leaves the Signature partially filled; discard it rather than retrying.

use crate::context::{id_registry, SignatureProfile};
use crate::signed_info::SignedInfo;
use crate::template;
use solna_core::{ns, Error};
use solna_crypto::{b64, SigningCapability};
use solna_keys::Key;
use solna_transforms::Transform;
use solna_xml::{Document, NodeId, QName};
use tracing::{debug, info};

/// Sign the template rooted at `signature` with `key`.
pub fn sign(doc: &mut Document, signature: NodeId, key: &Key) -> Result<(), Error> {
    doc.check_node(signature)?;
    if !doc.is_named(signature, ns::DSIG, ns::node::SIGNATURE) {
        return Err(Error::MissingElement(ns::node::SIGNATURE.into()));
    }
    let signed_info = SignedInfo::read(doc, signature)?;
    let ids = id_registry(doc, &[])?;

    for reference in &signed_info.references {
        let digest = reference.compute_digest(doc, &ids, signature)?;
        debug!(uri = %reference.uri, digest = %b64::encode(&digest), "reference digested");
        doc.set_text_content(reference.digest_value, &b64::encode(&digest))?;
    }

    fill_key_info(doc, signature, key)?;

    let data = signed_info.canonical_bytes(doc)?;
    let value = SigningCapability::sign(key, signed_info.signature_method, &data)?;
    let value_node = doc
        .find_child_element(signature, ns::DSIG, ns::node::SIGNATURE_VALUE)
        .ok_or_else(|| Error::MissingElement(ns::node::SIGNATURE_VALUE.into()))?;
    doc.set_text_content(value_node, &b64::encode(&value))?;

    info!(
        references = signed_info.references.len(),
        method = signed_info.signature_method.uri(),
        "signature created"
    );
    Ok(())
}

/// Build an enveloped signature over `target` and sign it.
///
/// The reference is `#<ID>` when `target` carries an `ID` attribute (which is
/// registered on the document) and `""` otherwise. KeyInfo is added when the
/// key has a name or certificates. Returns the new Signature element.
pub fn sign_enveloped(
    doc: &mut Document,
    target: NodeId,
    key: &Key,
    profile: &SignatureProfile,
) -> Result<NodeId, Error> {
    let uri = template::reference_uri(doc, target)?;
    let signature = template::build_template(
        doc,
        target,
        profile.c14n,
        profile.signature_method,
        &profile.ns_prefix,
    )?;
    template::add_reference(
        doc,
        signature,
        profile.digest_method,
        &uri,
        &[Transform::EnvelopedSignature, Transform::c14n(profile.c14n)],
    )?;

    if key.name.is_some() || !key.x509_chain.is_empty() {
        let key_info = template::add_key_info(doc, signature)?;
        if let Some(name) = &key.name {
            template::add_key_name(doc, key_info, name)?;
        }
        if !key.x509_chain.is_empty() {
            template::add_x509_data(doc, key_info)?;
        }
    }

    sign(doc, signature, key)?;
    Ok(signature)
}

fn fill_key_info(doc: &mut Document, signature: NodeId, key: &Key) -> Result<(), Error> {
    let Some(key_info) = doc.find_child_element(signature, ns::DSIG, ns::node::KEY_INFO) else {
        return Ok(());
    };

    if let Some(name) = &key.name {
        for node in doc.find_child_elements(key_info, ns::DSIG, ns::node::KEY_NAME) {
            if doc.text_content(node).trim().is_empty() {
                doc.set_text_content(node, name)?;
            }
        }
    }

    for data in doc.find_child_elements(key_info, ns::DSIG, ns::node::X509_DATA) {
        if doc.children(data).iter().any(|&c| doc.is_element(c)) {
            continue;
        }
        let prefix = doc.element(data).and_then(|e| e.name.prefix.clone());
        for der in &key.x509_chain {
            let cert = doc.create_element(QName::with_ns(
                ns::DSIG,
                prefix.as_deref(),
                ns::node::X509_CERTIFICATE,
            ));
            doc.append_child(data, cert)?;
            doc.set_text_content(cert, &b64::encode(der))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solna_keys::loader;

    fn key() -> Key {
        loader::load_rsa_private_pem(include_bytes!("../tests/data/alice-key.pem")).unwrap()
    }

    #[test]
    fn test_sign_fills_values() {
        let mut doc = Document::parse(r#"<Msg ID="x1"><Body>hello</Body></Msg>"#).unwrap();
        let msg = doc.document_element().unwrap();
        let sig = sign_enveloped(&mut doc, msg, &key(), &SignatureProfile::default()).unwrap();

        let dv = doc.find_element(sig, ns::DSIG, ns::node::DIGEST_VALUE).unwrap();
        let sv = doc.find_child_element(sig, ns::DSIG, ns::node::SIGNATURE_VALUE).unwrap();
        assert_eq!(b64::decode(&doc.text_content(dv)).unwrap().len(), 32);
        assert_eq!(b64::decode(&doc.text_content(sv)).unwrap().len(), 256);
        assert!(doc.find_child_element(sig, ns::DSIG, ns::node::KEY_INFO).is_none());
    }

    #[test]
    fn test_key_info_filled_from_key() {
        let key = key()
            .with_name("alice")
            .with_certificate_pem(include_bytes!("../tests/data/alice-cert.pem"))
            .unwrap();
        let mut doc = Document::parse("<Msg><Body/></Msg>").unwrap();
        let msg = doc.document_element().unwrap();
        let sig = sign_enveloped(&mut doc, msg, &key, &SignatureProfile::default()).unwrap();

        let name = doc.find_element(sig, ns::DSIG, ns::node::KEY_NAME).unwrap();
        assert_eq!(doc.text_content(name), "alice");
        let cert = doc.find_element(sig, ns::DSIG, ns::node::X509_CERTIFICATE).unwrap();
        assert_eq!(b64::decode(&doc.text_content(cert)).unwrap(), key.x509_chain[0]);
    }

    #[test]
    fn test_template_key_name_filled() {
        let mut doc = Document::parse("<Msg/>").unwrap();
        let msg = doc.document_element().unwrap();
        let profile = SignatureProfile::default();
        let sig = template::build_template(&mut doc, msg, profile.c14n, profile.signature_method, "ds").unwrap();
        template::add_reference(&mut doc, sig, profile.digest_method, "", &[Transform::EnvelopedSignature]).unwrap();
        let ki = template::add_key_info(&mut doc, sig).unwrap();
        let kn = template::add_key_name(&mut doc, ki, "").unwrap();

        sign(&mut doc, sig, &key().with_name("alice")).unwrap();
        assert_eq!(doc.text_content(kn), "alice");
    }

    #[test]
    fn test_verify_only_key_cannot_sign() {
        let cert = loader::load_x509_cert_pem(include_bytes!("../tests/data/alice-cert.pem")).unwrap();
        let mut doc = Document::parse("<Msg/>").unwrap();
        let msg = doc.document_element().unwrap();
        let err = sign_enveloped(&mut doc, msg, &cert, &SignatureProfile::default()).unwrap_err();
        assert!(matches!(err, Error::MissingKey(_)));
    }

    #[test]
    fn test_missing_signed_info() {
        let mut doc = Document::parse(&format!(r#"<a><Signature xmlns="{}"/></a>"#, ns::DSIG)).unwrap();
        let sig = doc.find_element(doc.root(), ns::DSIG, ns::node::SIGNATURE).unwrap();
        assert!(matches!(sign(&mut doc, sig, &key()), Err(Error::MissingElement(_))));
    }

    #[test]
    fn test_foreign_node_rejected() {
        let mut doc = Document::parse("<Msg/>").unwrap();
        let stray = NodeId::new(99);
        let err = sign_enveloped(&mut doc, stray, &key(), &SignatureProfile::default()).unwrap_err();
        assert!(matches!(err, Error::XmlStructure(_)));
        assert!(matches!(sign(&mut doc, stray, &key()), Err(Error::XmlStructure(_))));
    }
}
