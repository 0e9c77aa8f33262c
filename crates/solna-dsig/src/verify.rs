#![forbid(unsafe_code)]

//! XML-DSig signature verification.
//!
//! Processing order:
//! 1. Locate `<Signature>` (depth-first from the start node)
//! 2. Read `<SignedInfo>`: CanonicalizationMethod, SignatureMethod, references
//! 3. For each `<Reference>`: resolve URI, run transforms, digest, compare
//! 4. Canonicalize `<SignedInfo>` and check `<SignatureValue>`
//!
//! The document is never modified, so a signature can be checked repeatedly.

use crate::context::{id_registry, DsigContext};
use crate::signed_info::SignedInfo;
use solna_core::{ns, Error};
use solna_crypto::{b64, VerificationCapability};
use solna_keys::Key;
use solna_xml::{Document, NodeId};
use std::fmt;
use tracing::{info, warn};

/// Why a signature was checked and found invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The listed reference URIs digest to something other than their
    /// `DigestValue`.
    DigestMismatch { references: Vec<String> },
    /// The `SignatureValue` does not verify over the canonical SignedInfo.
    SignatureInvalid(String),
}

/// Outcome of a verification that could be carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Succeeded,
    Failed(Failure),
    Indeterminate(String),
}

impl Verdict {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DigestMismatch { references } => {
                let uris: Vec<String> = references.iter().map(|u| format!("{u:?}")).collect();
                write!(f, "digest mismatch for reference(s) {}", uris.join(", "))
            }
            Self::SignatureInvalid(reason) => write!(f, "signature invalid: {reason}"),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("OK"),
            Self::Failed(failure) => write!(f, "FAIL: {failure}"),
            Self::Indeterminate(reason) => write!(f, "INDETERMINATE: {reason}"),
        }
    }
}

const NO_SIGNATURE: &str = "no signature present";

/// Verify the first Signature at or below `start` against `trusted_key`.
pub fn verify(doc: &Document, start: NodeId, trusted_key: &Key) -> Result<Verdict, Error> {
    doc.check_node(start)?;
    let Some(signature) = doc.find_element(start, ns::DSIG, ns::node::SIGNATURE) else {
        return Ok(Verdict::Indeterminate(NO_SIGNATURE.into()));
    };
    verify_signature(doc, signature, &[], trusted_key)
}

impl DsigContext {
    /// Verify the first Signature at or below `start`, taking the key from
    /// the keys manager.
    pub fn verify(&self, doc: &Document, start: NodeId) -> Result<Verdict, Error> {
        doc.check_node(start)?;
        let Some(signature) = doc.find_element(start, ns::DSIG, ns::node::SIGNATURE) else {
            return Ok(Verdict::Indeterminate(NO_SIGNATURE.into()));
        };
        let key = self.resolve_key(doc, signature)?;
        verify_signature(doc, signature, &self.id_attrs, key)
    }
}

/// Verify the Signature element `signature` with any verification
/// capability.
pub fn verify_signature<K: VerificationCapability + ?Sized>(
    doc: &Document,
    signature: NodeId,
    id_attrs: &[String],
    key: &K,
) -> Result<Verdict, Error> {
    doc.check_node(signature)?;
    let signed_info = SignedInfo::read(doc, signature)?;
    let ids = id_registry(doc, id_attrs)?;

    let mut mismatched = Vec::new();
    for reference in &signed_info.references {
        let computed = reference.compute_digest(doc, &ids, signature)?;
        let matches = match b64::decode(&doc.text_content(reference.digest_value)) {
            Ok(expected) => expected == computed,
            Err(e) => {
                warn!(uri = %reference.uri, error = %e, "malformed DigestValue");
                false
            }
        };
        if !matches {
            warn!(uri = %reference.uri, "reference digest mismatch");
            mismatched.push(reference.uri.clone());
        }
    }

    let data = signed_info.canonical_bytes(doc)?;
    let value_node = doc
        .find_child_element(signature, ns::DSIG, ns::node::SIGNATURE_VALUE)
        .ok_or_else(|| Error::MissingElement(ns::node::SIGNATURE_VALUE.into()))?;
    let signature_check = match b64::decode(&doc.text_content(value_node)) {
        Ok(value) => key
            .verify(signed_info.signature_method, &data, &value)?
            .then_some(())
            .ok_or_else(|| "SignatureValue does not match SignedInfo".to_owned()),
        Err(e) => {
            warn!(error = %e, "malformed SignatureValue");
            Err(format!("malformed SignatureValue: {e}"))
        }
    };

    let verdict = match signature_check {
        _ if !mismatched.is_empty() => Verdict::Failed(Failure::DigestMismatch {
            references: mismatched,
        }),
        Err(reason) => Verdict::Failed(Failure::SignatureInvalid(reason)),
        Ok(()) => Verdict::Succeeded,
    };
    Ok(conclude(verdict))
}

fn conclude(verdict: Verdict) -> Verdict {
    info!(%verdict, "signature verification finished");
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SignatureProfile;
    use crate::sign::sign_enveloped;
    use solna_keys::{loader, KeysManager};

    const ALICE_KEY: &[u8] = include_bytes!("../tests/data/alice-key.pem");
    const ALICE_CERT: &[u8] = include_bytes!("../tests/data/alice-cert.pem");
    const BOB_CERT: &[u8] = include_bytes!("../tests/data/bob-cert.pem");

    fn signed(xml: &str, key: &Key) -> Document {
        let mut doc = Document::parse(xml).unwrap();
        let root = doc.document_element().unwrap();
        sign_enveloped(&mut doc, root, key, &SignatureProfile::default()).unwrap();
        doc
    }

    #[test]
    fn test_no_signature_is_indeterminate() {
        let doc = Document::parse("<a/>").unwrap();
        let cert = loader::load_x509_cert_pem(ALICE_CERT).unwrap();
        assert_eq!(
            verify(&doc, doc.root(), &cert).unwrap(),
            Verdict::Indeterminate(NO_SIGNATURE.into())
        );
    }

    #[test]
    fn test_context_picks_key_by_name() {
        let alice = loader::load_rsa_private_pem(ALICE_KEY).unwrap().with_name("alice");
        let doc = signed(r#"<Msg ID="m"><Body>hi</Body></Msg>"#, &alice);

        let mut km = KeysManager::new();
        km.add_key(loader::load_x509_cert_pem(BOB_CERT).unwrap().with_name("bob"));
        km.add_key(loader::load_x509_cert_pem(ALICE_CERT).unwrap().with_name("alice"));
        let ctx = DsigContext::new(km);
        assert!(ctx.verify(&doc, doc.root()).unwrap().is_succeeded());
    }

    #[test]
    fn test_context_without_keys_is_error() {
        let alice = loader::load_rsa_private_pem(ALICE_KEY).unwrap();
        let doc = signed("<Msg/>", &alice);
        let ctx = DsigContext::default();
        assert!(matches!(ctx.verify(&doc, doc.root()), Err(Error::MissingKey(_))));
    }

    #[test]
    fn test_malformed_digest_value_fails() {
        let alice = loader::load_rsa_private_pem(ALICE_KEY).unwrap();
        let mut doc = signed(r#"<Msg ID="m"/>"#, &alice);
        let dv = doc.find_element(doc.root(), ns::DSIG, ns::node::DIGEST_VALUE).unwrap();
        doc.set_text_content(dv, "not*base64").unwrap();
        let cert = loader::load_x509_cert_pem(ALICE_CERT).unwrap();
        let verdict = verify(&doc, doc.root(), &cert).unwrap();
        assert_eq!(
            verdict,
            Verdict::Failed(Failure::DigestMismatch {
                references: vec!["#m".into()]
            })
        );
    }

    #[test]
    fn test_foreign_start_node_is_error() {
        let doc = Document::parse("<a/>").unwrap();
        let cert = loader::load_x509_cert_pem(ALICE_CERT).unwrap();
        assert!(matches!(
            verify(&doc, NodeId::new(99), &cert),
            Err(Error::XmlStructure(_))
        ));
        assert!(matches!(
            DsigContext::default().verify(&doc, NodeId::new(99)),
            Err(Error::XmlStructure(_))
        ));
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::Succeeded.to_string(), "OK");
        let v = Verdict::Failed(Failure::DigestMismatch {
            references: vec!["#a".into(), String::new()],
        });
        assert_eq!(v.to_string(), r##"FAIL: digest mismatch for reference(s) "#a", """##);
    }
}
