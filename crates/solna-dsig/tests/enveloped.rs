use solna_c14n::C14nMode;
use solna_core::{ns, Error};
use solna_dsig::{sign_enveloped, verify, DsigContext, Failure, SignatureProfile, Verdict};
use solna_keys::{loader, Key, KeysManager};
use solna_xml::Document;

const ALICE_KEY: &[u8] = include_bytes!("data/alice-key.pem");
const ALICE_CERT: &[u8] = include_bytes!("data/alice-cert.pem");
const BOB_KEY: &[u8] = include_bytes!("data/bob-key.pem");
const BOB_CERT: &[u8] = include_bytes!("data/bob-cert.pem");
const MSG: &str = r#"<Msg ID="x1"><Body>hello</Body></Msg>"#;

fn alice() -> Key {
    loader::load_rsa_private_pem(ALICE_KEY).unwrap()
}

fn alice_cert() -> Key {
    loader::load_x509_cert_pem(ALICE_CERT).unwrap()
}

fn sign_document(xml: &str, key: &Key) -> Document {
    let mut doc = Document::parse(xml).unwrap();
    let root = doc.document_element().unwrap();
    sign_enveloped(&mut doc, root, key, &SignatureProfile::default()).unwrap();
    doc
}

/// Serialize and parse again, as a receiver would see the document.
fn reparse(doc: &Document) -> Document {
    Document::parse(&doc.to_xml_string().unwrap()).unwrap()
}

#[test]
fn recorded_signed_info_and_signature_value() {
    let mut doc = Document::parse(MSG).unwrap();
    let root = doc.document_element().unwrap();
    let sig = sign_enveloped(&mut doc, root, &alice(), &SignatureProfile::default()).unwrap();

    let signed_info = doc.find_child_element(sig, ns::DSIG, ns::node::SIGNED_INFO).unwrap();
    let c14n = solna_c14n::canonicalize_subtree(&doc, signed_info, C14nMode::ExclusiveWithComments, &[]).unwrap();
    assert_eq!(
        String::from_utf8(c14n).unwrap(),
        include_str!("data/msg-signed-info.c14n")
    );

    let value = doc.find_child_element(sig, ns::DSIG, ns::node::SIGNATURE_VALUE).unwrap();
    assert_eq!(doc.text_content(value), include_str!("data/msg-signature-value.b64"));

    assert_eq!(verify(&doc, doc.root(), &alice_cert()).unwrap(), Verdict::Succeeded);
}

#[test]
fn round_trip_through_serialization() {
    let doc = reparse(&sign_document(MSG, &alice()));
    assert_eq!(verify(&doc, doc.root(), &alice_cert()).unwrap(), Verdict::Succeeded);
}

#[test]
fn signing_is_deterministic() {
    let a = sign_document(MSG, &alice()).to_xml_string().unwrap();
    let b = sign_document(MSG, &alice()).to_xml_string().unwrap();
    assert_eq!(a, b);
}

#[test]
fn verification_is_repeatable() {
    let doc = sign_document(MSG, &alice());
    let before = doc.to_xml_string().unwrap();
    for _ in 0..3 {
        assert!(verify(&doc, doc.root(), &alice_cert()).unwrap().is_succeeded());
    }
    assert_eq!(doc.to_xml_string().unwrap(), before);
}

#[test]
fn unrelated_certificate_fails() {
    let doc = sign_document(MSG, &alice());
    let bob = loader::load_x509_cert_pem(BOB_CERT).unwrap();
    assert!(matches!(
        verify(&doc, doc.root(), &bob).unwrap(),
        Verdict::Failed(Failure::SignatureInvalid(_))
    ));
}

#[test]
fn signature_by_other_key_fails() {
    let bob = loader::load_rsa_private_pem(BOB_KEY).unwrap();
    let doc = sign_document(MSG, &bob);
    assert!(matches!(
        verify(&doc, doc.root(), &alice_cert()).unwrap(),
        Verdict::Failed(Failure::SignatureInvalid(_))
    ));
    let bob_cert = loader::load_x509_cert_pem(BOB_CERT).unwrap();
    assert!(verify(&doc, doc.root(), &bob_cert).unwrap().is_succeeded());
}

#[test]
fn tampered_content_is_digest_mismatch() {
    let signed = sign_document(MSG, &alice()).to_xml_string().unwrap();
    let tampered = signed.replacen("hello", "hellO", 1);
    let doc = Document::parse(&tampered).unwrap();
    assert_eq!(
        verify(&doc, doc.root(), &alice_cert()).unwrap(),
        Verdict::Failed(Failure::DigestMismatch {
            references: vec!["#x1".into()]
        })
    );
}

#[test]
fn tampered_attribute_is_digest_mismatch() {
    let signed = sign_document(r#"<Msg ID="x1" amount="10"><Body/></Msg>"#, &alice())
        .to_xml_string()
        .unwrap();
    let doc = Document::parse(&signed.replacen(r#"amount="10""#, r#"amount="99""#, 1)).unwrap();
    assert!(matches!(
        verify(&doc, doc.root(), &alice_cert()).unwrap(),
        Verdict::Failed(Failure::DigestMismatch { .. })
    ));
}

#[test]
fn tampered_signature_value_is_invalid() {
    let mut doc = sign_document(MSG, &alice());
    let value = doc
        .find_element(doc.root(), ns::DSIG, ns::node::SIGNATURE_VALUE)
        .unwrap();
    let mut text = doc.text_content(value);
    // Flip one base64 digit well inside the value.
    let flipped = if text.as_bytes()[10] == b'A' { "B" } else { "A" };
    text.replace_range(10..11, flipped);
    doc.set_text_content(value, &text).unwrap();

    assert!(matches!(
        verify(&doc, doc.root(), &alice_cert()).unwrap(),
        Verdict::Failed(Failure::SignatureInvalid(_))
    ));
}

#[test]
fn missing_signature_is_indeterminate() {
    let doc = Document::parse(MSG).unwrap();
    assert!(matches!(
        verify(&doc, doc.root(), &alice_cert()).unwrap(),
        Verdict::Indeterminate(_)
    ));
}

#[test]
fn duplicate_id_is_reference_error() {
    let mut doc = Document::parse(r#"<Msg ID="x1"><Body ID="other"/></Msg>"#).unwrap();
    let root = doc.document_element().unwrap();
    let body = doc.children(root)[0];
    doc.register_id("x1", body).unwrap();

    let err = sign_enveloped(&mut doc, root, &alice(), &SignatureProfile::default()).unwrap_err();
    assert!(matches!(err, Error::ReferenceResolution(_)));
    assert!(doc.find_element(doc.root(), ns::DSIG, ns::node::SIGNATURE).is_none());
}

#[test]
fn empty_id_leaves_document_unsigned() {
    let mut doc = Document::parse(r#"<Msg ID=""><B/></Msg>"#).unwrap();
    let before = doc.to_xml_string().unwrap();
    let root = doc.document_element().unwrap();

    let err = sign_enveloped(&mut doc, root, &alice(), &SignatureProfile::default()).unwrap_err();
    assert!(matches!(err, Error::ReferenceResolution(_)));
    assert_eq!(doc.to_xml_string().unwrap(), before);
}

#[test]
fn duplicate_id_in_received_document_is_error() {
    let signed = sign_document(MSG, &alice()).to_xml_string().unwrap();
    let doc = Document::parse(&signed.replacen("<Body>", r#"<Body ID="x1">"#, 1)).unwrap();
    assert!(matches!(
        verify(&doc, doc.root(), &alice_cert()),
        Err(Error::ReferenceResolution(_))
    ));
}

#[test]
fn whole_document_signature_without_id() {
    let xml = "<!--head--><Doc xmlns=\"urn:doc\"><Item>1</Item></Doc>";
    let doc = sign_document(xml, &alice());
    let reference = doc.find_element(doc.root(), ns::DSIG, ns::node::REFERENCE).unwrap();
    assert_eq!(doc.attribute(reference, ns::attr::URI), Some(""));

    let doc = reparse(&doc);
    assert!(verify(&doc, doc.root(), &alice_cert()).unwrap().is_succeeded());
}

#[test]
fn signature_on_nested_element() {
    let xml = r#"<Envelope><Header/><Msg ID="m1"><Body>b</Body></Msg></Envelope>"#;
    let mut doc = Document::parse(xml).unwrap();
    let envelope = doc.document_element().unwrap();
    let msg = doc.children(envelope)[1];
    sign_enveloped(&mut doc, msg, &alice(), &SignatureProfile::default()).unwrap();

    // Content outside the signed element may change freely.
    let text = doc.to_xml_string().unwrap().replacen("<Header></Header>", "<Header>x</Header>", 1);
    let doc = Document::parse(&text).unwrap();
    assert!(verify(&doc, doc.root(), &alice_cert()).unwrap().is_succeeded());
}

#[test]
fn key_info_lets_context_choose_key() {
    let signer = alice()
        .with_name("alice")
        .with_certificate_pem(ALICE_CERT)
        .unwrap();
    let doc = reparse(&sign_document(MSG, &signer));

    let mut keys = KeysManager::new();
    keys.add_key(loader::load_x509_cert_pem(BOB_CERT).unwrap().with_name("bob"));
    keys.add_key(alice_cert().with_name("alice"));
    let ctx = DsigContext::new(keys);
    assert_eq!(ctx.verify(&doc, doc.root()).unwrap(), Verdict::Succeeded);
}

#[test]
fn other_profiles_round_trip() {
    for (c14n, prefix) in [
        (C14nMode::Inclusive, "ds"),
        (C14nMode::InclusiveWithComments, ""),
        (C14nMode::Exclusive, "sig"),
    ] {
        let profile = SignatureProfile {
            c14n,
            ns_prefix: prefix.to_owned(),
            ..SignatureProfile::default()
        };
        let mut doc = Document::parse(r#"<a:Msg xmlns:a="urn:a" ID="p"><a:B>t</a:B></a:Msg>"#).unwrap();
        let root = doc.document_element().unwrap();
        sign_enveloped(&mut doc, root, &alice(), &profile).unwrap();
        let doc = reparse(&doc);
        assert!(
            verify(&doc, doc.root(), &alice_cert()).unwrap().is_succeeded(),
            "profile {c14n} / {prefix:?}"
        );
    }
}
