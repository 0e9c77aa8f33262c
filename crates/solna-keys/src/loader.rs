#![forbid(unsafe_code)]

//! Key loading from PEM and DER (PKCS#8, PKCS#1, SubjectPublicKeyInfo and
//! X.509 certificates).

use crate::key::{Key, KeyData, KeyUsage};
use solna_core::Error;

const PEM_BEGIN: &[u8] = b"-----BEGIN";
const CERT_END: &str = "-----END CERTIFICATE-----";

fn pem_str(pem_data: &[u8]) -> Result<&str, Error> {
    let s = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))?;
    if s.trim().is_empty() {
        return Err(Error::Key("empty key data".into()));
    }
    Ok(s)
}

fn rsa_private(pk: rsa::RsaPrivateKey) -> Key {
    let public = pk.to_public_key();
    Key::new(
        KeyData::Rsa {
            private: Some(pk),
            public,
        },
        KeyUsage::Any,
    )
}

fn rsa_public(pk: rsa::RsaPublicKey) -> Key {
    Key::new(
        KeyData::Rsa {
            private: None,
            public: pk,
        },
        KeyUsage::Verify,
    )
}

/// Load an RSA private key from PEM data (PKCS#8, then PKCS#1).
pub fn load_rsa_private_pem(pem_data: &[u8]) -> Result<Key, Error> {
    use pkcs1::DecodeRsaPrivateKey;
    use pkcs8::DecodePrivateKey;
    let pem = pem_str(pem_data)?;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_pem(pem) {
        return Ok(rsa_private(pk));
    }
    let pk = rsa::RsaPrivateKey::from_pkcs1_pem(pem)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key PEM: {e}")))?;
    Ok(rsa_private(pk))
}

/// Load an RSA public key from PEM data (SubjectPublicKeyInfo, then PKCS#1).
pub fn load_rsa_public_pem(pem_data: &[u8]) -> Result<Key, Error> {
    use pkcs1::DecodeRsaPublicKey;
    use spki::DecodePublicKey;
    let pem = pem_str(pem_data)?;

    if let Ok(pk) = rsa::RsaPublicKey::from_public_key_pem(pem) {
        return Ok(rsa_public(pk));
    }
    let pk = rsa::RsaPublicKey::from_pkcs1_pem(pem)
        .map_err(|e| Error::Key(format!("failed to parse RSA public key PEM: {e}")))?;
    Ok(rsa_public(pk))
}

/// Load a verify-only key from a PEM certificate. When `pem_data` holds a
/// bundle, the first certificate supplies the key and all of them are kept
/// in `x509_chain`.
pub fn load_x509_cert_pem(pem_data: &[u8]) -> Result<Key, Error> {
    let pem = pem_str(pem_data)?;
    let mut chain = Vec::new();
    for block in pem.split_inclusive(CERT_END) {
        if !block.contains(CERT_END) {
            continue;
        }
        let (label, der) = pem_rfc7468::decode_vec(block.trim_start().as_bytes())
            .map_err(|e| Error::Certificate(format!("failed to decode certificate PEM: {e}")))?;
        if label != "CERTIFICATE" {
            return Err(Error::Certificate(format!(
                "expected CERTIFICATE PEM label, got {label}"
            )));
        }
        chain.push(der);
    }
    let Some(leaf) = chain.first() else {
        return Err(Error::Certificate("no certificate found in PEM data".into()));
    };
    let mut key = load_x509_cert_der(leaf)?;
    key.x509_chain = chain;
    Ok(key)
}

/// Load a verify-only key from a DER certificate.
pub fn load_x509_cert_der(data: &[u8]) -> Result<Key, Error> {
    use der::{Decode, Encode};
    use spki::DecodePublicKey;
    use x509_cert::Certificate;

    let cert = Certificate::from_der(data)
        .map_err(|e| Error::Certificate(format!("failed to parse X.509 certificate: {e}")))?;
    let spki_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| Error::Certificate(format!("failed to encode SPKI: {e}")))?;
    let pk = rsa::RsaPublicKey::from_public_key_der(&spki_der)
        .map_err(|e| Error::Certificate(format!("certificate does not carry an RSA key: {e}")))?;

    let mut key = rsa_public(pk);
    key.x509_chain = vec![data.to_vec()];
    Ok(key)
}

/// Detect the PEM flavour and load accordingly.
pub fn load_pem_auto(pem_data: &[u8]) -> Result<Key, Error> {
    let pem = pem_str(pem_data)?;
    if pem.contains("-----BEGIN CERTIFICATE-----") {
        return load_x509_cert_pem(pem_data);
    }
    if pem.contains("PRIVATE KEY-----") {
        return load_rsa_private_pem(pem_data);
    }
    if pem.contains("PUBLIC KEY-----") {
        return load_rsa_public_pem(pem_data);
    }
    Err(Error::Key("unable to auto-detect key format from PEM data".into()))
}

/// Load a key from a file: PEM of any supported kind, or DER (PKCS#8,
/// PKCS#1 or a certificate).
pub fn load_key_file(path: &std::path::Path) -> Result<Key, Error> {
    let data = std::fs::read(path)?;
    if data.is_empty() {
        return Err(Error::Key(format!("{} is empty", path.display())));
    }
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(0);
    if data[start..].starts_with(PEM_BEGIN) {
        return load_pem_auto(&data);
    }

    use pkcs1::DecodeRsaPrivateKey;
    use pkcs8::DecodePrivateKey;
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(&data) {
        return Ok(rsa_private(pk));
    }
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs1_der(&data) {
        return Ok(rsa_private(pk));
    }
    load_x509_cert_der(&data)
        .map_err(|_| Error::Key(format!("unrecognized key format in {}", path.display())))
}
