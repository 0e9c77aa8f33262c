#![forbid(unsafe_code)]

//! Key types and data structures.

use solna_core::Error;
use solna_crypto::{SignatureMethod, SigningCapability, VerificationCapability};

/// Usage flags for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    Verify,
    Any,
}

/// The underlying key data.
#[derive(Clone)]
pub enum KeyData {
    Rsa {
        private: Option<rsa::RsaPrivateKey>,
        public: rsa::RsaPublicKey,
    },
}

impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa { private: Some(_), .. } => write!(f, "RSA private+public key"),
            Self::Rsa { private: None, .. } => write!(f, "RSA public key"),
        }
    }
}

/// A named key with associated data.
///
/// Key material is read-only once loaded, so a `Key` can be shared across
/// concurrent signing or verification calls.
#[derive(Debug, Clone)]
pub struct Key {
    /// Optional name for key lookup and `KeyInfo/KeyName`.
    pub name: Option<String>,
    pub data: KeyData,
    pub usage: KeyUsage,
    /// X.509 certificate chain (DER), leaf first.
    pub x509_chain: Vec<Vec<u8>>,
}

impl Key {
    pub fn new(data: KeyData, usage: KeyUsage) -> Self {
        Self {
            name: None,
            data,
            usage,
            x509_chain: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach the certificate(s) in `pem` so the signer can publish them in
    /// `KeyInfo/X509Data`.
    pub fn with_certificate_pem(mut self, pem: &[u8]) -> Result<Self, Error> {
        let cert = crate::loader::load_x509_cert_pem(pem)?;
        self.x509_chain.extend(cert.x509_chain);
        Ok(self)
    }

    pub fn is_private(&self) -> bool {
        self.rsa_private_key().is_some()
    }

    pub fn rsa_public_key(&self) -> Option<&rsa::RsaPublicKey> {
        match &self.data {
            KeyData::Rsa { public, .. } => Some(public),
        }
    }

    pub fn rsa_private_key(&self) -> Option<&rsa::RsaPrivateKey> {
        match &self.data {
            KeyData::Rsa { private, .. } => private.as_ref(),
        }
    }
}

impl SigningCapability for Key {
    fn sign(&self, method: SignatureMethod, data: &[u8]) -> Result<Vec<u8>, Error> {
        if self.usage == KeyUsage::Verify {
            return Err(Error::MissingKey(format!(
                "key {} is verify-only",
                self.name.as_deref().unwrap_or("(unnamed)")
            )));
        }
        let private = self
            .rsa_private_key()
            .ok_or_else(|| Error::MissingKey("RSA private key required for signing".into()))?;
        method.sign_rsa(private, data)
    }
}

impl VerificationCapability for Key {
    fn verify(&self, method: SignatureMethod, data: &[u8], signature: &[u8]) -> Result<bool, Error> {
        let public = self
            .rsa_public_key()
            .ok_or_else(|| Error::MissingKey("RSA public key required for verification".into()))?;
        method.verify_rsa(public, data, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader;

    #[test]
    fn test_certificate_key_cannot_sign() {
        let cert = loader::load_x509_cert_pem(include_bytes!("../tests/data/cert.pem")).unwrap();
        let err = SigningCapability::sign(&cert, SignatureMethod::RsaSha256, b"x").unwrap_err();
        assert!(matches!(err, Error::MissingKey(_)));
    }

    #[test]
    fn test_sign_with_key_verify_with_certificate() {
        let private = loader::load_rsa_private_pem(include_bytes!("../tests/data/key.pem"))
            .unwrap()
            .with_certificate_pem(include_bytes!("../tests/data/cert.pem"))
            .unwrap();
        assert_eq!(private.x509_chain.len(), 1);

        let sig = SigningCapability::sign(&private, SignatureMethod::RsaSha256, b"data").unwrap();
        let cert = loader::load_x509_cert_pem(include_bytes!("../tests/data/cert.pem")).unwrap();
        assert!(VerificationCapability::verify(&cert, SignatureMethod::RsaSha256, b"data", &sig).unwrap());
        assert!(!VerificationCapability::verify(&cert, SignatureMethod::RsaSha256, b"date", &sig).unwrap());
    }
}
