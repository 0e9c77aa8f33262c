#![forbid(unsafe_code)]

//! RSA PKCS#1 v1.5 signature methods and the capability seams through which
//! the signing and verification contexts reach key material.

use signature::{SignatureEncoding, Signer, Verifier};
use solna_core::{algorithm, Error};

/// A supported `SignatureMethod`. All variants are RSA PKCS#1 v1.5, which is
/// deterministic: the same key and input always give the same signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignatureMethod {
    RsaSha1,
    #[default]
    RsaSha256,
    RsaSha384,
    RsaSha512,
}

impl SignatureMethod {
    pub fn uri(&self) -> &'static str {
        match self {
            Self::RsaSha1 => algorithm::RSA_SHA1,
            Self::RsaSha256 => algorithm::RSA_SHA256,
            Self::RsaSha384 => algorithm::RSA_SHA384,
            Self::RsaSha512 => algorithm::RSA_SHA512,
        }
    }

    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        match uri {
            algorithm::RSA_SHA1 => Ok(Self::RsaSha1),
            algorithm::RSA_SHA256 => Ok(Self::RsaSha256),
            algorithm::RSA_SHA384 => Ok(Self::RsaSha384),
            algorithm::RSA_SHA512 => Ok(Self::RsaSha512),
            _ => Err(Error::UnsupportedAlgorithm(format!("signature algorithm: {uri}"))),
        }
    }

    pub fn sign_rsa(&self, key: &rsa::RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        macro_rules! do_sign {
            ($hasher:ty) => {{
                let sk = rsa::pkcs1v15::SigningKey::<$hasher>::new(key.clone());
                let sig = sk
                    .try_sign(data)
                    .map_err(|e| Error::Crypto(format!("RSA signing failed: {e}")))?;
                Ok(sig.to_vec())
            }};
        }
        match self {
            Self::RsaSha1 => do_sign!(sha1::Sha1),
            Self::RsaSha256 => do_sign!(sha2::Sha256),
            Self::RsaSha384 => do_sign!(sha2::Sha384),
            Self::RsaSha512 => do_sign!(sha2::Sha512),
        }
    }

    /// `Ok(false)` means the signature was checked and does not match.
    pub fn verify_rsa(
        &self,
        key: &rsa::RsaPublicKey,
        data: &[u8],
        sig_bytes: &[u8],
    ) -> Result<bool, Error> {
        let Ok(sig) = rsa::pkcs1v15::Signature::try_from(sig_bytes) else {
            return Ok(false);
        };
        macro_rules! do_verify {
            ($hasher:ty) => {{
                let vk = rsa::pkcs1v15::VerifyingKey::<$hasher>::new(key.clone());
                Ok(vk.verify(data, &sig).is_ok())
            }};
        }
        match self {
            Self::RsaSha1 => do_verify!(sha1::Sha1),
            Self::RsaSha256 => do_verify!(sha2::Sha256),
            Self::RsaSha384 => do_verify!(sha2::Sha384),
            Self::RsaSha512 => do_verify!(sha2::Sha512),
        }
    }
}

/// Something that can produce a signature over canonical SignedInfo bytes.
pub trait SigningCapability {
    fn sign(&self, method: SignatureMethod, data: &[u8]) -> Result<Vec<u8>, Error>;
}

/// Something that can check a signature over canonical SignedInfo bytes.
///
/// Returns `Ok(false)` for a well-formed check that failed; `Err` when the
/// check could not be carried out at all (wrong key type, no key).
pub trait VerificationCapability {
    fn verify(&self, method: SignatureMethod, data: &[u8], signature: &[u8]) -> Result<bool, Error>;
}

impl SigningCapability for rsa::RsaPrivateKey {
    fn sign(&self, method: SignatureMethod, data: &[u8]) -> Result<Vec<u8>, Error> {
        method.sign_rsa(self, data)
    }
}

impl VerificationCapability for rsa::RsaPublicKey {
    fn verify(&self, method: SignatureMethod, data: &[u8], signature: &[u8]) -> Result<bool, Error> {
        method.verify_rsa(self, data, signature)
    }
}

impl VerificationCapability for rsa::RsaPrivateKey {
    fn verify(&self, method: SignatureMethod, data: &[u8], signature: &[u8]) -> Result<bool, Error> {
        method.verify_rsa(&self.to_public_key(), data, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::DecodePrivateKey;

    const TEST_KEY: &str = include_str!("../tests/data/rsa-test-key.pem");

    fn key() -> rsa::RsaPrivateKey {
        rsa::RsaPrivateKey::from_pkcs8_pem(TEST_KEY).unwrap()
    }

    #[test]
    fn test_sign_verify() {
        let key = key();
        for method in [
            SignatureMethod::RsaSha1,
            SignatureMethod::RsaSha256,
            SignatureMethod::RsaSha384,
            SignatureMethod::RsaSha512,
        ] {
            let sig = SigningCapability::sign(&key, method, b"payload").unwrap();
            let public = key.to_public_key();
            assert!(VerificationCapability::verify(&public, method, b"payload", &sig).unwrap());
            assert!(!VerificationCapability::verify(&public, method, b"payloaD", &sig).unwrap());
        }
    }

    #[test]
    fn test_deterministic() {
        let key = key();
        let a = SigningCapability::sign(&key, SignatureMethod::RsaSha256, b"same").unwrap();
        let b = SigningCapability::sign(&key, SignatureMethod::RsaSha256, b"same").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_garbage_signature_is_mismatch() {
        let public = key().to_public_key();
        let ok = VerificationCapability::verify(&public, SignatureMethod::RsaSha256, b"x", &[1, 2, 3]);
        assert!(!ok.unwrap());
    }

    #[test]
    fn test_uri_roundtrip() {
        let m = SignatureMethod::from_uri(algorithm::RSA_SHA256).unwrap();
        assert_eq!(m, SignatureMethod::RsaSha256);
        assert!(SignatureMethod::from_uri(algorithm::SHA256).is_err());
    }
}
