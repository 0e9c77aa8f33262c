#![forbid(unsafe_code)]

//! Solna: XML canonicalization and enveloped XML digital signatures.
//!
//! ```no_run
//! use solna::{keys::loader, xml::Document, SignatureProfile};
//!
//! # fn main() -> Result<(), solna::Error> {
//! let key = loader::load_key_file("key.pem".as_ref())?;
//! let mut doc = Document::parse(r#"<Msg ID="x1"><Body>hello</Body></Msg>"#)?;
//! let root = doc.document_element().ok_or_else(|| solna::Error::MissingElement("Msg".into()))?;
//! solna::sign_enveloped(&mut doc, root, &key, &SignatureProfile::default())?;
//!
//! let cert = loader::load_key_file("cert.pem".as_ref())?;
//! assert!(solna::verify(&doc, doc.root(), &cert)?.is_succeeded());
//! # Ok(())
//! # }
//! ```

pub mod runtime;

pub use solna_c14n as c14n;
pub use solna_core as core;
pub use solna_crypto as crypto;
pub use solna_dsig as dsig;
pub use solna_keys as keys;
pub use solna_transforms as transforms;
pub use solna_xml as xml;

pub use solna_c14n::{canonicalize, canonicalize_to, C14nMode};
pub use solna_core::{Error, Result};
pub use solna_dsig::{sign, sign_enveloped, verify, DsigContext, Failure, SignatureProfile, Verdict};
pub use runtime::Runtime;
