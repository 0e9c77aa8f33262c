#![forbid(unsafe_code)]

//! XML Digital Signature (XML-DSig): enveloped signature templates, signing
//! and verification over a [`solna_xml::Document`].

pub mod context;
pub mod sign;
mod signed_info;
pub mod template;
pub mod verify;

pub use context::{DsigContext, SignatureProfile};
pub use sign::{sign, sign_enveloped};
pub use verify::{verify, verify_signature, Failure, Verdict};
