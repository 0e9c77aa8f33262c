#![forbid(unsafe_code)]

//! Cryptographic algorithms for Solna: the closed set of digest and
//! signature methods, the capability traits key material implements, and
//! strict base64 for the values carried in signatures.

pub mod b64;
pub mod digest;
pub mod sign;

pub use digest::DigestMethod;
pub use sign::{SignatureMethod, SigningCapability, VerificationCapability};
