#![forbid(unsafe_code)]

//! Key material for Solna.
//!
//! Loads RSA keys and X.509 certificates from PEM or DER, wraps them in a
//! [`Key`] that implements the signing and verification capabilities, and
//! provides a [`KeysManager`] for named lookup.

pub mod key;
pub mod loader;
pub mod manager;

pub use key::{Key, KeyData, KeyUsage};
pub use manager::KeysManager;
