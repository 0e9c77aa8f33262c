#![forbid(unsafe_code)]

//! Reference processing for Solna XML signatures.
//!
//! A `<Reference>` names its data with a same-document URI and runs it
//! through an ordered chain of transforms; the octets that come out are
//! what gets digested.

pub mod enveloped;
pub mod pipeline;
pub mod uri;

pub use pipeline::{apply_chain, Transform, TransformData};
pub use uri::resolve_uri;
