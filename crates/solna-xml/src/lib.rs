#![forbid(unsafe_code)]

//! XML document model for Solna.
//!
//! An owned, mutable tree ([`Document`]) with a parser adapter over
//! `quick-xml`, a serializer, the identifier registry used to resolve
//! same-document references, and the [`NodeSet`] that transforms narrow
//! before canonicalization.

pub mod document;
pub mod escape;
pub mod idmap;
pub mod nodeset;
pub mod parse;
pub mod writer;

pub use document::{Attribute, Document, Element, NodeId, NodeKind, QName};
pub use idmap::IdRegistry;
pub use nodeset::NodeSet;
pub use parse::{parse, parse_bytes};
