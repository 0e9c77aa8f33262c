#![forbid(unsafe_code)]

//! Core types shared by every Solna crate: the error taxonomy, algorithm
//! URIs and XML-DSig namespace / node-name constants.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
