#![forbid(unsafe_code)]

//! Base64 as carried in `DigestValue`, `SignatureValue` and certificates.
//!
//! Values may be line-wrapped in the document; XML whitespace is stripped
//! before decoding, and what remains must be canonical RFC 4648 base64.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use solna_core::Error;

const STRICT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

pub fn encode(data: &[u8]) -> String {
    STRICT.encode(data)
}

pub fn decode(text: &str) -> Result<Vec<u8>, Error> {
    let compact: String = text
        .chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '\n' | '\r'))
        .collect();
    STRICT
        .decode(compact.as_bytes())
        .map_err(|e| Error::Base64(e.to_string()))
}
