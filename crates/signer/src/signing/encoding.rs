use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};

use crate::error::{Result, SignerError};

/// URL-safe base64 with the trailing `=` padding stripped.
pub fn encode_signature(raw: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(raw)
}

/// Inverse of [`encode_signature`].
///
/// Padding is restored to the next multiple of 4 before decoding, so both
/// padded and unpadded input are accepted.
pub fn decode_signature(encoded: &str) -> Result<Vec<u8>> {
    let mut padded = String::with_capacity(encoded.len() + 3);
    padded.push_str(encoded);
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    URL_SAFE
        .decode(padded.as_bytes())
        .map_err(|_| SignerError::InvalidSignature)
}
