#![forbid(unsafe_code)]

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

pub use base64::DecodeError;

/// base64url, unpadded on encode, padding-tolerant on decode.
const B64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub fn encode_b64url(bytes: impl AsRef<[u8]>) -> String {
    B64URL.encode(bytes)
}

pub fn decode_b64url(text: &str) -> Result<Vec<u8>, DecodeError> {
    B64URL.decode(text.trim().as_bytes())
}
