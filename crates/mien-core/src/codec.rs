//! Decoding of legacy image payloads.
//!
//! Registered records written by the old web client arrive as base64 strings,
//! sometimes with a `data:<mime>;base64,` prefix and sometimes with the `=`
//! padding stripped; the old native client wrote raw encoded image bytes.
//! Both forms decode to an RGB pixel buffer here.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid image payload: {0}")]
    Image(#[from] image::ImageError),
    #[error("empty payload")]
    Empty,
}

/// Decode a base64-encoded image string into RGB pixels.
///
/// Strips an optional data-URI header (everything through the first `,`)
/// and restores missing `=` padding before decoding.
pub fn decode_base64_image(payload: &str) -> Result<RgbImage, DecodeError> {
    let body = match payload.split_once(',') {
        Some((_, rest)) => rest,
        None => payload,
    };
    let body = body.trim();
    if body.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut padded = body.to_owned();
    let missing = (4 - padded.len() % 4) % 4;
    padded.extend(std::iter::repeat('=').take(missing));

    let bytes = STANDARD.decode(padded)?;
    decode_image_bytes(&bytes)
}

/// Decode raw encoded image bytes (PNG, JPEG, ...) into RGB pixels.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}
