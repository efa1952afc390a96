//! Record normalization: raw stored payload → face record.
//!
//! The cheap path is a canonical binary decode. Anything else is treated as
//! a legacy image payload and pushed through decode → locate → embed, which
//! both recovers the embedding for this cycle and marks the record for
//! rewriting in canonical form.

use mien_core::codec::{self, DecodeError};
use mien_core::engine::FaceEmbedder;
use mien_core::types::Embedding;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::RawStoredValue;

/// Canonical wire-format version. Doubles as a format sniff: no image
/// container starts with this byte, so a legacy payload can never decode as
/// canonical by accident.
pub const CANONICAL_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct CanonicalEmbedding {
    version: u8,
    values: Vec<f32>,
}

/// Encode an embedding in the canonical binary form.
pub fn encode_canonical(embedding: &Embedding) -> Result<Vec<u8>, postcard::Error> {
    postcard::to_allocvec(&CanonicalEmbedding {
        version: CANONICAL_VERSION,
        values: embedding.values.clone(),
    })
}

/// Decode a canonical payload; `None` if the bytes are anything else.
pub fn decode_canonical(bytes: &[u8]) -> Option<Embedding> {
    postcard::from_bytes::<CanonicalEmbedding>(bytes)
        .ok()
        .filter(|c| c.version == CANONICAL_VERSION)
        .map(|c| Embedding::new(c.values))
}

/// A successfully normalized record.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// Payload was already canonical.
    Canonical(Embedding),
    /// Legacy payload; the embedding was recomputed and the record should
    /// be rewritten in canonical form.
    Reencoded(Embedding),
}

/// Why a record was skipped this cycle. Never fatal to a refresh: the
/// record stays in the store and is retried next cycle.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("no face found in legacy image")]
    NoFace,
    #[error("expected exactly one face, found {0}")]
    AmbiguousFaces(usize),
    #[error("embedding extraction produced no candidates")]
    NoEmbedding,
}

/// Normalize one raw payload into an embedding.
///
/// Canonical decode is attempted first (no inference); only on failure is
/// the payload decoded as an image and run through the embedder. Exactly one
/// face and one embedding candidate are required: a registration photo with
/// several people in frame is ambiguous, not a best-effort pick.
pub fn normalize<E: FaceEmbedder>(
    value: &RawStoredValue,
    embedder: &E,
) -> Result<Normalized, NormalizeError> {
    let image = match value {
        RawStoredValue::Binary(bytes) => {
            if let Some(embedding) = decode_canonical(bytes) {
                return Ok(Normalized::Canonical(embedding));
            }
            codec::decode_image_bytes(bytes)?
        }
        RawStoredValue::Text(text) => codec::decode_base64_image(text)?,
    };

    let boxes = embedder.locate_faces(&image);
    match boxes.len() {
        0 => return Err(NormalizeError::NoFace),
        1 => {}
        n => return Err(NormalizeError::AmbiguousFaces(n)),
    }

    let mut embeddings = embedder.embed_faces(&image, &boxes);
    match embeddings.len() {
        0 => Err(NormalizeError::NoEmbedding),
        1 => Ok(Normalized::Reencoded(embeddings.remove(0))),
        n => Err(NormalizeError::AmbiguousFaces(n)),
    }
}
