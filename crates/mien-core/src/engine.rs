//! Boundary traits for the face-embedding library.
//!
//! Extraction itself (detection models, landmark models, the embedding
//! network) is an external collaborator; this crate only fixes the currency
//! types and call shapes it must provide.

use crate::types::Embedding;
use image::RgbImage;

/// Bounding box of a detected face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// Six-point eye contours for one face, left and right.
///
/// Points are ordered around the contour (outer corner, two upper-lid
/// points, inner corner, two lower-lid points), the order
/// [`eye_aspect_ratio`](crate::liveness::eye_aspect_ratio) expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeLandmarks {
    pub left: [(f32, f32); 6],
    pub right: [(f32, f32); 6],
}

/// Face location and embedding extraction.
///
/// Empty result vectors are valid: no face in the image is a normal
/// negative outcome, not an error.
pub trait FaceEmbedder: Send + Sync {
    /// Locate face regions in an RGB image.
    fn locate_faces(&self, image: &RgbImage) -> Vec<FaceBox>;

    /// Compute one embedding per located face region.
    fn embed_faces(&self, image: &RgbImage, boxes: &[FaceBox]) -> Vec<Embedding>;
}

/// Eye landmark extraction for liveness.
pub trait LandmarkExtractor: Send + Sync {
    /// Extract eye contours for each located face region.
    fn eye_landmarks(&self, image: &RgbImage, boxes: &[FaceBox]) -> Vec<EyeLandmarks>;
}
