//! mien-core — Identity matching and blink liveness over face embeddings.
//!
//! Pure algorithms and boundary types: the first-match identity matcher,
//! the eye-aspect-ratio blink detector, and legacy image payload decoding.
//! Embedding extraction itself lives behind the traits in [`engine`].

pub mod codec;
pub mod engine;
pub mod liveness;
pub mod matcher;
pub mod session;
pub mod types;

pub use engine::{EyeLandmarks, FaceBox, FaceEmbedder, LandmarkExtractor};
pub use liveness::{BlinkDetector, LivenessVerdict};
pub use matcher::{FirstMatchMatcher, Matcher, DEFAULT_TOLERANCE};
pub use session::{RecognitionSession, SessionStatus};
pub use types::{Embedding, FaceRecord, MatchOutcome, Snapshot, EMBEDDING_DIM};
