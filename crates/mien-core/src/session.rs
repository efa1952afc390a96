//! Per-session gating of identification behind the liveness check.

use std::time::Instant;

use image::RgbImage;

use crate::engine::{FaceEmbedder, LandmarkExtractor};
use crate::liveness::{mean_ear, BlinkDetector, LivenessVerdict};
use crate::matcher::{FirstMatchMatcher, Matcher};
use crate::types::{Embedding, MatchOutcome, Snapshot};

/// Where a recognition session currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    /// No registered face has matched yet.
    AwaitingFace,
    /// A face matched; waiting for the double blink.
    AwaitingLiveness { name: String },
    /// Matched and blink-confirmed.
    Verified { name: String },
}

/// One recognition loop: accumulates a match outcome and a liveness verdict
/// over successive frames, reporting `Verified` only when both hold.
///
/// Frames where extraction found no face (or no landmarks) are simply not
/// observed; the session state is untouched.
#[derive(Debug)]
pub struct RecognitionSession {
    tolerance: f32,
    detector: BlinkDetector,
    identity: Option<String>,
}

impl RecognitionSession {
    pub fn new(tolerance: f32) -> Self {
        Self {
            tolerance,
            detector: BlinkDetector::new(),
            identity: None,
        }
    }

    /// Probe this frame's embedding against the snapshot.
    ///
    /// The first successful identification sticks for the session; later
    /// frames cannot displace it.
    pub fn observe_match(&mut self, probe: &Embedding, snapshot: &Snapshot) -> MatchOutcome {
        let outcome = FirstMatchMatcher.identify(probe, snapshot, self.tolerance);
        if self.identity.is_none() {
            if let MatchOutcome::Identified { name } = &outcome {
                tracing::info!(name = %name, "session identified subject");
                self.identity = Some(name.clone());
            }
        }
        outcome
    }

    /// Feed this frame's eye contours to the blink detector.
    pub fn observe_eyes(
        &mut self,
        left: &[(f32, f32); 6],
        right: &[(f32, f32); 6],
        now: Instant,
    ) -> LivenessVerdict {
        self.detector.update(mean_ear(left, right), now)
    }

    /// Process one camera frame end to end: locate, embed, match, and feed
    /// the blink detector.
    ///
    /// A frame with no face (or no landmarks) changes nothing. When several
    /// faces are in frame, the first located one is used.
    pub fn observe_frame<E, L>(
        &mut self,
        image: &RgbImage,
        embedder: &E,
        landmarks: &L,
        snapshot: &Snapshot,
        now: Instant,
    ) -> SessionStatus
    where
        E: FaceEmbedder,
        L: LandmarkExtractor,
    {
        let boxes = embedder.locate_faces(image);
        if boxes.is_empty() {
            return self.status();
        }

        if let Some(probe) = embedder.embed_faces(image, &boxes).first() {
            self.observe_match(probe, snapshot);
        }
        if let Some(eyes) = landmarks.eye_landmarks(image, &boxes).first() {
            self.observe_eyes(&eyes.left, &eyes.right, now);
        }
        self.status()
    }

    pub fn status(&self) -> SessionStatus {
        match (&self.identity, self.detector.is_live()) {
            (Some(name), true) => SessionStatus::Verified { name: name.clone() },
            (Some(name), false) => SessionStatus::AwaitingLiveness { name: name.clone() },
            (None, _) => SessionStatus::AwaitingFace,
        }
    }

    /// Discard all session state (identity and blink progress).
    pub fn reset(&mut self) {
        self.identity = None;
        self.detector.reset();
    }
}
