//! Active liveness detection via double eye-blink.
//!
//! A static photograph held in front of the camera produces a flat
//! eye-aspect-ratio signal; a live subject blinks. The detector smooths the
//! per-frame EAR over a short window, counts a blink each time a long-enough
//! closed-eye run is followed by a reopened frame, and confirms liveness on
//! the second blink inside a rolling timing window.
//!
//! # Threat Coverage
//!
//! - **Blocks:** Printed photographs and other static images.
//! - **Does not block:** Video replay attacks or 3D masks — those blink too.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Smoothed EAR below this value counts as a closed-eye frame.
pub const EAR_THRESHOLD: f32 = 0.25;

/// Closed-eye frames required before a reopen qualifies as a blink.
pub const BLINK_CONSEC_FRAMES: u32 = 3;

/// Two blinks must land within this window to confirm liveness.
pub const BLINK_TIMEOUT: Duration = Duration::from_millis(1500);

/// Number of raw EAR samples averaged into the smoothed signal.
pub const EAR_WINDOW: usize = 3;

/// Blinks required for confirmation.
pub const BLINKS_REQUIRED: u32 = 2;

/// Per-frame verdict from the blink detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessVerdict {
    /// Eyes open, no blink activity on this frame.
    Open,
    /// Smoothed EAR is below threshold; a blink may be in progress.
    BlinkInProgress,
    /// Eyes reopened after a qualifying closed run.
    BlinkConfirmed { total_blinks: u32 },
    /// Second qualifying blink inside the window — subject is live.
    ///
    /// Terminal: the detector stays in this state until [`BlinkDetector::reset`].
    LiveConfirmed,
}

/// Blink-counting state machine for one recognition session.
///
/// Feed it one EAR sample per frame via [`update`](Self::update); frames with
/// no detected face or landmarks are simply not fed (that is normal, not an
/// error). The detector never blocks and never fails; elapsed time only
/// resets counters.
#[derive(Debug)]
pub struct BlinkDetector {
    ear_window: VecDeque<f32>,
    consecutive_low_frames: u32,
    total_blinks: u32,
    last_blink: Option<Instant>,
    confirmed: bool,
}

impl Default for BlinkDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl BlinkDetector {
    pub fn new() -> Self {
        Self {
            ear_window: VecDeque::with_capacity(EAR_WINDOW),
            consecutive_low_frames: 0,
            total_blinks: 0,
            last_blink: None,
            confirmed: false,
        }
    }

    /// Blinks counted inside the current double-blink window.
    pub fn total_blinks(&self) -> u32 {
        self.total_blinks
    }

    pub fn is_live(&self) -> bool {
        self.confirmed
    }

    /// Return the detector to its initial state for a new session.
    pub fn reset(&mut self) {
        self.ear_window.clear();
        self.consecutive_low_frames = 0;
        self.total_blinks = 0;
        self.last_blink = None;
        self.confirmed = false;
    }

    /// Process one frame's eye-aspect-ratio sample.
    pub fn update(&mut self, ear: f32, now: Instant) -> LivenessVerdict {
        if self.confirmed {
            return LivenessVerdict::LiveConfirmed;
        }

        if self.ear_window.len() == EAR_WINDOW {
            self.ear_window.pop_front();
        }
        self.ear_window.push_back(ear);
        let smoothed =
            self.ear_window.iter().sum::<f32>() / self.ear_window.len() as f32;

        if smoothed < EAR_THRESHOLD {
            self.consecutive_low_frames += 1;
            return LivenessVerdict::BlinkInProgress;
        }

        // Eye reopened. A blink only counts if the closed run was long
        // enough to rule out single-frame noise.
        if self.consecutive_low_frames < BLINK_CONSEC_FRAMES {
            self.consecutive_low_frames = 0;
            return LivenessVerdict::Open;
        }
        self.consecutive_low_frames = 0;

        let within_window = self
            .last_blink
            .is_some_and(|prev| now.duration_since(prev) < BLINK_TIMEOUT);
        self.last_blink = Some(now);

        if within_window {
            self.total_blinks += 1;
            if self.total_blinks >= BLINKS_REQUIRED {
                self.confirmed = true;
                tracing::debug!("double blink inside window; liveness confirmed");
                return LivenessVerdict::LiveConfirmed;
            }
        } else {
            // Window elapsed (or first blink of the session): start a new
            // double-blink window at 1.
            self.total_blinks = 1;
        }

        tracing::trace!(total_blinks = self.total_blinks, "blink confirmed");
        LivenessVerdict::BlinkConfirmed {
            total_blinks: self.total_blinks,
        }
    }
}

/// Eye aspect ratio from 6 ordered contour points `p0..p5`:
/// `(‖p1−p5‖ + ‖p2−p4‖) / (2·‖p0−p3‖)`.
///
/// High (~0.3) when the eye is open, near 0 when closed. Returns 0 if the
/// horizontal span degenerates.
pub fn eye_aspect_ratio(eye: &[(f32, f32); 6]) -> f32 {
    let vertical = point_distance(eye[1], eye[5]) + point_distance(eye[2], eye[4]);
    let horizontal = point_distance(eye[0], eye[3]);
    if horizontal <= f32::EPSILON {
        return 0.0;
    }
    vertical / (2.0 * horizontal)
}

/// Per-frame EAR signal: mean of left- and right-eye ratios.
pub fn mean_ear(left: &[(f32, f32); 6], right: &[(f32, f32); 6]) -> f32 {
    (eye_aspect_ratio(left) + eye_aspect_ratio(right)) / 2.0
}

fn point_distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}
