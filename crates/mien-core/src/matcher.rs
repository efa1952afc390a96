//! Identity matching: probe embedding vs. the known-face snapshot.

use crate::types::{Embedding, MatchOutcome, Snapshot};

/// Maximum Euclidean distance for two embeddings to count as the same person.
pub const DEFAULT_TOLERANCE: f32 = 0.6;

/// Strategy for resolving a probe embedding against a snapshot.
pub trait Matcher {
    fn identify(&self, probe: &Embedding, snapshot: &Snapshot, tolerance: f32) -> MatchOutcome;
}

/// First-match identity matcher.
///
/// Walks the snapshot in insertion order and returns the FIRST record whose
/// Euclidean distance to the probe is within `tolerance` — not the closest.
/// This is a compatibility contract: identification results against existing
/// galleries depend on registration order, and switching to nearest-match
/// would change them. Do not "fix" this to a best-score scan.
pub struct FirstMatchMatcher;

impl Matcher for FirstMatchMatcher {
    fn identify(&self, probe: &Embedding, snapshot: &Snapshot, tolerance: f32) -> MatchOutcome {
        for record in &snapshot.entries {
            let distance = probe.distance(&record.embedding);
            if distance <= tolerance {
                tracing::debug!(name = %record.name, distance, "probe matched");
                return MatchOutcome::Identified {
                    name: record.name.clone(),
                };
            }
        }
        MatchOutcome::Unknown
    }
}
