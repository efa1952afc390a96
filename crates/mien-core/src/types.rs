use serde::{Deserialize, Serialize};

/// Embedding dimensionality produced by the face-embedding library.
pub const EMBEDDING_DIM: usize = 128;

/// Face embedding vector (128-dimensional).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Compute Euclidean distance between two embeddings.
    ///
    /// Lower = more similar; 0 for identical vectors.
    pub fn distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

/// A registered face: unique name plus its reference embedding.
///
/// `name` is the stable identity key: exactly one record per name, never
/// reused across distinct individuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRecord {
    pub name: String,
    pub embedding: Embedding,
}

/// Immutable point-in-time view of all registered faces.
///
/// Entries keep store insertion order; the matcher's tie-break depends on
/// it. Replaced wholesale on each cache refresh, never mutated in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub entries: Vec<FaceRecord>,
    /// Bumped when the entry count changes between refreshes. A coarse
    /// change signal for diagnostics; two different same-size sets share a
    /// version.
    pub version: u64,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Result of probing a snapshot with a live embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// The probe matched a registered face.
    Identified { name: String },
    /// No registered face within tolerance.
    Unknown,
}

impl MatchOutcome {
    pub fn name(&self) -> Option<&str> {
        match self {
            MatchOutcome::Identified { name } => Some(name),
            MatchOutcome::Unknown => None,
        }
    }
}
