use index::{IndexError, JaccardRecord};
use perceptual::Lambda;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entity's worth of comparisons at a fixed `(W, λ)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompareRequest {
    pub entity: String,
    /// Revision every other revision is compared against.
    pub baseline_revision: u32,
    /// Comparison revisions. The baseline itself is ignored if listed.
    pub revisions: Vec<u32>,
    pub w: usize,
    pub lambda: Lambda,
}

impl CompareRequest {
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.entity.trim().is_empty() {
            return Err(MatchError::InvalidConfig("entity must not be empty".into()));
        }
        if self.w == 0 {
            return Err(MatchError::InvalidConfig("w must be at least 1".into()));
        }
        Ok(())
    }
}

/// Result of comparing one revision against the baseline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PairOutcome {
    /// Similarity was computed and written to the result store.
    Recorded(JaccardRecord),
    /// The revision's sketch was never stored; nothing was written.
    MissingSketch { revision: u32, key: String },
    /// The revision's sketch is stored but cannot be decoded; regenerate it.
    UnreadableSketch {
        revision: u32,
        key: String,
        detail: String,
    },
}

impl PairOutcome {
    pub fn revision(&self) -> u32 {
        match self {
            PairOutcome::Recorded(record) => record.revision,
            PairOutcome::MissingSketch { revision, .. }
            | PairOutcome::UnreadableSketch { revision, .. } => *revision,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    /// Baseline sketch loaded; one outcome per comparison revision.
    Compared { pairs: Vec<PairOutcome> },
    /// No baseline sketch, so the whole entity was skipped.
    MissingBaseline { key: String },
    /// The baseline sketch cannot be decoded, so the whole entity was skipped.
    UnreadableBaseline { key: String, detail: String },
}

/// Everything [`crate::JaccardComputer::compare_entity`] did for one entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityComparison {
    pub entity: String,
    pub baseline_revision: u32,
    pub w: usize,
    pub lambda: Lambda,
    pub outcome: ComparisonOutcome,
}

impl EntityComparison {
    /// Records written for this entity, in revision order.
    pub fn records(&self) -> impl Iterator<Item = &JaccardRecord> {
        self.pairs().iter().filter_map(|pair| match pair {
            PairOutcome::Recorded(record) => Some(record),
            PairOutcome::MissingSketch { .. } | PairOutcome::UnreadableSketch { .. } => None,
        })
    }

    pub fn pairs(&self) -> &[PairOutcome] {
        match &self.outcome {
            ComparisonOutcome::Compared { pairs } => pairs,
            ComparisonOutcome::MissingBaseline { .. }
            | ComparisonOutcome::UnreadableBaseline { .. } => &[],
        }
    }

    pub fn missing_baseline(&self) -> bool {
        matches!(self.outcome, ComparisonOutcome::MissingBaseline { .. })
    }
}

/// Errors produced by the comparison layer.
///
/// A missing or undecodable sketch is an outcome, not an error; anything
/// that reaches this type is a fault the caller should stop on.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid comparison request: {0}")]
    InvalidConfig(String),
    #[error("index error: {0}")]
    Index(#[from] IndexError),
}
