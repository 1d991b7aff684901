//! Workspace umbrella crate for revsim.
//!
//! revsim measures how far each revision of a document has drifted from a
//! baseline revision. Documents are tokenized, cut into W-token shingles,
//! hashed, reduced to a bottom-λ sketch and persisted; each revision's
//! sketch is then compared against the baseline's with the exact Jaccard
//! similarity of the two sketches.
//!
//! This crate stitches the member crates together: [`corpus`] reads a dump
//! directory, [`batch`] drives generation and comparison over it,
//! [`evaluate`] scores finite λ against `λ = inf` and [`config`] loads the
//! YAML that parameterizes all of it. [`process_document`] runs the
//! per-document half of the pipeline without any storage.

pub mod batch;
pub mod config;
pub mod corpus;
pub mod evaluate;

pub use canonical::{CanonicalError, CanonicalizeConfig, Token, canonicalize, tokenize};
pub use index::{
    BackendConfig, FsBackend, InMemoryBackend, IndexBackend, IndexError, JaccardRecord,
    ResultStore, ShingleStore, SketchKey,
};
pub use matcher::{JaccardComputer, MatchError};
pub use perceptual::{Lambda, PerceptualConfig, PerceptualError, Similarity, Sketch, jaccard};

pub use crate::batch::{
    BatchError, BatchRunner, BatchSettings, ComparisonPolicy, RunReport, Skip, SkipReason,
};
pub use crate::config::{ConfigLoadError, RevsimConfig};
pub use crate::corpus::{Corpus, CorpusError, CorpusLayout, Document};
pub use crate::evaluate::{Evaluation, LambdaError, evaluate};

use thiserror::Error;

/// Errors from running a single document through tokenization and sketching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("tokenization failure: {0}")]
    Canonical(#[from] CanonicalError),
    #[error("sketching failure: {0}")]
    Perceptual(#[from] PerceptualError),
}

/// Tokenize `text` and sketch it at `perceptual_cfg.w` for every λ in
/// `lambdas`.
///
/// The full shingle set is built once; finite sketches are truncations of
/// it. A document shorter than W yields empty sketches.
pub fn process_document(
    text: &str,
    canonical_cfg: &CanonicalizeConfig,
    perceptual_cfg: &PerceptualConfig,
    lambdas: &[Lambda],
) -> Result<Vec<(Lambda, Sketch)>, PipelineError> {
    let tokens = tokenize(text, canonical_cfg)?;
    Ok(perceptual::sketch_tokens_for(&tokens, perceptual_cfg, lambdas)?)
}
