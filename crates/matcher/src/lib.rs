//! # revsim matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` sits between the sketch store and the result store. For one
//! entity at one `(W, λ)` it loads the baseline sketch, computes the exact
//! Jaccard similarity of every comparison revision against it, and writes a
//! [`index::JaccardRecord`] per pair.
//!
//! ## Core Types
//!
//! - [`JaccardComputer`]: the comparison engine.
//! - [`CompareRequest`]: entity + baseline + revisions + `(W, λ)`.
//! - [`EntityComparison`]: what happened for the entity, pair by pair.
//! - [`PairOutcome`]: a stored record or a missing sketch.
//! - [`MatchError`]: invalid requests and storage faults.
//!
//! Missing sketches are outcomes, logged with `tracing::warn!`, so one
//! absent file never aborts a batch. Storage faults are errors.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use index::{IndexBackend, InMemoryBackend, ResultStore, ShingleStore, SketchKey};
//! use matcher::JaccardComputer;
//! use perceptual::{Lambda, Similarity, Sketch};
//!
//! let backend: Arc<dyn IndexBackend> = Arc::new(InMemoryBackend::new());
//! let shingles = ShingleStore::new(backend.clone());
//! let computer = JaccardComputer::new(shingles.clone(), ResultStore::new(backend));
//!
//! let key = |rev| SketchKey::new("Detroit_MI", rev, 25, Lambda::Unbounded);
//! shingles.put(&key(0), &Sketch::from_values([1, 2, 3, 4])).unwrap();
//! shingles.put(&key(3), &Sketch::from_values([1, 2, 3, 4])).unwrap();
//!
//! let cmp = computer
//!     .compare_entity("Detroit_MI", 0, &[3], 25, Lambda::Unbounded)
//!     .unwrap();
//! assert_eq!(cmp.records().next().unwrap().similarity, Similarity::Value(1.0));
//! ```

pub mod engine;
pub mod types;

pub use crate::engine::JaccardComputer;
pub use crate::types::{
    CompareRequest, ComparisonOutcome, EntityComparison, MatchError, PairOutcome,
};
