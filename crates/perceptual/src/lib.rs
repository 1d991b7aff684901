//! # Shingling and sketches
//!
//! Takes an ordered token stream and produces a compact, similarity
//! preserving sketch of it, then compares sketches with exact Jaccard.
//!
//! ## Contract
//!
//! - Consumes tokens produced upstream; never normalizes or tokenizes.
//! - A pure function of `(tokens, config)`: no I/O, no clocks, no global
//!   state. Same tokens and config give bit-identical sketches.
//!
//! ## Pipeline
//!
//! 1.  **Shingling**: every window of `w` consecutive tokens is hashed to a
//!     `u64` ([`shingles::window_hashes`]); distinct values form the
//!     [`ShingleSet`]. Fewer than `w` tokens give an empty set, which is not
//!     an error.
//! 2.  **Selection**: the λ smallest values form the [`Sketch`]
//!     ([`sketch::select`]). [`Lambda::Unbounded`] keeps the whole set.
//! 3.  **Comparison**: [`jaccard`] over two sketches, returning
//!     [`Similarity::Undefined`] when both are empty.
//!
//! ```
//! use perceptual::{jaccard, sketch_tokens, Lambda, PerceptualConfig};
//!
//! let cfg = PerceptualConfig::new().with_w(2).with_lambda(Lambda::Unbounded);
//! let a = sketch_tokens(&["the", "quick", "brown", "fox"], &cfg).unwrap();
//! let b = sketch_tokens(&["the", "quick", "brown", "cat"], &cfg).unwrap();
//!
//! // {the quick, quick brown} shared out of four distinct shingles.
//! assert_eq!(jaccard(&a, &b).value(), Some(0.5));
//! ```

pub mod config;
pub mod shingles;
pub mod similarity;
pub mod sketch;

pub use crate::config::{PerceptualConfig, PerceptualError};
pub use crate::shingles::{shingle_set, window_hashes, ShingleSet};
pub use crate::similarity::{jaccard, ParseSimilarityError, Similarity, UNDEFINED_LABEL};
pub use crate::sketch::{select, Lambda, Sketch};

/// Full shingle set for `tokens` at `cfg.w`.
pub fn shingle_tokens<S>(tokens: &[S], cfg: &PerceptualConfig) -> Result<ShingleSet, PerceptualError>
where
    S: AsRef<str> + Sync,
{
    cfg.validate()?;
    Ok(shingle_set(tokens, cfg.w, cfg.seed, cfg.use_parallel))
}

/// λ-sketch for `tokens` at `cfg.w` and `cfg.lambda`.
pub fn sketch_tokens<S>(tokens: &[S], cfg: &PerceptualConfig) -> Result<Sketch, PerceptualError>
where
    S: AsRef<str> + Sync,
{
    let set = shingle_tokens(tokens, cfg)?;
    Ok(select(&set, cfg.lambda))
}

/// One sketch per requested λ, sharing a single shingling pass.
///
/// `cfg.lambda` is ignored; the result follows the order of `lambdas`.
pub fn sketch_tokens_for<S>(
    tokens: &[S],
    cfg: &PerceptualConfig,
    lambdas: &[Lambda],
) -> Result<Vec<(Lambda, Sketch)>, PerceptualError>
where
    S: AsRef<str> + Sync,
{
    let full = Sketch::from(shingle_tokens(tokens, cfg)?);
    Ok(lambdas
        .iter()
        .map(|&lambda| (lambda, full.truncate_to(lambda)))
        .collect())
}
