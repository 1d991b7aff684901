//! Bounded sketches: the λ smallest shingle values of a document.
//!
//! Keeping the k smallest values of a uniformly hashed set is a bottom-k
//! min-hash sketch. Jaccard computed on two such sketches approaches the
//! Jaccard of the full sets as k grows, with error shrinking roughly as
//! O(1/√k), so λ trades storage for precision.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::PerceptualError;
use crate::shingles::ShingleSet;

/// Sketch bound: keep at most `k` values, or keep everything.
///
/// Orders `Bounded(1) < Bounded(2) < … < Unbounded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "LambdaRepr", into = "LambdaRepr")]
pub enum Lambda {
    Bounded(NonZeroUsize),
    Unbounded,
}

impl Lambda {
    /// A finite bound; `k` must be positive.
    pub fn bounded(k: usize) -> Result<Self, PerceptualError> {
        NonZeroUsize::new(k)
            .map(Lambda::Bounded)
            .ok_or_else(|| PerceptualError::InvalidLambda {
                value: k.to_string(),
            })
    }

    /// The finite bound, if any.
    pub fn limit(&self) -> Option<usize> {
        match self {
            Lambda::Bounded(k) => Some(k.get()),
            Lambda::Unbounded => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Lambda::Unbounded)
    }

    /// Label used in storage keys and reports: `"inf"` or the integer.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lambda::Bounded(k) => write!(f, "{k}"),
            Lambda::Unbounded => f.write_str("inf"),
        }
    }
}

impl FromStr for Lambda {
    type Err = PerceptualError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "inf" | "infty" | "infinite" => Ok(Lambda::Unbounded),
            other => other
                .parse::<usize>()
                .ok()
                .and_then(NonZeroUsize::new)
                .map(Lambda::Bounded)
                .ok_or_else(|| PerceptualError::InvalidLambda {
                    value: trimmed.to_string(),
                }),
        }
    }
}

/// Wire form: YAML/JSON accept `32` or `"inf"`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LambdaRepr {
    Count(usize),
    Label(String),
}

impl TryFrom<LambdaRepr> for Lambda {
    type Error = PerceptualError;

    fn try_from(repr: LambdaRepr) -> Result<Self, Self::Error> {
        match repr {
            LambdaRepr::Count(k) => Lambda::bounded(k),
            LambdaRepr::Label(label) => label.parse(),
        }
    }
}

impl From<Lambda> for LambdaRepr {
    fn from(lambda: Lambda) -> Self {
        match lambda {
            Lambda::Bounded(k) => LambdaRepr::Count(k.get()),
            Lambda::Unbounded => LambdaRepr::Label("inf".into()),
        }
    }
}

/// A bounded, ascending subset of a [`ShingleSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sketch {
    values: Vec<u64>,
}

impl Sketch {
    /// Build a sketch from arbitrary values; sorts and deduplicates.
    pub fn from_values<I: IntoIterator<Item = u64>>(values: I) -> Self {
        let mut values: Vec<u64> = values.into_iter().collect();
        values.sort_unstable();
        values.dedup();
        Self { values }
    }

    /// Keep the `lambda` smallest values.
    ///
    /// The smallest k of the smallest m (m ≥ k) are the smallest k of the
    /// whole set, so a finite sketch can be derived from an unbounded one (or
    /// any wider one) without regenerating shingles.
    pub fn truncate_to(&self, lambda: Lambda) -> Sketch {
        match lambda.limit() {
            Some(k) if k < self.values.len() => Sketch {
                values: self.values[..k].to_vec(),
            },
            _ => self.clone(),
        }
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, value: u64) -> bool {
        self.values.binary_search(&value).is_ok()
    }

    pub fn into_vec(self) -> Vec<u64> {
        self.values
    }
}

impl From<ShingleSet> for Sketch {
    /// The unbounded sketch of a set is the set itself.
    fn from(set: ShingleSet) -> Self {
        Sketch {
            values: set.into_vec(),
        }
    }
}

/// Reduce a full shingle set to its λ-sketch.
///
/// Ties at the boundary cannot occur: equal hash values were already
/// collapsed in the set.
pub fn select(set: &ShingleSet, lambda: Lambda) -> Sketch {
    let values = set.as_slice();
    let take = lambda.limit().map_or(values.len(), |k| k.min(values.len()));
    Sketch {
        values: values[..take].to_vec(),
    }
}
