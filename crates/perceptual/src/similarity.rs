//! Exact Jaccard similarity over sketches.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::sketch::Sketch;

/// Marker written wherever a similarity is undefined.
pub const UNDEFINED_LABEL: &str = "undefined";

/// Result of comparing two sketches.
///
/// `Undefined` is returned when both sketches are empty: 0 / 0 has no
/// meaningful value and is never coerced to 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Similarity {
    Value(f64),
    Undefined,
}

impl Similarity {
    pub fn value(&self) -> Option<f64> {
        match self {
            Similarity::Value(v) => Some(*v),
            Similarity::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Similarity::Undefined)
    }
}

impl From<Option<f64>> for Similarity {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Similarity::Undefined, Similarity::Value)
    }
}

impl From<Similarity> for Option<f64> {
    fn from(similarity: Similarity) -> Self {
        similarity.value()
    }
}

impl fmt::Display for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Similarity::Value(v) => write!(f, "{v:.6}"),
            Similarity::Undefined => f.write_str(UNDEFINED_LABEL),
        }
    }
}

/// Error parsing a similarity cell.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid similarity value {0:?}")]
pub struct ParseSimilarityError(pub String);

impl FromStr for Similarity {
    type Err = ParseSimilarityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case(UNDEFINED_LABEL) {
            return Ok(Similarity::Undefined);
        }
        match trimmed.parse::<f64>() {
            Ok(v) if (0.0..=1.0).contains(&v) => Ok(Similarity::Value(v)),
            _ => Err(ParseSimilarityError(trimmed.to_string())),
        }
    }
}

/// `|A ∩ B| / |A ∪ B|` over two sketches.
///
/// Both inputs are sorted and unique, so a single merge pass counts the
/// intersection. Symmetric in its arguments.
pub fn jaccard(a: &Sketch, b: &Sketch) -> Similarity {
    if a.is_empty() && b.is_empty() {
        return Similarity::Undefined;
    }
    let inter = intersection_len(a.values(), b.values());
    let union = a.len() + b.len() - inter;
    Similarity::Value(inter as f64 / union as f64)
}

fn intersection_len(a: &[u64], b: &[u64]) -> usize {
    let (mut i, mut j, mut count) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                count += 1;
                i += 1;
                j += 1;
            }
        }
    }
    count
}
