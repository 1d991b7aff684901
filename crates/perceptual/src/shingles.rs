//! W-shingling over a token stream.
//!
//! Every contiguous window of `w` tokens is reduced to a 64-bit shingle value
//! with a rolling polynomial hash over per-token xxh3 hashes, then passed
//! through a splitmix64 finalizer so the values are spread uniformly over
//! `u64`. The smallest-λ sketch relies on that uniformity. Runs in O(n).

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// The set of distinct shingle values for one document and window width.
///
/// Values are kept sorted ascending and unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShingleSet {
    values: Vec<u64>,
}

impl ShingleSet {
    /// Build a set from arbitrary hashes; sorts and deduplicates.
    pub fn from_hashes(mut hashes: Vec<u64>) -> Self {
        hashes.sort_unstable();
        hashes.dedup();
        Self { values: hashes }
    }

    pub fn as_slice(&self) -> &[u64] {
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

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.values.iter().copied()
    }

    pub fn into_vec(self) -> Vec<u64> {
        self.values
    }
}

/// Hash every window of `w` tokens, in window order.
///
/// Returns `len - w + 1` values, or nothing when `w == 0` or there are fewer
/// than `w` tokens. Identical windows hash identically regardless of their
/// position; token order inside a window matters.
pub fn window_hashes<S>(tokens: &[S], w: usize, seed: u64, parallel: bool) -> Vec<u64>
where
    S: AsRef<str> + Sync,
{
    let n = tokens.len();
    if w == 0 || n < w {
        return Vec::new();
    }

    let mut th: Vec<u64> = Vec::with_capacity(n);
    if parallel {
        tokens
            .par_iter()
            .map(|t| hash_token(t.as_ref(), seed))
            .collect_into_vec(&mut th);
    } else {
        th.extend(tokens.iter().map(|t| hash_token(t.as_ref(), seed)));
    }

    // Seed-derived base. Forcing it odd keeps it a unit mod 2^64, so no
    // token's contribution is shifted out for large w.
    const BASE: u64 = 1_000_003;
    let base = (BASE ^ splitmix64(seed)) | 1;

    // base^(w-1), used to drop the oldest token from the window.
    let mut base_wm1 = 1u64;
    for _ in 1..w {
        base_wm1 = base_wm1.wrapping_mul(base);
    }

    let mut out = Vec::with_capacity(n - w + 1);
    let mut h = 0u64;
    for &val in th.iter().take(w) {
        h = h.wrapping_mul(base).wrapping_add(val);
    }
    out.push(splitmix64(h));

    for (&old, &new) in th.iter().zip(th.iter().skip(w)) {
        h = h.wrapping_sub(old.wrapping_mul(base_wm1));
        h = h.wrapping_mul(base).wrapping_add(new);
        out.push(splitmix64(h));
    }
    out
}

/// Distinct shingle values for `tokens` at window width `w`.
pub fn shingle_set<S>(tokens: &[S], w: usize, seed: u64, parallel: bool) -> ShingleSet
where
    S: AsRef<str> + Sync,
{
    ShingleSet::from_hashes(window_hashes(tokens, w, seed, parallel))
}

#[inline]
fn hash_token(token: &str, seed: u64) -> u64 {
    xxh3_64_with_seed(token.as_bytes(), seed)
}

/// A 64-bit finalizer with good avalanche behavior.
#[inline]
pub(crate) fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
