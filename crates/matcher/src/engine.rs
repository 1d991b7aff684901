use index::{IndexError, JaccardRecord, ResultStore, ShingleStore, SketchKey};
use perceptual::{jaccard, Lambda};
use tracing::{debug, warn};

use crate::types::{CompareRequest, ComparisonOutcome, EntityComparison, MatchError, PairOutcome};

#[cfg(test)]
mod tests;

/// Compares each revision of an entity against its baseline and records
/// the result.
///
/// Sketches are read from a [`ShingleStore`]; records are written to a
/// [`ResultStore`]. Both may share one backend.
#[derive(Clone)]
pub struct JaccardComputer {
    shingles: ShingleStore,
    results: ResultStore,
}

impl JaccardComputer {
    pub fn new(shingles: ShingleStore, results: ResultStore) -> Self {
        Self { shingles, results }
    }

    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    /// Run every comparison described by `req`.
    pub fn compare(&self, req: &CompareRequest) -> Result<EntityComparison, MatchError> {
        req.validate()?;
        self.compare_entity(
            &req.entity,
            req.baseline_revision,
            &req.revisions,
            req.w,
            req.lambda,
        )
    }

    /// Compare `revisions` of `entity` against `baseline` at `(w, lambda)`.
    ///
    /// The baseline sketch is loaded once. A revision whose sketch is absent
    /// is reported as [`PairOutcome::MissingSketch`], one that cannot be
    /// decoded as [`PairOutcome::UnreadableSketch`]; either problem on the
    /// baseline skips the entity. Backend and I/O failures abort with an
    /// error.
    pub fn compare_entity(
        &self,
        entity: &str,
        baseline: u32,
        revisions: &[u32],
        w: usize,
        lambda: Lambda,
    ) -> Result<EntityComparison, MatchError> {
        let mut comparison = EntityComparison {
            entity: entity.to_string(),
            baseline_revision: baseline,
            w,
            lambda,
            outcome: ComparisonOutcome::Compared { pairs: Vec::new() },
        };

        let baseline_key = SketchKey::new(entity, baseline, w, lambda);
        let base = match self.shingles.get(&baseline_key) {
            Ok(sketch) => sketch,
            Err(IndexError::NotFound { key }) => {
                warn!(
                    entity,
                    revision = baseline,
                    w,
                    lambda = %lambda,
                    reason = "missing_baseline",
                    "comparison_skipped"
                );
                comparison.outcome = ComparisonOutcome::MissingBaseline { key };
                return Ok(comparison);
            }
            Err(e) => {
                let (key, detail) = unreadable(&baseline_key, e)?;
                warn!(
                    entity,
                    revision = baseline,
                    w,
                    lambda = %lambda,
                    reason = "unreadable_baseline",
                    error = %detail,
                    "comparison_skipped"
                );
                comparison.outcome = ComparisonOutcome::UnreadableBaseline { key, detail };
                return Ok(comparison);
            }
        };

        let mut pairs = Vec::with_capacity(revisions.len());
        for &revision in revisions.iter().filter(|&&r| r != baseline) {
            let key = SketchKey::new(entity, revision, w, lambda);
            let other = match self.shingles.get(&key) {
                Ok(sketch) => sketch,
                Err(IndexError::NotFound { key }) => {
                    warn!(
                        entity,
                        revision,
                        w,
                        lambda = %lambda,
                        reason = "missing_sketch",
                        "comparison_skipped"
                    );
                    pairs.push(PairOutcome::MissingSketch { revision, key });
                    continue;
                }
                Err(e) => {
                    let (key, detail) = unreadable(&key, e)?;
                    warn!(
                        entity,
                        revision,
                        w,
                        lambda = %lambda,
                        reason = "unreadable_sketch",
                        error = %detail,
                        "comparison_skipped"
                    );
                    pairs.push(PairOutcome::UnreadableSketch {
                        revision,
                        key,
                        detail,
                    });
                    continue;
                }
            };

            let similarity = jaccard(&base, &other);
            if similarity.is_undefined() {
                debug!(entity, revision, w, lambda = %lambda, "degenerate_similarity");
            }
            let record = JaccardRecord::new(entity, baseline, revision, w, lambda, similarity);
            self.results.append(&record)?;
            pairs.push(PairOutcome::Recorded(record));
        }

        debug!(
            entity,
            w,
            lambda = %lambda,
            compared = pairs.len(),
            "entity_compared"
        );
        comparison.outcome = ComparisonOutcome::Compared { pairs };
        Ok(comparison)
    }
}

/// Split per-key failures (bad bytes, bad key) from storage faults.
///
/// Returns the storage key and error text for the former and hands the
/// latter back as an error.
fn unreadable(key: &SketchKey, err: IndexError) -> Result<(String, String), MatchError> {
    match err {
        IndexError::Decode(_) => Ok((key.storage_key().unwrap_or_default(), err.to_string())),
        IndexError::InvalidKey(ref bad) => Ok((bad.clone(), err.to_string())),
        other => Err(other.into()),
    }
}
