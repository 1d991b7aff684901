//! Sketch accuracy: how far each finite λ strays from the exact
//! (`λ = inf`) similarity at the same window size.

use std::collections::HashMap;
use std::io::Write;

use index::{IndexError, ResultStore};
use perceptual::Lambda;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const EVALUATION_CSV_HEADER: &str = "w,lambda,mae,samples";

/// Mean absolute error of one `(W, λ)` against `(W, inf)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaError {
    pub w: usize,
    pub lambda: Lambda,
    /// `None` when no pair had a defined similarity on both sides.
    pub mae: Option<f64>,
    pub samples: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub errors: Vec<LambdaError>,
}

impl Evaluation {
    /// The finite λ with the lowest error at `w`; ties go to the smaller λ.
    pub fn best_lambda(&self, w: usize) -> Option<&LambdaError> {
        self.errors
            .iter()
            .filter(|e| e.w == w && e.mae.is_some())
            .min_by(|a, b| {
                let (ma, mb) = (a.mae.unwrap_or(f64::INFINITY), b.mae.unwrap_or(f64::INFINITY));
                ma.total_cmp(&mb).then(a.lambda.cmp(&b.lambda))
            })
    }

    pub fn write_csv<O: Write>(&self, mut out: O) -> Result<usize, IndexError> {
        writeln!(out, "{EVALUATION_CSV_HEADER}")?;
        for e in &self.errors {
            match e.mae {
                Some(mae) => writeln!(out, "{},{},{:.6},{}", e.w, e.lambda, mae, e.samples)?,
                None => writeln!(out, "{},{},undefined,{}", e.w, e.lambda, e.samples)?,
            }
        }
        out.flush()?;
        Ok(self.errors.len())
    }
}

/// Compare stored records for every finite λ in `lambdas` against the
/// unbounded records of the same window.
///
/// Pairs are matched on `(entity, revision)`. A pair is only counted when
/// both similarities are defined.
pub fn evaluate(
    results: &ResultStore,
    windows: &[usize],
    lambdas: &[Lambda],
) -> Result<Evaluation, IndexError> {
    let mut evaluation = Evaluation::default();

    for &w in windows {
        let reference: HashMap<(String, u32), f64> = results
            .records(w, Lambda::Unbounded)?
            .into_iter()
            .filter_map(|r| r.similarity.value().map(|v| ((r.entity, r.revision), v)))
            .collect();
        debug!(w, reference = reference.len(), "evaluation_reference_loaded");

        for &lambda in lambdas.iter().filter(|l| !l.is_unbounded()) {
            let mut total = 0.0;
            let mut samples = 0usize;
            for record in results.records(w, lambda)? {
                let Some(approx) = record.similarity.value() else {
                    continue;
                };
                if let Some(exact) = reference.get(&(record.entity, record.revision)) {
                    total += (approx - exact).abs();
                    samples += 1;
                }
            }
            let mae = (samples > 0).then(|| total / samples as f64);
            evaluation.errors.push(LambdaError {
                w,
                lambda,
                mae,
                samples,
            });
        }

        if let Some(best) = evaluation.best_lambda(w) {
            info!(w, lambda = %best.lambda, mae = best.mae, "best_lambda");
        }
    }

    Ok(evaluation)
}
