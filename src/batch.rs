//! Batch driver: sketch every revision in a corpus, then compare each
//! revision against its entity's baseline.
//!
//! Recoverable problems (an unreadable document, a missing sketch, a file
//! that does not follow the naming layout) are logged and recorded in the
//! [`RunReport`]; the batch carries on. Storage faults abort the batch with
//! a [`BatchError`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use canonical::{tokenize, CanonicalError, CanonicalizeConfig};
use index::{IndexBackend, IndexError, ResultStore, ShingleStore, SketchKey};
use matcher::{ComparisonOutcome, EntityComparison, JaccardComputer, MatchError, PairOutcome};
use perceptual::{sketch_tokens_for, Lambda, PerceptualConfig, PerceptualError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigLoadError, RevsimConfig};
use crate::corpus::{Corpus, CorpusError};

/// Fatal batch errors. Everything else ends up in the [`RunReport`].
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),
    #[error("storage fault: {0}")]
    Index(#[from] IndexError),
    #[error("comparison failed: {0}")]
    Match(#[from] MatchError),
    #[error("tokenizer error: {0}")]
    Canonical(#[from] CanonicalError),
    #[error("shingling error: {0}")]
    Perceptual(#[from] PerceptualError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigLoadError),
}

/// Which non-baseline revisions are compared against the baseline.
///
/// The default admits every revision. `step: 3, max_revision: 147`
/// reproduces the "every third revision up to 147" sampling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonPolicy {
    #[serde(default)]
    pub step: Option<u32>,
    #[serde(default)]
    pub max_revision: Option<u32>,
}

impl ComparisonPolicy {
    pub fn every(step: u32) -> Self {
        Self {
            step: Some(step),
            max_revision: None,
        }
    }

    pub fn with_max_revision(mut self, max_revision: u32) -> Self {
        self.max_revision = Some(max_revision);
        self
    }

    /// `true` if `revision` should be compared against `baseline`.
    pub fn admits(&self, revision: u32, baseline: u32) -> bool {
        revision != baseline
            && self.step.is_none_or(|step| step != 0 && revision % step == 0)
            && self.max_revision.is_none_or(|max| revision <= max)
    }

    /// Filter `revisions` down to the admitted ones, keeping order.
    pub fn select(&self, revisions: &[u32], baseline: u32) -> Vec<u32> {
        revisions
            .iter()
            .copied()
            .filter(|&r| self.admits(r, baseline))
            .collect()
    }
}

/// Why a unit of work was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The entity has no baseline document or baseline sketch.
    MissingBaseline,
    /// A comparison revision's document could not be read.
    MissingComparisonDocument,
    /// A comparison revision's sketch was not in the store.
    MissingSketch,
    /// A stored sketch could not be decoded; regenerating it fixes this.
    UnreadableSketch,
    /// A file in an entity directory did not follow the naming layout.
    MalformedInput,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingBaseline => "missing_baseline",
            SkipReason::MissingComparisonDocument => "missing_comparison_document",
            SkipReason::MissingSketch => "missing_sketch",
            SkipReason::UnreadableSketch => "unreadable_sketch",
            SkipReason::MalformedInput => "malformed_input",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One skipped unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skip {
    pub reason: SkipReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda: Option<Lambda>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub detail: String,
}

impl Skip {
    fn new(reason: SkipReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            entity: None,
            revision: None,
            w: None,
            lambda: None,
            path: None,
            detail: detail.into(),
        }
    }

    fn entity(mut self, entity: &str, revision: u32) -> Self {
        self.entity = Some(entity.to_string());
        self.revision = Some(revision);
        self
    }

    fn params(mut self, w: usize, lambda: Lambda) -> Self {
        self.w = Some(w);
        self.lambda = Some(lambda);
        self
    }
}

/// Outcome ledger for a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub documents_processed: usize,
    pub sketches_written: usize,
    pub records_written: usize,
    /// Records whose similarity is undefined (both sketches empty).
    pub degenerate_similarities: usize,
    pub skips: Vec<Skip>,
}

impl RunReport {
    pub fn skipped(&self, reason: SkipReason) -> usize {
        self.skips.iter().filter(|s| s.reason == reason).count()
    }

    pub fn is_clean(&self) -> bool {
        self.skips.is_empty()
    }

    pub fn merge(&mut self, other: RunReport) {
        self.documents_processed += other.documents_processed;
        self.sketches_written += other.sketches_written;
        self.records_written += other.records_written;
        self.degenerate_similarities += other.degenerate_similarities;
        self.skips.extend(other.skips);
    }

    fn record_comparison(&mut self, cmp: &EntityComparison) {
        match &cmp.outcome {
            ComparisonOutcome::MissingBaseline { key } => {
                self.skips.push(
                    Skip::new(SkipReason::MissingBaseline, format!("no sketch at {key}"))
                        .entity(&cmp.entity, cmp.baseline_revision)
                        .params(cmp.w, cmp.lambda),
                );
            }
            ComparisonOutcome::UnreadableBaseline { key, detail } => {
                self.skips.push(
                    Skip::new(
                        SkipReason::UnreadableSketch,
                        format!("regenerate {key}: {detail}"),
                    )
                    .entity(&cmp.entity, cmp.baseline_revision)
                    .params(cmp.w, cmp.lambda),
                );
            }
            ComparisonOutcome::Compared { pairs } => {
                for pair in pairs {
                    match pair {
                        PairOutcome::Recorded(record) => {
                            self.records_written += 1;
                            if record.similarity.is_undefined() {
                                self.degenerate_similarities += 1;
                            }
                        }
                        PairOutcome::MissingSketch { revision, key } => {
                            self.skips.push(
                                Skip::new(SkipReason::MissingSketch, format!("no sketch at {key}"))
                                    .entity(&cmp.entity, *revision)
                                    .params(cmp.w, cmp.lambda),
                            );
                        }
                        PairOutcome::UnreadableSketch {
                            revision,
                            key,
                            detail,
                        } => {
                            self.skips.push(
                                Skip::new(
                                    SkipReason::UnreadableSketch,
                                    format!("regenerate {key}: {detail}"),
                                )
                                .entity(&cmp.entity, *revision)
                                .params(cmp.w, cmp.lambda),
                            );
                        }
                    }
                }
            }
        }
    }
}

/// Parameters of a batch run, independent of where the data lives.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSettings {
    pub canonical: CanonicalizeConfig,
    /// Seed, version and parallel hashing; `w` and `lambda` are overridden
    /// per job.
    pub perceptual: PerceptualConfig,
    pub windows: Vec<usize>,
    pub lambdas: Vec<Lambda>,
    pub baseline_revision: u32,
    pub policy: ComparisonPolicy,
    pub parallel: bool,
}

impl BatchSettings {
    pub fn from_config(cfg: &RevsimConfig) -> Self {
        Self {
            canonical: cfg.canonical_config(),
            perceptual: cfg.perceptual_config(),
            windows: cfg.perceptual.windows(),
            lambdas: cfg.perceptual.lambdas(),
            baseline_revision: cfg.batch.baseline_revision,
            policy: cfg.batch.comparison,
            parallel: cfg.batch.parallel,
        }
    }

    fn validate(&self) -> Result<(), BatchError> {
        self.canonical.validate()?;
        for &w in &self.windows {
            self.perceptual.clone().with_w(w).validate()?;
        }
        Ok(())
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::from_config(&RevsimConfig::default())
    }
}

/// Runs sketch generation and comparison over a corpus.
pub struct BatchRunner {
    settings: BatchSettings,
    shingles: ShingleStore,
    computer: JaccardComputer,
}

impl BatchRunner {
    /// Build a runner whose sketch and result stores share `backend`.
    pub fn new(settings: BatchSettings, backend: Arc<dyn IndexBackend>) -> Result<Self, BatchError> {
        settings.validate()?;
        let shingles = ShingleStore::new(backend.clone());
        let computer = JaccardComputer::new(shingles.clone(), ResultStore::new(backend));
        Ok(Self {
            settings,
            shingles,
            computer,
        })
    }

    /// Build a runner and its backend from a loaded configuration.
    pub fn from_config(cfg: &RevsimConfig) -> Result<Self, BatchError> {
        let backend = cfg.backend_config()?.build()?;
        Self::new(BatchSettings::from_config(cfg), Arc::from(backend))
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    pub fn shingles(&self) -> &ShingleStore {
        &self.shingles
    }

    pub fn results(&self) -> &ResultStore {
        self.computer.results()
    }

    /// Generation followed by comparison.
    pub fn run(&self, corpus: &Corpus) -> Result<RunReport, BatchError> {
        let mut report = self.generate_sketches(corpus)?;
        report.merge(self.compute_similarities(corpus)?);
        Ok(report)
    }

    /// Sketch the baseline and every admitted revision of every entity, for
    /// every `(W, λ)`.
    ///
    /// The full shingle set is built once per `(document, W)` and each
    /// finite λ is derived from it by truncation.
    pub fn generate_sketches(&self, corpus: &Corpus) -> Result<RunReport, BatchError> {
        let baseline = self.settings.baseline_revision;
        let mut report = RunReport::default();

        for path in corpus.malformed() {
            report.skips.push(Skip {
                path: Some(path.clone()),
                ..Skip::new(SkipReason::MalformedInput, "file name does not match corpus layout")
            });
        }

        let mut jobs = Vec::new();
        for entity in corpus.entities() {
            if !corpus.contains(entity, baseline) {
                warn!(
                    entity,
                    revision = baseline,
                    reason = SkipReason::MissingBaseline.as_str(),
                    "document_skipped"
                );
                report.skips.push(
                    Skip::new(SkipReason::MissingBaseline, "no baseline document")
                        .entity(entity, baseline),
                );
                continue;
            }
            jobs.push((entity, baseline));
            let revisions = self.settings.policy.select(&corpus.revisions(entity), baseline);
            jobs.extend(revisions.into_iter().map(|rev| (entity, rev)));
        }

        info!(
            documents = jobs.len(),
            windows = ?self.settings.windows,
            lambdas = self.settings.lambdas.len(),
            parallel = self.settings.parallel,
            "sketch_generation_started"
        );

        let outcomes: Vec<RunReport> = if self.settings.parallel {
            jobs.par_iter()
                .map(|&(entity, rev)| self.sketch_document(corpus, entity, rev))
                .collect::<Result<_, _>>()?
        } else {
            jobs.iter()
                .map(|&(entity, rev)| self.sketch_document(corpus, entity, rev))
                .collect::<Result<_, _>>()?
        };
        for outcome in outcomes {
            report.merge(outcome);
        }

        info!(
            documents = report.documents_processed,
            sketches = report.sketches_written,
            skipped = report.skips.len(),
            "sketch_generation_finished"
        );
        Ok(report)
    }

    fn sketch_document(&self, corpus: &Corpus, entity: &str, revision: u32) -> Result<RunReport, BatchError> {
        let mut report = RunReport::default();
        let doc = match corpus.read(entity, revision) {
            Ok(doc) => doc,
            Err(e) => {
                let reason = if revision == self.settings.baseline_revision {
                    SkipReason::MissingBaseline
                } else {
                    SkipReason::MissingComparisonDocument
                };
                warn!(entity, revision, reason = reason.as_str(), error = %e, "document_skipped");
                report
                    .skips
                    .push(Skip::new(reason, e.to_string()).entity(entity, revision));
                return Ok(report);
            }
        };

        let tokens = tokenize(&doc.text, &self.settings.canonical)?;
        let mut items = Vec::with_capacity(self.settings.windows.len() * self.settings.lambdas.len());
        for &w in &self.settings.windows {
            let cfg = self.settings.perceptual.clone().with_w(w);
            for (lambda, sketch) in sketch_tokens_for(&tokens, &cfg, &self.settings.lambdas)? {
                items.push((SketchKey::new(entity, revision, w, lambda), sketch));
            }
        }
        self.shingles.put_all(&items)?;

        report.documents_processed = 1;
        report.sketches_written = items.len();
        Ok(report)
    }

    /// Compare every admitted revision against the baseline for every
    /// `(W, λ)`, reading sketches from the store.
    ///
    /// Entities whose baseline document is not in the corpus are skipped
    /// even if the store still holds a baseline sketch from an earlier run.
    pub fn compute_similarities(&self, corpus: &Corpus) -> Result<RunReport, BatchError> {
        let baseline = self.settings.baseline_revision;
        let mut report = RunReport::default();
        let mut jobs = Vec::new();
        for entity in corpus.entities() {
            if !corpus.contains(entity, baseline) {
                for &w in &self.settings.windows {
                    for &lambda in &self.settings.lambdas {
                        warn!(
                            entity,
                            revision = baseline,
                            w,
                            lambda = %lambda,
                            reason = SkipReason::MissingBaseline.as_str(),
                            "comparison_skipped"
                        );
                        report.skips.push(
                            Skip::new(SkipReason::MissingBaseline, "no baseline document")
                                .entity(entity, baseline)
                                .params(w, lambda),
                        );
                    }
                }
                continue;
            }
            let revisions = self.settings.policy.select(&corpus.revisions(entity), baseline);
            for &w in &self.settings.windows {
                for &lambda in &self.settings.lambdas {
                    jobs.push((entity, revisions.clone(), w, lambda));
                }
            }
        }

        info!(
            jobs = jobs.len(),
            baseline,
            parallel = self.settings.parallel,
            "comparison_started"
        );

        let compare = |(entity, revisions, w, lambda): &(&str, Vec<u32>, usize, Lambda)| {
            self.computer
                .compare_entity(entity, baseline, revisions, *w, *lambda)
        };
        let comparisons: Vec<EntityComparison> = if self.settings.parallel {
            jobs.par_iter().map(compare).collect::<Result<_, _>>()?
        } else {
            jobs.iter().map(compare).collect::<Result<_, _>>()?
        };

        for cmp in &comparisons {
            report.record_comparison(cmp);
        }
        self.results().flush()?;

        info!(
            records = report.records_written,
            undefined = report.degenerate_similarities,
            skipped = report.skips.len(),
            "comparison_finished"
        );
        Ok(report)
    }
}
