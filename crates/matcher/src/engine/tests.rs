use super::*;
use std::sync::Arc;

use index::{BackendConfig, IndexBackend, InMemoryBackend};
use perceptual::{Similarity, Sketch};

fn computer() -> (JaccardComputer, ShingleStore) {
    let backend: Arc<dyn IndexBackend> = Arc::new(InMemoryBackend::new());
    let shingles = ShingleStore::new(backend.clone());
    let results = ResultStore::new(backend);
    (JaccardComputer::new(shingles.clone(), results), shingles)
}

fn put(store: &ShingleStore, entity: &str, revision: u32, values: &[u64]) {
    let key = SketchKey::new(entity, revision, 25, Lambda::Unbounded);
    store
        .put(&key, &Sketch::from_values(values.iter().copied()))
        .expect("put sketch");
}

/// Backend whose reads always fail, standing in for a broken disk.
struct FailingBackend;

impl IndexBackend for FailingBackend {
    fn put(&self, _: &str, _: &[u8]) -> Result<(), IndexError> {
        Err(IndexError::backend("read-only"))
    }
    fn get(&self, _: &str) -> Result<Option<Vec<u8>>, IndexError> {
        Err(IndexError::backend("device gone"))
    }
    fn delete(&self, _: &str) -> Result<(), IndexError> {
        Ok(())
    }
    fn batch_put(&self, _: Vec<(String, Vec<u8>)>) -> Result<(), IndexError> {
        Err(IndexError::backend("read-only"))
    }
    fn scan_prefix(
        &self,
        _: &str,
        _: &mut dyn FnMut(&str, &[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        Ok(())
    }
}

#[test]
fn compares_every_revision_against_baseline() {
    let (computer, shingles) = computer();
    put(&shingles, "A_XX", 0, &[1, 2, 3, 4]);
    put(&shingles, "A_XX", 3, &[1, 2, 3, 4]);
    put(&shingles, "A_XX", 6, &[3, 4, 5, 6]);

    let cmp = computer
        .compare_entity("A_XX", 0, &[3, 6], 25, Lambda::Unbounded)
        .expect("compare");

    let sims: Vec<(u32, Similarity)> = cmp.records().map(|r| (r.revision, r.similarity)).collect();
    assert_eq!(
        sims,
        vec![(3, Similarity::Value(1.0)), (6, Similarity::Value(2.0 / 6.0))]
    );

    let stored = computer.results().records(25, Lambda::Unbounded).unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|r| r.baseline_revision == 0));
}

#[test]
fn missing_revision_sketch_is_skipped_not_fatal() {
    let (computer, shingles) = computer();
    put(&shingles, "A_XX", 0, &[1, 2]);
    put(&shingles, "A_XX", 6, &[1, 2]);

    let cmp = computer
        .compare_entity("A_XX", 0, &[3, 6], 25, Lambda::Unbounded)
        .expect("compare");
    match &cmp.pairs()[0] {
        PairOutcome::MissingSketch { revision, key } => {
            assert_eq!(*revision, 3);
            assert_eq!(key, "shingles/A_XX/25/lam-inf/C-3");
        }
        other => panic!("expected a missing sketch, got {other:?}"),
    }
    assert_eq!(cmp.records().count(), 1);
    assert_eq!(computer.results().records(25, Lambda::Unbounded).unwrap().len(), 1);
}

#[test]
fn missing_baseline_skips_the_entity() {
    let (computer, shingles) = computer();
    put(&shingles, "B_YY", 3, &[1]);
    put(&shingles, "B_YY", 6, &[1]);

    let cmp = computer
        .compare_entity("B_YY", 0, &[3, 6], 25, Lambda::Unbounded)
        .expect("compare");
    assert!(cmp.missing_baseline());
    assert!(computer
        .results()
        .records(25, Lambda::Unbounded)
        .unwrap()
        .is_empty());
}

#[test]
fn both_empty_sketches_record_undefined() {
    let (computer, shingles) = computer();
    put(&shingles, "Tiny_TX", 0, &[]);
    put(&shingles, "Tiny_TX", 3, &[]);
    put(&shingles, "Tiny_TX", 6, &[7]);

    let cmp = computer
        .compare_entity("Tiny_TX", 0, &[3, 6], 25, Lambda::Unbounded)
        .expect("compare");
    let sims: Vec<Similarity> = cmp.records().map(|r| r.similarity).collect();
    assert_eq!(sims, vec![Similarity::Undefined, Similarity::Value(0.0)]);
}

#[test]
fn baseline_in_revision_list_is_ignored() {
    let (computer, shingles) = computer();
    put(&shingles, "A_XX", 0, &[1]);
    put(&shingles, "A_XX", 3, &[1]);

    let cmp = computer
        .compare_entity("A_XX", 0, &[0, 3], 25, Lambda::Unbounded)
        .expect("compare");
    assert_eq!(cmp.pairs().len(), 1);
    assert_eq!(cmp.pairs()[0].revision(), 3);
}

#[test]
fn recomputation_overwrites_records() {
    let (computer, shingles) = computer();
    put(&shingles, "A_XX", 0, &[1, 2]);
    put(&shingles, "A_XX", 3, &[1, 3]);
    computer
        .compare_entity("A_XX", 0, &[3], 25, Lambda::Unbounded)
        .unwrap();

    put(&shingles, "A_XX", 3, &[1, 2]);
    computer
        .compare_entity("A_XX", 0, &[3], 25, Lambda::Unbounded)
        .unwrap();

    let stored = computer.results().records(25, Lambda::Unbounded).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].similarity, Similarity::Value(1.0));
}

#[test]
fn storage_faults_propagate() {
    let backend: Arc<dyn IndexBackend> = Arc::new(FailingBackend);
    let computer = JaccardComputer::new(
        ShingleStore::new(backend.clone()),
        ResultStore::new(backend),
    );
    let err = computer
        .compare_entity("A_XX", 0, &[3], 25, Lambda::Unbounded)
        .expect_err("backend failure must surface");
    assert!(matches!(err, MatchError::Index(IndexError::Backend(_))));
}

#[test]
fn compare_validates_request() {
    let (computer, _) = computer();
    let req = CompareRequest {
        entity: String::new(),
        baseline_revision: 0,
        revisions: vec![3],
        w: 25,
        lambda: Lambda::Unbounded,
    };
    assert!(matches!(
        computer.compare(&req),
        Err(MatchError::InvalidConfig(_))
    ));
}

#[test]
fn works_over_filesystem_backend() {
    let dir = tempfile::tempdir().unwrap();
    let backend: Arc<dyn IndexBackend> =
        Arc::from(BackendConfig::filesystem(dir.path()).build().unwrap());
    let shingles = ShingleStore::new(backend.clone());
    let computer = JaccardComputer::new(shingles.clone(), ResultStore::new(backend));
    put(&shingles, "A_XX", 0, &[1, 2, 3]);
    put(&shingles, "A_XX", 3, &[2, 3, 4]);

    let cmp = computer
        .compare_entity("A_XX", 0, &[3], 25, Lambda::Unbounded)
        .unwrap();
    assert_eq!(cmp.records().next().unwrap().similarity, Similarity::Value(0.5));
    assert!(dir.path().join("jaccard/25/lam-inf/A_XX/C-3.txt").is_file());
}

#[test]
fn corrupt_revision_sketch_is_skipped_not_fatal() {
    let backend: Arc<dyn IndexBackend> = Arc::new(InMemoryBackend::new());
    let shingles = ShingleStore::new(backend.clone());
    let computer = JaccardComputer::new(shingles.clone(), ResultStore::new(backend.clone()));
    put(&shingles, "A_XX", 0, &[1, 2, 3]);
    put(&shingles, "A_XX", 6, &[1, 2, 3]);
    backend
        .put("shingles/A_XX/25/lam-inf/C-3", b"garbage\n")
        .unwrap();

    let cmp = computer
        .compare_entity("A_XX", 0, &[3, 6], 25, Lambda::Unbounded)
        .expect("a corrupt sketch is not a storage fault");

    match &cmp.pairs()[0] {
        PairOutcome::UnreadableSketch { revision, key, detail } => {
            assert_eq!(*revision, 3);
            assert_eq!(key, "shingles/A_XX/25/lam-inf/C-3");
            assert!(detail.contains("garbage"));
        }
        other => panic!("expected unreadable sketch, got {other:?}"),
    }
    let recorded: Vec<u32> = cmp.records().map(|r| r.revision).collect();
    assert_eq!(recorded, vec![6]);
}

#[test]
fn corrupt_baseline_skips_the_entity() {
    let backend: Arc<dyn IndexBackend> = Arc::new(InMemoryBackend::new());
    let shingles = ShingleStore::new(backend.clone());
    let computer = JaccardComputer::new(shingles.clone(), ResultStore::new(backend.clone()));
    backend.put("shingles/A_XX/25/lam-inf/C-0", b"1\nx\n").unwrap();
    put(&shingles, "A_XX", 3, &[1, 2, 3]);

    let cmp = computer
        .compare_entity("A_XX", 0, &[3], 25, Lambda::Unbounded)
        .unwrap();
    assert!(matches!(
        cmp.outcome,
        ComparisonOutcome::UnreadableBaseline { ref key, .. } if key == "shingles/A_XX/25/lam-inf/C-0"
    ));
    assert!(computer.results().records(25, Lambda::Unbounded).unwrap().is_empty());
}
