mod common;

use std::sync::Arc;

use common::{lam, runner, seed_corpus, snapshot};
use revsim::{
    CanonicalizeConfig, Corpus, FsBackend, IndexBackend, InMemoryBackend, Lambda,
    PerceptualConfig, process_document,
};

#[test]
fn equivalent_texts_give_identical_sketches() {
    let canonical = CanonicalizeConfig::default();
    let perceptual = PerceptualConfig::new().with_w(2);
    let lambdas = [lam(8), Lambda::Unbounded];

    let a = process_document(" Hello   world, again!  ", &canonical, &perceptual, &lambdas).unwrap();
    let b = process_document("hello WORLD again", &canonical, &perceptual, &lambdas).unwrap();
    assert_eq!(a, b);
}

#[test]
fn rerun_rewrites_identical_bytes() {
    let dumps = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    seed_corpus(dumps.path());
    let corpus = Corpus::scan(dumps.path()).unwrap();

    let backend: Arc<dyn IndexBackend> = Arc::new(FsBackend::open(out.path()).unwrap());
    runner(backend.clone(), false).run(&corpus).unwrap();
    let first = snapshot(out.path());
    assert!(!first.is_empty());

    runner(backend, false).run(&corpus).unwrap();
    let second = snapshot(out.path());
    assert_eq!(first, second);
}

#[test]
fn fresh_store_reproduces_the_same_output() {
    let dumps = tempfile::tempdir().unwrap();
    let out_a = tempfile::tempdir().unwrap();
    let out_b = tempfile::tempdir().unwrap();
    seed_corpus(dumps.path());
    let corpus = Corpus::scan(dumps.path()).unwrap();

    for out in [&out_a, &out_b] {
        let backend: Arc<dyn IndexBackend> = Arc::new(FsBackend::open(out.path()).unwrap());
        runner(backend, false).run(&corpus).unwrap();
    }
    assert_eq!(snapshot(out_a.path()), snapshot(out_b.path()));
}

#[test]
fn parallel_run_matches_serial_run() {
    let dumps = tempfile::tempdir().unwrap();
    seed_corpus(dumps.path());
    let corpus = Corpus::scan(dumps.path()).unwrap();

    let serial_backend: Arc<dyn IndexBackend> = Arc::new(InMemoryBackend::new());
    let parallel_backend: Arc<dyn IndexBackend> = Arc::new(InMemoryBackend::new());
    let serial = runner(serial_backend, false);
    let parallel = runner(parallel_backend, true);

    let serial_report = serial.run(&corpus).unwrap();
    let parallel_report = parallel.run(&corpus).unwrap();
    assert_eq!(serial_report, parallel_report);

    for lambda in [lam(4), Lambda::Unbounded] {
        assert_eq!(
            serial.results().records(4, lambda).unwrap(),
            parallel.results().records(4, lambda).unwrap()
        );
    }
}
