mod common;

use common::seed_corpus;
use revsim::{BatchRunner, Corpus, Lambda, RevsimConfig, SkipReason, evaluate};

fn yaml(dumps: &std::path::Path, out: &std::path::Path) -> String {
    format!(
        r#"
version: "1.0"
name: "integration"
perceptual:
  windows: [4]
  lambdas: [2, 4, inf]
corpus:
  root: "{}"
store:
  backend: filesystem
  root: "{}"
batch:
  parallel: true
  comparison:
    step: 3
"#,
        dumps.display(),
        out.display()
    )
}

#[test]
fn config_driven_run_and_export() {
    let dumps = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    seed_corpus(dumps.path());

    let config = RevsimConfig::from_yaml(&yaml(dumps.path(), out.path())).unwrap();
    assert_eq!(config.perceptual.lambdas().last(), Some(&Lambda::Unbounded));

    let corpus = Corpus::scan_with(
        config.corpus.root.as_ref().unwrap(),
        &config.corpus.layout(),
    )
    .unwrap();
    let runner = BatchRunner::from_config(&config).unwrap();
    let report = runner.run(&corpus).unwrap();

    // step 3 keeps Detroit_MI C-3 and Tiny_TT C-3 only.
    assert_eq!(report.documents_processed, 4);
    assert_eq!(report.records_written, 6);
    assert_eq!(report.skipped(SkipReason::MissingBaseline), 4);
    assert!(out.path().join("shingles/Detroit_MI/4/lam-2/C-3.txt").is_file());
    assert!(!out.path().join("shingles/Detroit_MI/4/lam-2/C-1.txt").exists());

    let mut csv = Vec::new();
    let rows = runner.results().write_csv(4, Lambda::Unbounded, &mut csv).unwrap();
    assert_eq!(rows, 2);
    let csv = String::from_utf8(csv).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "entity,w,lambda,revision,jaccard");
    assert_eq!(lines[1], "Detroit_MI,4,inf,3,0.259259");
    assert_eq!(lines[2], "Tiny_TT,4,inf,3,undefined");
}

#[test]
fn evaluation_scores_finite_lambdas() {
    let dumps = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    seed_corpus(dumps.path());

    let config = RevsimConfig::from_yaml(&yaml(dumps.path(), out.path())).unwrap();
    let corpus = Corpus::scan(dumps.path()).unwrap();
    let runner = BatchRunner::from_config(&config).unwrap();
    runner.run(&corpus).unwrap();

    let settings = runner.settings();
    let evaluation = evaluate(runner.results(), &settings.windows, &settings.lambdas).unwrap();

    // Two finite λ for one window; Tiny_TT is undefined and not sampled.
    assert_eq!(evaluation.errors.len(), 2);
    for row in &evaluation.errors {
        assert_eq!(row.w, 4);
        assert_eq!(row.samples, 1);
        let mae = row.mae.unwrap();
        assert!((0.0..=1.0).contains(&mae));
    }
    assert!(evaluation.best_lambda(4).is_some());

    let mut buf = Vec::new();
    evaluation.write_csv(&mut buf).unwrap();
    assert!(String::from_utf8(buf).unwrap().starts_with("w,lambda,mae,samples\n4,2,"));
}

#[test]
fn config_round_trips_through_yaml() {
    let dumps = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let config = RevsimConfig::from_yaml(&yaml(dumps.path(), out.path())).unwrap();
    let again = RevsimConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
    assert_eq!(config, again);
}
