#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use revsim::{BatchRunner, BatchSettings, ComparisonPolicy, IndexBackend, Lambda};

/// `n` distinct words sharing `prefix`.
pub fn words(prefix: &str, n: usize) -> String {
    (0..n)
        .map(|i| format!("{prefix}{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Write `<root>/<entity>/<entity>_C-<revision>.txt`.
pub fn write_doc(root: &Path, entity: &str, revision: u32, text: &str) -> PathBuf {
    let dir = root.join(entity);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{entity}_C-{revision}.txt"));
    fs::write(&path, text).unwrap();
    path
}

/// Small corpus used across the integration tests.
///
/// `Detroit_MI`: revision 1 equals the baseline, revision 2 shares nothing
/// with it and revision 3 keeps the first half.
/// `Xtown_ZZ`: no baseline.
/// `Tiny_TT`: every revision is shorter than the window.
pub fn seed_corpus(root: &Path) {
    let base = words("d", 20);
    write_doc(root, "Detroit_MI", 0, &base);
    write_doc(root, "Detroit_MI", 1, &base);
    write_doc(root, "Detroit_MI", 2, &words("z", 20));
    let half = format!("{} {}", words("d", 10), words("n", 10));
    write_doc(root, "Detroit_MI", 3, &half);

    write_doc(root, "Xtown_ZZ", 3, &words("x", 20));
    write_doc(root, "Xtown_ZZ", 6, &words("x", 25));

    write_doc(root, "Tiny_TT", 0, "two words");
    write_doc(root, "Tiny_TT", 3, "three small words");
}

pub fn lam(k: usize) -> Lambda {
    Lambda::bounded(k).unwrap()
}

pub fn settings(parallel: bool) -> BatchSettings {
    BatchSettings {
        windows: vec![4],
        lambdas: vec![lam(4), Lambda::Unbounded],
        baseline_revision: 0,
        policy: ComparisonPolicy::default(),
        parallel,
        ..BatchSettings::default()
    }
}

pub fn runner(backend: Arc<dyn IndexBackend>, parallel: bool) -> BatchRunner {
    BatchRunner::new(settings(parallel), backend).unwrap()
}

/// Every file under `root`, relative path to bytes.
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut out = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_path_buf();
                out.insert(rel, fs::read(&path).unwrap());
            }
        }
    }
    out
}
