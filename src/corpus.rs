//! Revision dump reader.
//!
//! Expects one directory per entity under a root, each holding one text file
//! per revision:
//!
//! ```text
//! dumps/
//!   Detroit_MI/
//!     Detroit_MI_C-0.txt
//!     Detroit_MI_C-3.txt
//!   Miami_FL/
//!     Miami_FL_C-0.txt
//! ```
//!
//! Directory and file names are matched with configurable regular
//! expressions ([`CorpusLayout`]). The file pattern must capture the
//! `entity` and `revision` groups.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("corpus root {} does not exist or is not a directory", .path.display())]
    MissingRoot { path: PathBuf },
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid corpus pattern: {0}")]
    Pattern(String),
    #[error("no document for {entity} revision {revision}")]
    UnknownDocument { entity: String, revision: u32 },
}

/// Naming rules for entity directories and revision files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusLayout {
    pub dir_pattern: String,
    pub file_pattern: String,
}

impl Default for CorpusLayout {
    fn default() -> Self {
        Self {
            dir_pattern: r"^(?P<entity>.+?_\w{2})$".to_string(),
            file_pattern: r"^(?P<entity>.+?_\w{2})_C-(?P<revision>\d+)\.txt$".to_string(),
        }
    }
}

pub(crate) struct CompiledLayout {
    dir: Regex,
    file: Regex,
}

impl CorpusLayout {
    pub(crate) fn compile(&self) -> Result<CompiledLayout, CorpusError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| CorpusError::Pattern(format!("{pattern:?}: {e}")))
        };
        let dir = compile(&self.dir_pattern)?;
        let file = compile(&self.file_pattern)?;
        for group in ["entity", "revision"] {
            if !file.capture_names().flatten().any(|name| name == group) {
                return Err(CorpusError::Pattern(format!(
                    "file_pattern must have a named group `{group}`"
                )));
            }
        }
        Ok(CompiledLayout { dir, file })
    }
}

/// One revision's raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub entity: String,
    pub revision: u32,
    pub text: String,
}

/// Index of every well-formed revision file under a dumps root.
#[derive(Debug, Clone)]
pub struct Corpus {
    root: PathBuf,
    entities: BTreeMap<String, BTreeMap<u32, PathBuf>>,
    malformed: Vec<PathBuf>,
}

impl Corpus {
    /// Scan `root` using the default layout.
    pub fn scan<P: AsRef<Path>>(root: P) -> Result<Self, CorpusError> {
        Self::scan_with(root, &CorpusLayout::default())
    }

    /// Scan `root`, matching names against `layout`.
    ///
    /// Directories that do not match are ignored. Files inside an entity
    /// directory that do not match (or name another entity) are collected
    /// in [`Corpus::malformed`] and logged.
    pub fn scan_with<P: AsRef<Path>>(root: P, layout: &CorpusLayout) -> Result<Self, CorpusError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(CorpusError::MissingRoot { path: root });
        }
        let layout = layout.compile()?;

        let mut entities = BTreeMap::new();
        let mut malformed = Vec::new();
        for dir in sorted_entries(&root)? {
            if !dir.is_dir() {
                continue;
            }
            let Some(dir_name) = file_name(&dir) else {
                continue;
            };
            let Some(entity) = layout
                .dir
                .captures(&dir_name)
                .and_then(|caps| caps.name("entity").map(|m| m.as_str().to_string()))
                .or_else(|| layout.dir.is_match(&dir_name).then(|| dir_name.clone()))
            else {
                debug!(dir = %dir.display(), "corpus_dir_ignored");
                continue;
            };

            let mut revisions: BTreeMap<u32, PathBuf> = BTreeMap::new();
            for file in sorted_entries(&dir)? {
                if !file.is_file() {
                    continue;
                }
                match parse_file_name(&layout.file, &file, &entity) {
                    Some(revision) => {
                        if let Some(previous) = revisions.get(&revision) {
                            warn!(
                                entity = %entity,
                                revision,
                                kept = %previous.display(),
                                ignored = %file.display(),
                                "duplicate_revision"
                            );
                            continue;
                        }
                        revisions.insert(revision, file);
                    }
                    None => {
                        warn!(
                            entity = %entity,
                            path = %file.display(),
                            reason = "malformed_input",
                            "corpus_file_skipped"
                        );
                        malformed.push(file);
                    }
                }
            }
            entities.insert(entity, revisions);
        }

        debug!(
            root = %root.display(),
            entities = entities.len(),
            malformed = malformed.len(),
            "corpus_scanned"
        );
        Ok(Self {
            root,
            entities,
            malformed,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Entity ids in ascending order.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Revisions available for `entity`, ascending. Empty for unknown ids.
    pub fn revisions(&self, entity: &str) -> Vec<u32> {
        self.entities
            .get(entity)
            .map(|revs| revs.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, entity: &str, revision: u32) -> bool {
        self.entities
            .get(entity)
            .is_some_and(|revs| revs.contains_key(&revision))
    }

    /// Files that sat in an entity directory but did not match the layout.
    pub fn malformed(&self) -> &[PathBuf] {
        &self.malformed
    }

    /// Total number of well-formed revision files.
    pub fn document_count(&self) -> usize {
        self.entities.values().map(BTreeMap::len).sum()
    }

    /// Read one revision's text. Invalid UTF-8 is replaced, not rejected.
    pub fn read(&self, entity: &str, revision: u32) -> Result<Document, CorpusError> {
        let path = self
            .entities
            .get(entity)
            .and_then(|revs| revs.get(&revision))
            .ok_or_else(|| CorpusError::UnknownDocument {
                entity: entity.to_string(),
                revision,
            })?;
        let bytes = fs::read(path).map_err(|source| CorpusError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Document {
            entity: entity.to_string(),
            revision,
            text: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, CorpusError> {
    let io_err = |source| CorpusError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(dir)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()?.to_str().map(str::to_string)
}

fn parse_file_name(pattern: &Regex, path: &Path, entity: &str) -> Option<u32> {
    let name = file_name(path)?;
    let caps = pattern.captures(&name)?;
    if caps.name("entity")?.as_str() != entity {
        return None;
    }
    caps.name("revision")?.as_str().parse().ok()
}
