//! YAML configuration for revsim runs.
//!
//! Every section is optional; omitted sections take the defaults shown here.
//!
//! ```yaml
//! version: "1.0"
//! name: "city revisions"
//!
//! canonical:
//!   version: 1
//!   normalize_unicode: false
//!   lowercase: true
//!   strip_punctuation: true
//!
//! perceptual:
//!   version: 1
//!   windows: [25, 50]
//!   lambdas: [8, 16, 32, 64, inf]
//!   seed: 17297687000019483309
//!   use_parallel: false
//!
//! corpus:
//!   root: "dumps"
//!   dir_pattern: '^(?P<entity>.+?_\w{2})$'
//!   file_pattern: '^(?P<entity>.+?_\w{2})_C-(?P<revision>\d+)\.txt$'
//!
//! store:
//!   backend: "filesystem"
//!   root: "output"
//!
//! batch:
//!   parallel: true
//!   baseline_revision: 0
//!   comparison:
//!     step: 3
//!     max_revision: 147
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use canonical::CanonicalizeConfig;
use index::BackendConfig;
use perceptual::{Lambda, PerceptualConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::batch::ComparisonPolicy;
use crate::corpus::CorpusLayout;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}

/// Top-level configuration for a revsim run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct RevsimConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub canonical: CanonicalYamlConfig,

    #[serde(default)]
    pub perceptual: PerceptualYamlConfig,

    #[serde(default)]
    pub corpus: CorpusYamlConfig,

    #[serde(default)]
    pub store: StoreYamlConfig,

    #[serde(default)]
    pub batch: BatchYamlConfig,
}

impl RevsimConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: RevsimConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration back to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigLoadError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate the configuration.
    ///
    /// Called by the loaders; call it again after applying command-line
    /// overrides.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.canonical.validate()?;
        self.perceptual.validate()?;
        self.corpus.validate()?;
        self.store.validate()?;
        self.batch.validate()?;

        Ok(())
    }

    pub fn canonical_config(&self) -> CanonicalizeConfig {
        CanonicalizeConfig {
            version: self.canonical.version,
            normalize_unicode: self.canonical.normalize_unicode,
            strip_punctuation: self.canonical.strip_punctuation,
            lowercase: self.canonical.lowercase,
        }
    }

    /// Shingling parameters shared by every window; `w` and `lambda` are
    /// set per job.
    pub fn perceptual_config(&self) -> PerceptualConfig {
        PerceptualConfig {
            version: self.perceptual.version,
            seed: self.perceptual.seed,
            use_parallel: self.perceptual.use_parallel,
            ..PerceptualConfig::default()
        }
    }

    pub fn backend_config(&self) -> Result<BackendConfig, ConfigLoadError> {
        self.store.backend_config()
    }
}

impl Default for RevsimConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            canonical: CanonicalYamlConfig::default(),
            perceptual: PerceptualYamlConfig::default(),
            corpus: CorpusYamlConfig::default(),
            store: StoreYamlConfig::default(),
            batch: BatchYamlConfig::default(),
        }
    }
}

/// Tokenizer YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalYamlConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub normalize_unicode: bool,

    #[serde(default = "true_value")]
    pub lowercase: bool,

    #[serde(default = "true_value")]
    pub strip_punctuation: bool,
}

impl CanonicalYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.version == 0 {
            return Err(ConfigLoadError::Validation(
                "canonical.version must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CanonicalYamlConfig {
    fn default() -> Self {
        Self {
            version: 1,
            normalize_unicode: false,
            lowercase: true,
            strip_punctuation: true,
        }
    }
}

/// Shingling YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PerceptualYamlConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Window widths W; every W is run against every λ.
    #[serde(default = "default_windows")]
    pub windows: Vec<usize>,

    /// Sketch bounds; `inf` keeps the full shingle set.
    #[serde(default = "default_lambdas")]
    pub lambdas: Vec<Lambda>,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub use_parallel: bool,
}

impl PerceptualYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.version == 0 {
            return Err(ConfigLoadError::Validation(
                "perceptual.version must be >= 1".to_string(),
            ));
        }
        if self.windows.is_empty() {
            return Err(ConfigLoadError::MissingField("perceptual.windows".to_string()));
        }
        if self.windows.contains(&0) {
            return Err(ConfigLoadError::Validation(
                "perceptual.windows entries must be >= 1".to_string(),
            ));
        }
        if self.lambdas.is_empty() {
            return Err(ConfigLoadError::MissingField("perceptual.lambdas".to_string()));
        }
        Ok(())
    }

    /// Windows in ascending order without duplicates.
    pub fn windows(&self) -> Vec<usize> {
        let mut windows = self.windows.clone();
        windows.sort_unstable();
        windows.dedup();
        windows
    }

    /// λ values in ascending order (`inf` last) without duplicates.
    pub fn lambdas(&self) -> Vec<Lambda> {
        let mut lambdas = self.lambdas.clone();
        lambdas.sort_unstable();
        lambdas.dedup();
        lambdas
    }
}

impl Default for PerceptualYamlConfig {
    fn default() -> Self {
        Self {
            version: 1,
            windows: default_windows(),
            lambdas: default_lambdas(),
            seed: default_seed(),
            use_parallel: false,
        }
    }
}

/// Corpus reader YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorpusYamlConfig {
    /// Directory holding one sub-directory per entity.
    #[serde(default)]
    pub root: Option<PathBuf>,

    #[serde(default = "default_dir_pattern")]
    pub dir_pattern: String,

    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
}

impl CorpusYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        self.layout()
            .compile()
            .map(|_| ())
            .map_err(|e| ConfigLoadError::Validation(format!("corpus: {e}")))
    }

    pub fn layout(&self) -> CorpusLayout {
        CorpusLayout {
            dir_pattern: self.dir_pattern.clone(),
            file_pattern: self.file_pattern.clone(),
        }
    }
}

impl Default for CorpusYamlConfig {
    fn default() -> Self {
        Self {
            root: None,
            dir_pattern: default_dir_pattern(),
            file_pattern: default_file_pattern(),
        }
    }
}

/// Store YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreYamlConfig {
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Output directory for the `filesystem` backend.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Database file for the `redb` backend.
    #[serde(default)]
    pub redb_path: Option<PathBuf>,
}

impl StoreYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_backends = ["filesystem", "in_memory", "redb"];
        if !valid_backends.contains(&self.backend.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "store.backend must be one of: {valid_backends:?}"
            )));
        }

        if self.backend == "filesystem" && self.root.is_none() {
            return Err(ConfigLoadError::Validation(
                "store.root is required when backend is 'filesystem'".to_string(),
            ));
        }

        if self.backend == "redb" && self.redb_path.is_none() {
            return Err(ConfigLoadError::Validation(
                "store.redb_path is required when backend is 'redb'".to_string(),
            ));
        }

        Ok(())
    }

    pub fn backend_config(&self) -> Result<BackendConfig, ConfigLoadError> {
        match self.backend.as_str() {
            "in_memory" => Ok(BackendConfig::in_memory()),
            "filesystem" => self
                .root
                .clone()
                .map(BackendConfig::filesystem)
                .ok_or_else(|| ConfigLoadError::MissingField("store.root".to_string())),
            "redb" => self
                .redb_path
                .clone()
                .map(BackendConfig::redb)
                .ok_or_else(|| ConfigLoadError::MissingField("store.redb_path".to_string())),
            other => Err(ConfigLoadError::Validation(format!(
                "unknown store.backend {other:?}"
            ))),
        }
    }
}

impl Default for StoreYamlConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            root: Some(PathBuf::from("output")),
            redb_path: None,
        }
    }
}

/// Batch YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchYamlConfig {
    /// Fan documents and entities out over the rayon pool.
    #[serde(default)]
    pub parallel: bool,

    #[serde(default)]
    pub baseline_revision: u32,

    #[serde(default)]
    pub comparison: ComparisonPolicy,
}

impl BatchYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.comparison.step == Some(0) {
            return Err(ConfigLoadError::Validation(
                "batch.comparison.step must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BatchYamlConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            baseline_revision: 0,
            comparison: ComparisonPolicy::default(),
        }
    }
}

// Helper functions for serde defaults
fn default_version() -> u32 {
    1
}
fn true_value() -> bool {
    true
}
fn default_windows() -> Vec<usize> {
    vec![25, 50]
}
fn default_lambdas() -> Vec<Lambda> {
    [8, 16, 32, 64]
        .into_iter()
        .filter_map(|k| Lambda::bounded(k).ok())
        .chain([Lambda::Unbounded])
        .collect()
}
fn default_seed() -> u64 {
    0xF00D_BAAD_F00D_BAAD
}
fn default_dir_pattern() -> String {
    r"^(?P<entity>.+?_\w{2})$".to_string()
}
fn default_file_pattern() -> String {
    r"^(?P<entity>.+?_\w{2})_C-(?P<revision>\d+)\.txt$".to_string()
}
fn default_backend() -> String {
    "filesystem".to_string()
}
