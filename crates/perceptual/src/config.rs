//! Configuration and error types for shingling and sketch selection.
//!
//! This module is free of any I/O or environment-dependent behavior so that
//! sketch generation stays a pure function of `(tokens, config)`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sketch::Lambda;

/// Parameters for turning a token stream into a sketch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerceptualConfig {
    /// Configuration schema version.
    ///
    /// Any algorithmic change that can affect shingle values must bump this
    /// version so persisted sketches from different versions are never
    /// compared.
    pub version: u32,
    /// Window width W: number of consecutive tokens per shingle.
    pub w: usize,
    /// Sketch bound λ.
    pub lambda: Lambda,
    /// Seed for token hashing and the rolling-hash base.
    ///
    /// Two runs with the same seed, tokens and W produce bit-identical
    /// shingle values.
    pub seed: u64,
    /// Hash tokens on the rayon pool. Only pays off for very long documents.
    pub use_parallel: bool,
}

impl PerceptualConfig {
    /// Create a new configuration with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the window width (W). The revision experiments use 25 and 50.
    pub fn with_w(mut self, w: usize) -> Self {
        self.w = w;
        self
    }

    pub fn with_lambda(mut self, lambda: Lambda) -> Self {
        self.lambda = lambda;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), PerceptualError> {
        if self.version < 1 {
            return Err(PerceptualError::InvalidConfigVersion {
                version: self.version,
            });
        }
        if self.w < 1 {
            return Err(PerceptualError::InvalidConfigW { w: self.w });
        }
        Ok(())
    }
}

impl Default for PerceptualConfig {
    fn default() -> Self {
        Self {
            version: 1,
            w: 25,
            lambda: Lambda::Unbounded,
            seed: 0xF00D_BAAD_F00D_BAAD,
            use_parallel: false,
        }
    }
}

/// Errors returned by the shingling pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PerceptualError {
    #[error("invalid config: w must be >= 1 (got {w})")]
    InvalidConfigW { w: usize },

    #[error("invalid config version {version}; expected >= 1")]
    InvalidConfigVersion { version: u32 },

    #[error("invalid lambda {value:?}: expected a positive integer or 'inf'")]
    InvalidLambda { value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = PerceptualConfig::default();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.w, 25);
        assert_eq!(cfg.lambda, Lambda::Unbounded);
        assert_eq!(cfg.seed, 0xF00D_BAAD_F00D_BAAD);
        assert!(!cfg.use_parallel);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_builder_chain() {
        let cfg = PerceptualConfig::new()
            .with_w(3)
            .with_lambda(Lambda::bounded(16).unwrap())
            .with_seed(42)
            .with_parallel(true);
        assert_eq!(cfg.w, 3);
        assert_eq!(cfg.lambda.limit(), Some(16));
        assert_eq!(cfg.seed, 42);
        assert!(cfg.use_parallel);
    }

    #[test]
    fn validate_rejects_zero_w() {
        let cfg = PerceptualConfig::new().with_w(0);
        assert_eq!(
            cfg.validate(),
            Err(PerceptualError::InvalidConfigW { w: 0 })
        );
    }

    #[test]
    fn validate_rejects_version_zero() {
        let cfg = PerceptualConfig {
            version: 0,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(PerceptualError::InvalidConfigVersion { version: 0 })
        );
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = PerceptualConfig::new()
            .with_w(50)
            .with_lambda(Lambda::bounded(32).unwrap());
        let json = serde_json::to_string(&cfg).unwrap();
        let back: PerceptualConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn error_messages_name_the_field() {
        let err = PerceptualError::InvalidConfigW { w: 0 };
        assert!(err.to_string().contains("w must be >= 1"));
        let err = PerceptualError::InvalidLambda {
            value: "zero".into(),
        };
        assert!(err.to_string().contains("zero"));
    }
}
