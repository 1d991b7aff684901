//! Configuration for the tokenizer.
//!
//! The `version` field tracks tokenizer behavior. Any change that can alter
//! the token stream for a given input (even a bug fix) must bump it, because
//! persisted sketches are only comparable when produced by the same version.
//!
//! ```rust
//! use canonical::CanonicalizeConfig;
//!
//! let config = CanonicalizeConfig::default();
//! assert_eq!(config.version, 1);
//! assert!(config.lowercase);
//! assert!(config.strip_punctuation);
//! assert!(!config.normalize_unicode);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CanonicalError;

/// Tokenizer settings.
///
/// Cheap to clone and serde-friendly so it can be embedded in the
/// top-level YAML configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalizeConfig {
    /// Behavior version. Must be >= 1; 0 is reserved.
    pub version: u32,

    /// Apply Unicode NFKC normalization before splitting.
    ///
    /// Off by default: the revision corpora are plain UTF-8 dumps and only
    /// basic normalization is wanted. Turning it on merges compatibility
    /// forms (`"ﬁ"` → `"fi"`, composed vs. decomposed accents).
    pub normalize_unicode: bool,

    /// Treat Unicode punctuation as a delimiter and drop it.
    ///
    /// ```text
    /// "Hello, world!" → ["hello", "world"]
    /// "it's"          → ["it", "s"]
    /// ```
    pub strip_punctuation: bool,

    /// Apply locale-free Unicode lowercasing.
    pub lowercase: bool,
}

impl CanonicalizeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strip_punctuation(mut self, strip: bool) -> Self {
        self.strip_punctuation = strip;
        self
    }

    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    pub fn with_normalize_unicode(mut self, normalize: bool) -> Self {
        self.normalize_unicode = normalize;
        self
    }

    /// Reject reserved or nonsensical settings.
    pub fn validate(&self) -> Result<(), CanonicalError> {
        if self.version == 0 {
            return Err(CanonicalError::InvalidConfig(
                "config version must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CanonicalizeConfig {
    fn default() -> Self {
        Self {
            version: 1,
            normalize_unicode: false,
            strip_punctuation: true,
            lowercase: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CanonicalizeConfig::default().validate().is_ok());
    }

    #[test]
    fn version_zero_rejected() {
        let cfg = CanonicalizeConfig {
            version: 0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(CanonicalError::InvalidConfig(_))
        ));
    }

    #[test]
    fn builder_methods_set_fields() {
        let cfg = CanonicalizeConfig::new()
            .with_strip_punctuation(false)
            .with_lowercase(false)
            .with_normalize_unicode(true);
        assert!(!cfg.strip_punctuation);
        assert!(!cfg.lowercase);
        assert!(cfg.normalize_unicode);
    }

    #[test]
    fn serde_roundtrip_preserves_flags() {
        let cfg = CanonicalizeConfig::default().with_normalize_unicode(true);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: CanonicalizeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
