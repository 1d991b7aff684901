//! # revsim index
//!
//! Keyed persistence for revision sketches and Jaccard results.
//!
//! Two stores sit on one [`IndexBackend`]:
//!
//! - [`ShingleStore`] keeps one [`perceptual::Sketch`] per
//!   `(entity, revision, W, λ)` under `shingles/<entity>/<w>/lam-<λ>/C-<rev>`.
//! - [`ResultStore`] keeps one [`JaccardRecord`] per
//!   `(entity, revision, W, λ)` under `jaccard/<w>/lam-<λ>/<entity>/C-<rev>`.
//!
//! Every write replaces the previous value as a whole. Backends guarantee
//! that a reader sees either the old bytes or the new ones.
//!
//! ## Backends
//!
//! - [`InMemoryBackend`]: an ordered map behind a `RwLock`, for tests.
//! - [`FsBackend`]: one `.txt` file per key, written via temp file + rename.
//! - `RedbBackend`: single-file embedded database (feature `backend-redb`).
//!
//! ```
//! use std::sync::Arc;
//! use index::{BackendConfig, ShingleStore, SketchKey};
//! use perceptual::{Lambda, Sketch};
//!
//! let backend = BackendConfig::in_memory().build().unwrap();
//! let store = ShingleStore::new(Arc::from(backend));
//!
//! let key = SketchKey::new("Detroit_MI", 3, 25, Lambda::Unbounded);
//! store.put(&key, &Sketch::from_values(vec![9, 4, 7])).unwrap();
//! assert_eq!(store.get(&key).unwrap().values(), &[4, 7, 9]);
//! ```

mod backend;
mod results;
mod store;

pub use backend::{BackendConfig, FsBackend, InMemoryBackend, IndexBackend};
#[cfg(feature = "backend-redb")]
pub use backend::RedbBackend;
pub use results::{JaccardRecord, ResultStore, CSV_HEADER};
pub use store::{decode_sketch, encode_sketch, ShingleStore, SketchKey};

use thiserror::Error;

/// Bump this value whenever the persisted record layout changes.
pub const INDEX_SCHEMA_VERSION: u16 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("no value stored under {key}")]
    NotFound { key: String },
    #[error("serialization encode error: {0}")]
    Encode(String),
    #[error("serialization decode error: {0}")]
    Decode(String),
    #[error("invalid key: {0:?}")]
    InvalidKey(String),
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Io(e.to_string())
    }
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    /// `true` for a missing value, the only recoverable store error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, IndexError::NotFound { .. })
    }
}

/// Validate one `/`-separated component of a composite key.
pub(crate) fn check_component(component: &str) -> Result<(), IndexError> {
    if component.is_empty()
        || component == "."
        || component == ".."
        || component.contains(['/', '\\', '\0'])
    {
        return Err(IndexError::InvalidKey(component.to_string()));
    }
    Ok(())
}
