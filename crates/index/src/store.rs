use std::fmt::Write as _;
use std::sync::Arc;

use perceptual::{Lambda, Sketch};
use tracing::debug;

use crate::{check_component, IndexBackend, IndexError};

const SHINGLE_NAMESPACE: &str = "shingles";

/// Identity of one persisted sketch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SketchKey {
    pub entity: String,
    pub revision: u32,
    pub w: usize,
    pub lambda: Lambda,
}

impl SketchKey {
    pub fn new(entity: impl Into<String>, revision: u32, w: usize, lambda: Lambda) -> Self {
        Self {
            entity: entity.into(),
            revision,
            w,
            lambda,
        }
    }

    /// Backend key: `shingles/<entity>/<w>/lam-<λ>/C-<revision>`.
    pub fn storage_key(&self) -> Result<String, IndexError> {
        check_component(&self.entity)?;
        Ok(format!(
            "{SHINGLE_NAMESPACE}/{}/{}/lam-{}/C-{}",
            self.entity, self.w, self.lambda, self.revision
        ))
    }
}

/// Serialize a sketch: ascending decimal values, one per `\n`-terminated line.
///
/// An empty sketch encodes to zero bytes. The output depends only on the
/// sketch contents, so rewriting the same sketch rewrites the same bytes.
pub fn encode_sketch(sketch: &Sketch) -> Vec<u8> {
    let mut out = String::with_capacity(sketch.len() * 21);
    for value in sketch.values() {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{value}");
    }
    out.into_bytes()
}

/// Parse bytes produced by [`encode_sketch`].
///
/// Blank lines and a trailing `\r` are tolerated. Values are re-sorted and
/// deduplicated so hand-edited files still yield a valid sketch.
pub fn decode_sketch(bytes: &[u8]) -> Result<Sketch, IndexError> {
    let text = std::str::from_utf8(bytes).map_err(|e| IndexError::Decode(e.to_string()))?;
    let mut values = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let value = line.parse::<u64>().map_err(|e| {
            IndexError::Decode(format!("line {}: {line:?}: {e}", lineno + 1))
        })?;
        values.push(value);
    }
    Ok(Sketch::from_values(values))
}

/// Persistent map from [`SketchKey`] to [`Sketch`].
#[derive(Clone)]
pub struct ShingleStore {
    backend: Arc<dyn IndexBackend>,
}

impl ShingleStore {
    pub fn new(backend: Arc<dyn IndexBackend>) -> Self {
        Self { backend }
    }

    /// Store `sketch`, replacing any previous value for `key`.
    pub fn put(&self, key: &SketchKey, sketch: &Sketch) -> Result<(), IndexError> {
        let storage_key = key.storage_key()?;
        self.backend.put(&storage_key, &encode_sketch(sketch))?;
        debug!(
            key = %storage_key,
            values = sketch.len(),
            "sketch_stored"
        );
        Ok(())
    }

    /// Store several sketches; each one is still written atomically.
    pub fn put_all(&self, items: &[(SketchKey, Sketch)]) -> Result<(), IndexError> {
        let mut entries = Vec::with_capacity(items.len());
        for (key, sketch) in items {
            entries.push((key.storage_key()?, encode_sketch(sketch)));
        }
        self.backend.batch_put(entries)
    }

    /// Load the sketch for `key`, or [`IndexError::NotFound`].
    pub fn get(&self, key: &SketchKey) -> Result<Sketch, IndexError> {
        let storage_key = key.storage_key()?;
        match self.backend.get(&storage_key)? {
            Some(bytes) => decode_sketch(&bytes),
            None => Err(IndexError::NotFound { key: storage_key }),
        }
    }

    pub fn contains(&self, key: &SketchKey) -> Result<bool, IndexError> {
        Ok(self.backend.get(&key.storage_key()?)?.is_some())
    }

    pub fn flush(&self) -> Result<(), IndexError> {
        self.backend.flush()
    }
}
