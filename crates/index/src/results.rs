use std::io::Write;
use std::sync::Arc;

use perceptual::{Lambda, Similarity};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{check_component, IndexBackend, IndexError, INDEX_SCHEMA_VERSION};

const RESULT_NAMESPACE: &str = "jaccard";

/// Header row written by [`ResultStore::write_csv`].
pub const CSV_HEADER: &str = "entity,w,lambda,revision,jaccard";

/// Jaccard similarity between a baseline revision and one later revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JaccardRecord {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub entity: String,
    pub baseline_revision: u32,
    pub revision: u32,
    pub w: usize,
    pub lambda: Lambda,
    /// `null` on disk when both sketches were empty.
    pub similarity: Similarity,
}

const fn default_schema_version() -> u16 {
    INDEX_SCHEMA_VERSION
}

impl JaccardRecord {
    pub fn new(
        entity: impl Into<String>,
        baseline_revision: u32,
        revision: u32,
        w: usize,
        lambda: Lambda,
        similarity: Similarity,
    ) -> Self {
        Self {
            schema_version: INDEX_SCHEMA_VERSION,
            entity: entity.into(),
            baseline_revision,
            revision,
            w,
            lambda,
            similarity,
        }
    }

    /// Backend key: `jaccard/<w>/lam-<λ>/<entity>/C-<revision>`.
    pub fn storage_key(&self) -> Result<String, IndexError> {
        check_component(&self.entity)?;
        Ok(format!(
            "{}{}/C-{}",
            partition_prefix(self.w, self.lambda),
            self.entity,
            self.revision
        ))
    }
}

fn partition_prefix(w: usize, lambda: Lambda) -> String {
    format!("{RESULT_NAMESPACE}/{w}/lam-{lambda}/")
}

/// Persistent collection of [`JaccardRecord`]s, partitioned by `(W, λ)`.
#[derive(Clone)]
pub struct ResultStore {
    backend: Arc<dyn IndexBackend>,
}

impl ResultStore {
    pub fn new(backend: Arc<dyn IndexBackend>) -> Self {
        Self { backend }
    }

    /// Store `record`, replacing any earlier record for the same
    /// `(entity, revision, W, λ)`.
    pub fn append(&self, record: &JaccardRecord) -> Result<(), IndexError> {
        let key = record.storage_key()?;
        let payload = serde_json::to_vec(record).map_err(|e| IndexError::Encode(e.to_string()))?;
        self.backend.put(&key, &payload)?;
        debug!(key = %key, similarity = %record.similarity, "jaccard_record_stored");
        Ok(())
    }

    /// All records for one `(W, λ)`, ordered by entity then revision.
    pub fn records(&self, w: usize, lambda: Lambda) -> Result<Vec<JaccardRecord>, IndexError> {
        let mut out = Vec::new();
        self.backend
            .scan_prefix(&partition_prefix(w, lambda), &mut |key, bytes| {
                let record: JaccardRecord = serde_json::from_slice(bytes)
                    .map_err(|e| IndexError::Decode(format!("{key}: {e}")))?;
                out.push(record);
                Ok(())
            })?;
        // Backend order is lexicographic; C-12 would sort before C-3.
        out.sort_by(|a, b| {
            a.entity
                .cmp(&b.entity)
                .then_with(|| a.revision.cmp(&b.revision))
        });
        Ok(out)
    }

    /// Export one partition as CSV. Returns the number of data rows.
    pub fn write_csv<O: Write>(
        &self,
        w: usize,
        lambda: Lambda,
        mut writer: O,
    ) -> Result<usize, IndexError> {
        let records = self.records(w, lambda)?;
        writeln!(writer, "{CSV_HEADER}")?;
        for record in &records {
            writeln!(
                writer,
                "{},{},{},{},{}",
                csv_field(&record.entity),
                record.w,
                record.lambda,
                record.revision,
                record.similarity
            )?;
        }
        writer.flush()?;
        Ok(records.len())
    }

    pub fn flush(&self) -> Result<(), IndexError> {
        self.backend.flush()
    }
}

pub(crate) fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
