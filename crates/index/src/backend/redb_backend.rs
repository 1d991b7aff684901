//! Redb backend: every key lives in a single table of one database file.
//!
//! Each `put` is its own committed transaction, so readers never observe
//! a half-written sketch. `batch_put` commits all entries together.
//!
//! # Configuration Example
//! ```yaml
//! store:
//!   backend: "redb"
//!   redb_path: "/data/revsim.redb"
//! ```

use crate::{IndexBackend, IndexError};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const REVSIM_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("revsim_data");

/// Persistent backend over a redb database file.
///
/// `Arc<Database>` lets the backend be shared across rayon workers; redb
/// does its own locking.
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open or create a Redb database at the given path.
    ///
    /// # Example
    /// ```no_run
    /// use index::RedbBackend;
    ///
    /// let backend = RedbBackend::open("/tmp/revsim.redb").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let db = Database::create(path).map_err(IndexError::backend)?;

        let write_txn = db.begin_write().map_err(IndexError::backend)?;
        {
            // Opening the table inside a write transaction creates it.
            let _table = write_txn
                .open_table(REVSIM_TABLE)
                .map_err(IndexError::backend)?;
        }
        write_txn.commit().map_err(IndexError::backend)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl IndexBackend for RedbBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        let write_txn = self.db.begin_write().map_err(IndexError::backend)?;
        {
            let mut table = write_txn
                .open_table(REVSIM_TABLE)
                .map_err(IndexError::backend)?;
            table.insert(key, value).map_err(IndexError::backend)?;
        }
        write_txn.commit().map_err(IndexError::backend)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let read_txn = self.db.begin_read().map_err(IndexError::backend)?;
        let table = read_txn
            .open_table(REVSIM_TABLE)
            .map_err(IndexError::backend)?;

        Ok(table
            .get(key)
            .map_err(IndexError::backend)?
            .map(|value| value.value().to_vec()))
    }

    fn delete(&self, key: &str) -> Result<(), IndexError> {
        let write_txn = self.db.begin_write().map_err(IndexError::backend)?;
        {
            let mut table = write_txn
                .open_table(REVSIM_TABLE)
                .map_err(IndexError::backend)?;
            table.remove(key).map_err(IndexError::backend)?;
        }
        write_txn.commit().map_err(IndexError::backend)?;
        Ok(())
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), IndexError> {
        let write_txn = self.db.begin_write().map_err(IndexError::backend)?;
        {
            let mut table = write_txn
                .open_table(REVSIM_TABLE)
                .map_err(IndexError::backend)?;
            for (key, value) in entries {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(IndexError::backend)?;
            }
        }
        write_txn.commit().map_err(IndexError::backend)?;
        Ok(())
    }

    fn scan_prefix(
        &self,
        prefix: &str,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let read_txn = self.db.begin_read().map_err(IndexError::backend)?;
        let table = read_txn
            .open_table(REVSIM_TABLE)
            .map_err(IndexError::backend)?;

        for item in table.range(prefix..).map_err(IndexError::backend)? {
            let (key, value) = item.map_err(IndexError::backend)?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            visitor(key, value.value())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn open() -> (NamedTempFile, RedbBackend) {
        let file = NamedTempFile::new().unwrap();
        let backend = RedbBackend::open(file.path()).unwrap();
        (file, backend)
    }

    #[test]
    fn test_redb_backend_roundtrip() {
        let (_file, backend) = open();
        backend.put("shingles/A_XX/25/lam-8/C-3", b"1\n2\n").unwrap();
        assert_eq!(
            backend.get("shingles/A_XX/25/lam-8/C-3").unwrap(),
            Some(b"1\n2\n".to_vec())
        );
        assert_eq!(backend.get("shingles/A_XX/25/lam-8/C-6").unwrap(), None);
    }

    #[test]
    fn test_redb_backend_batch_and_delete() {
        let (_file, backend) = open();
        backend
            .batch_put(vec![
                ("k1".to_string(), b"v1".to_vec()),
                ("k2".to_string(), b"v2".to_vec()),
            ])
            .unwrap();
        assert_eq!(backend.get("k2").unwrap(), Some(b"v2".to_vec()));

        backend.delete("k1").unwrap();
        assert_eq!(backend.get("k1").unwrap(), None);
    }

    #[test]
    fn test_redb_backend_scan_prefix() {
        let (_file, backend) = open();
        for key in ["a/1", "a/2", "ab/1", "b/1"] {
            backend.put(key, key.as_bytes()).unwrap();
        }

        let mut seen = Vec::new();
        backend
            .scan_prefix("a/", &mut |k, v| {
                assert_eq!(k.as_bytes(), v);
                seen.push(k.to_string());
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec!["a/1", "a/2"]);
    }

    #[test]
    fn test_redb_backend_survives_reopen() {
        let file = NamedTempFile::new().unwrap();
        {
            let backend = RedbBackend::open(file.path()).unwrap();
            backend.put("persisted", b"yes").unwrap();
        }
        let backend = RedbBackend::open(file.path()).unwrap();
        assert_eq!(backend.get("persisted").unwrap(), Some(b"yes".to_vec()));
    }
}
