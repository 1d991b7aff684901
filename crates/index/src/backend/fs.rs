//! Plain-file backend: one `<key>.txt` per key under a root directory.
//!
//! Writes go to a temp file in the destination directory and are renamed
//! into place, so a reader sees the old value or the new one, never a torn
//! file. An interrupted run leaves at most stray temp files, which scans
//! ignore.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::{IndexBackend, IndexError};

const EXTENSION: &str = "txt";

/// Filesystem-backed key-value store.
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// Fails if the root cannot be created, which callers treat as a fatal
    /// storage fault.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, IndexError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            IndexError::backend(format!("cannot create store root {}: {e}", root.display()))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to its file, rejecting keys that could escape the root.
    fn path_for(&self, key: &str) -> Result<PathBuf, IndexError> {
        let mut path = self.root.clone();
        let mut segments = key.split('/').peekable();
        while let Some(segment) = segments.next() {
            if segment.is_empty()
                || segment == "."
                || segment == ".."
                || segment.contains(['\\', '\0'])
            {
                return Err(IndexError::InvalidKey(key.to_string()));
            }
            if segments.peek().is_some() {
                path.push(segment);
            } else {
                path.push(format!("{segment}.{EXTENSION}"));
            }
        }
        Ok(path)
    }

    fn collect_keys(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) -> Result<(), IndexError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                self.collect_keys(&path, prefix, out)?;
            } else if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                if let Some(key) = self.key_for(&path) {
                    if key.starts_with(prefix) {
                        out.push(key);
                    }
                }
            }
        }
        Ok(())
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?.with_extension("");
        let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
        Some(parts?.join("/"))
    }
}

impl IndexBackend for FsBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        let path = self.path_for(key)?;
        let parent = path
            .parent()
            .ok_or_else(|| IndexError::InvalidKey(key.to_string()))?;
        fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(value)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| IndexError::from(e.error))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &str) -> Result<(), IndexError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), IndexError> {
        // Each file is atomic on its own; the batch as a whole is not.
        for (key, value) in entries {
            self.put(&key, &value)?;
        }
        Ok(())
    }

    fn scan_prefix(
        &self,
        prefix: &str,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        // Only the directory holding the prefix needs walking.
        let mut dir = self.root.clone();
        if let Some((dirs, _)) = prefix.rsplit_once('/') {
            for segment in dirs.split('/').filter(|s| !s.is_empty()) {
                if segment == ".." {
                    return Err(IndexError::InvalidKey(prefix.to_string()));
                }
                dir.push(segment);
            }
        }

        let mut keys = Vec::new();
        self.collect_keys(&dir, prefix, &mut keys)?;
        keys.sort();

        for key in keys {
            let path = self.path_for(&key)?;
            match fs::read(&path) {
                Ok(bytes) => visitor(&key, &bytes)?,
                // Deleted between listing and reading.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
