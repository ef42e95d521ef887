//! Key-addressed blob storage backing the favorites sets.
//!
//! Stores deal in raw strings; encoding is the caller's concern. All
//! operations are synchronous so a read-modify-write never spans a
//! suspension point.

use std::{
    collections::HashMap,
    fmt::Debug,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::error::StorageError;

pub trait BlobStore: Send + Sync + Debug {
    /// Read the blob stored under `key`. `Ok(None)` when absent.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the blob stored under `key`.
    fn write(&self, key: &str, blob: &str) -> Result<(), StorageError>;
}

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

impl BlobStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(blob) => Ok(Some(blob)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read { key: key.to_string(), source }),
        }
    }

    fn write(&self, key: &str, blob: &str) -> Result<(), StorageError> {
        let write_err = |source| StorageError::Write { key: key.to_string(), source };

        fs::create_dir_all(&self.dir).map_err(write_err)?;

        // Write-then-rename keeps the previous blob intact if we die mid-write.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, blob).map_err(write_err)?;
        fs::rename(&tmp, &path).map_err(write_err)?;

        tracing::debug!(key, path = %path.display(), bytes = blob.len(), "blob written");
        Ok(())
    }
}

/// Shared in-memory store. Clones see the same contents, which lets tests
/// simulate a reload by building fresh sets over the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a raw blob, bypassing any encoding.
    pub fn insert_raw(&self, key: &str, blob: &str) {
        self.blobs.lock().insert(key.to_string(), blob.to_string());
    }

    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.blobs.lock().get(key).cloned()
    }
}

impl BlobStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get_raw(key))
    }

    fn write(&self, key: &str, blob: &str) -> Result<(), StorageError> {
        self.insert_raw(key, blob);
        Ok(())
    }
}
