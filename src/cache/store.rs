//! Payload and timestamp stores
//!
//! File-backed stores replace their target atomically (temp file + rename) so
//! a reader never sees a half-written payload or timestamp. In-memory stores
//! share their contents between clones, which lets tests inspect the state a
//! controller left behind.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors that can occur when reading or writing a cache file
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing a cache file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The cache directory could not be created
    #[error("Failed to create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The timestamp file does not hold a decimal integer
    #[error("Invalid timestamp {value:?} in {path}")]
    InvalidTimestamp { path: PathBuf, value: String },
}

/// Storage for the raw response body
pub trait PayloadStore {
    /// Whether a payload has ever been written
    fn exists(&self) -> bool;

    /// Reads the payload, `Ok(None)` if there is none
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replaces the payload
    fn write(&self, body: &[u8]) -> Result<(), StoreError>;
}

/// Storage for the epoch-seconds timestamp of the last successful fetch
pub trait TimestampStore {
    /// Reads the timestamp, `Ok(None)` if there is none
    fn read(&self) -> Result<Option<i64>, StoreError>;

    /// Replaces the timestamp
    fn write(&self, epoch_secs: i64) -> Result<(), StoreError>;
}

/// Writes `bytes` to a sibling temp file and renames it over `path`
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let io_err = |source: io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Reads a file, mapping "not found" to `None`
fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Payload stored as a plain file
#[derive(Debug, Clone)]
pub struct FilePayloadStore {
    path: PathBuf,
}

impl FilePayloadStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl PayloadStore for FilePayloadStore {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        read_optional(&self.path)
    }

    fn write(&self, body: &[u8]) -> Result<(), StoreError> {
        write_atomic(&self.path, body)
    }
}

/// Timestamp stored as decimal text with no trailing newline
#[derive(Debug, Clone)]
pub struct FileTimestampStore {
    path: PathBuf,
}

impl FileTimestampStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TimestampStore for FileTimestampStore {
    fn read(&self) -> Result<Option<i64>, StoreError> {
        let Some(bytes) = read_optional(&self.path)? else {
            return Ok(None);
        };

        let text = String::from_utf8_lossy(&bytes);
        let value = text.trim();
        value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| StoreError::InvalidTimestamp {
                path: self.path.clone(),
                value: value.to_string(),
            })
    }

    fn write(&self, epoch_secs: i64) -> Result<(), StoreError> {
        write_atomic(&self.path, epoch_secs.to_string().as_bytes())
    }
}

/// Simulated write failure used by the in-memory stores
fn injected_failure(name: &str) -> StoreError {
    StoreError::Io {
        path: PathBuf::from(name),
        source: io::Error::new(io::ErrorKind::PermissionDenied, "write disabled"),
    }
}

/// In-memory payload store; clones share the same contents
#[derive(Debug, Clone, Default)]
pub struct MemoryPayloadStore {
    body: Arc<Mutex<Option<Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryPayloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `body`
    pub fn with_body(body: impl Into<Vec<u8>>) -> Self {
        let store = Self::default();
        *store.lock() = Some(body.into());
        store
    }

    /// Makes every subsequent write fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current contents
    pub fn get(&self) -> Option<Vec<u8>> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Vec<u8>>> {
        self.body
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PayloadStore for MemoryPayloadStore {
    fn exists(&self) -> bool {
        self.lock().is_some()
    }

    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get())
    }

    fn write(&self, body: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected_failure("memory:payload"));
        }
        *self.lock() = Some(body.to_vec());
        Ok(())
    }
}

/// In-memory timestamp store; clones share the same value
#[derive(Debug, Clone, Default)]
pub struct MemoryTimestampStore {
    value: Arc<Mutex<Option<i64>>>,
}

impl MemoryTimestampStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(epoch_secs: i64) -> Self {
        let store = Self::default();
        *store.lock() = Some(epoch_secs);
        store
    }

    pub fn get(&self) -> Option<i64> {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<i64>> {
        self.value
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TimestampStore for MemoryTimestampStore {
    fn read(&self) -> Result<Option<i64>, StoreError> {
        Ok(self.get())
    }

    fn write(&self, epoch_secs: i64) -> Result<(), StoreError> {
        *self.lock() = Some(epoch_secs);
        Ok(())
    }
}
