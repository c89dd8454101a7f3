//! Cache manager for the payload/timestamp pair
//!
//! Provides a `CacheManager` that decides whether the cached payload is fresh
//! enough to reuse and commits fetched bodies in the order payload first,
//! timestamp second, so an interrupted commit never looks fresh.

use std::fs;
use std::path::Path;

use directories::ProjectDirs;
use tracing::{debug, warn};

use super::store::{FilePayloadStore, FileTimestampStore, PayloadStore, StoreError, TimestampStore};

/// File name of the cached response body
pub const PAYLOAD_FILE: &str = "meta.json";

/// File name of the epoch-seconds timestamp
pub const TIMESTAMP_FILE: &str = "meta-timestamp.txt";

/// Result of comparing the cache timestamp against the max age
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Both files exist and `age <= max_age`
    Fresh { age: i64 },
    /// Both files exist but the timestamp is too old
    Expired { age: i64 },
    /// Payload or timestamp missing (or the timestamp is unreadable)
    Missing,
}

/// Owns the payload and timestamp stores
///
/// The file-backed variant lives in `~/.cache/github-meta/` on Linux, or the
/// equivalent platform cache directory elsewhere.
#[derive(Debug, Clone)]
pub struct CacheManager<P, T> {
    payload: P,
    timestamp: T,
}

impl CacheManager<FilePayloadStore, FileTimestampStore> {
    /// Returns the platform cache directory for this tool
    ///
    /// Returns `None` if no home directory can be determined.
    pub fn default_dir() -> Option<std::path::PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "github-meta")?;
        Some(project_dirs.cache_dir().to_path_buf())
    }

    /// Creates the cache directory if needed and opens the two files in it
    pub fn open(cache_dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(cache_dir).map_err(|source| StoreError::CreateDir {
            path: cache_dir.to_path_buf(),
            source,
        })?;
        debug!(dir = %cache_dir.display(), "cache directory ready");

        Ok(Self::new(
            FilePayloadStore::new(cache_dir.join(PAYLOAD_FILE)),
            FileTimestampStore::new(cache_dir.join(TIMESTAMP_FILE)),
        ))
    }
}

impl<P: PayloadStore, T: TimestampStore> CacheManager<P, T> {
    pub fn new(payload: P, timestamp: T) -> Self {
        Self { payload, timestamp }
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn timestamp(&self) -> &T {
        &self.timestamp
    }

    /// Checks whether the cache can be reused at `now`
    ///
    /// The boundary is inclusive: an entry exactly `max_age` seconds old is
    /// still fresh. A timestamp in the future counts as fresh.
    pub fn freshness(&self, now: i64, max_age: u64) -> Freshness {
        if !self.payload.exists() {
            return Freshness::Missing;
        }

        let cached_at = match self.timestamp.read() {
            Ok(Some(ts)) => ts,
            Ok(None) => return Freshness::Missing,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable cache timestamp");
                return Freshness::Missing;
            }
        };

        let age = now.saturating_sub(cached_at);
        if age <= i64::try_from(max_age).unwrap_or(i64::MAX) {
            Freshness::Fresh { age }
        } else {
            Freshness::Expired { age }
        }
    }

    /// Whether any payload exists, fresh or not
    pub fn has_payload(&self) -> bool {
        self.payload.exists()
    }

    pub fn read_payload(&self) -> Result<Option<Vec<u8>>, StoreError> {
        self.payload.read()
    }

    pub fn write_payload(&self, body: &[u8]) -> Result<(), StoreError> {
        self.payload.write(body)
    }

    pub fn write_timestamp(&self, now: i64) -> Result<(), StoreError> {
        self.timestamp.write(now)
    }

    /// Writes the payload, then the timestamp
    pub fn commit(&self, body: &[u8], now: i64) -> Result<(), StoreError> {
        self.write_payload(body)?;
        self.write_timestamp(now)
    }
}
