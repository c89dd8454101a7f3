//! Cache module for storing the API response to disk
//!
//! The cache is two flat files in a dedicated directory: the raw payload
//! (`meta.json`) and the epoch-seconds timestamp of the last successful fetch
//! (`meta-timestamp.txt`). Both are reached through small store traits so the
//! controller can run against in-memory stores in tests.

mod manager;
mod store;

pub use manager::{CacheManager, Freshness, PAYLOAD_FILE, TIMESTAMP_FILE};
pub use store::{
    FilePayloadStore, FileTimestampStore, MemoryPayloadStore, MemoryTimestampStore, PayloadStore,
    StoreError, TimestampStore,
};
