//! GitHub meta cache library
//!
//! This module exposes the cache, fetch, and controller modules for use in
//! integration tests and by the `metacache` binary.

pub mod cache;
pub mod cli;
pub mod config;
pub mod controller;
pub mod fetch;
pub mod logging;
pub mod summary;
