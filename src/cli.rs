//! Command-line interface parsing for metacache
//!
//! This module handles parsing of CLI arguments using clap. Every option that
//! a build script is likely to set also has an environment variable fallback.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::config::WritePolicy;
use crate::fetch::gh::DEFAULT_GH_PROGRAM;
use crate::fetch::http::DEFAULT_META_URL;

/// Default maximum cache age in seconds
pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;

/// Default timeout for each fetch attempt in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// No `--cache-dir` given and no home directory to default to
    #[error("Could not determine a cache directory; pass --cache-dir or set METACACHE_DIR")]
    NoCacheDir,

    /// The `--url` value is not an absolute URL with a path
    #[error("Invalid URL: '{0}'")]
    InvalidUrl(String),

    /// A zero timeout would fail every fetch
    #[error("Timeout must be at least one second")]
    ZeroTimeout,
}

/// Cache the GitHub meta API response to avoid rate limits
#[derive(Parser, Debug)]
#[command(name = "metacache")]
#[command(about = "Cache the GitHub /meta API response on disk to avoid rate limits")]
#[command(version)]
pub struct Cli {
    /// Directory holding meta.json and meta-timestamp.txt
    ///
    /// Defaults to the platform cache directory (~/.cache/github-meta on Linux).
    #[arg(long, env = "METACACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Reuse cached data up to this many seconds old
    #[arg(
        long,
        env = "METACACHE_MAX_AGE",
        value_name = "SECONDS",
        default_value_t = DEFAULT_MAX_AGE_SECS
    )]
    pub max_age: u64,

    /// Token sent as `Authorization: token <value>` on the HTTP path
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Endpoint to fetch
    #[arg(long, value_name = "URL", default_value = DEFAULT_META_URL)]
    pub url: String,

    /// Timeout for each fetch attempt
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Whether a fetched body is checked before or after it is written
    #[arg(long, value_enum, default_value_t = WritePolicy::ValidateFirst)]
    pub write_policy: WritePolicy,

    /// Skip the GitHub CLI and go straight to HTTP
    #[arg(long)]
    pub no_gh: bool,

    /// GitHub CLI executable
    #[arg(long, value_name = "PROGRAM", default_value = DEFAULT_GH_PROGRAM)]
    pub gh_bin: String,

    /// Fetch even if the cache is fresh
    #[arg(long)]
    pub force: bool,
}
