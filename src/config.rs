//! Run configuration resolved from CLI arguments and the environment

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use reqwest::Url;

use crate::cache::CacheManager;
use crate::cli::{Cli, CliError};

/// Order of the rate-limit check relative to the payload write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum WritePolicy {
    /// Check the body first; a rate-limited body never reaches disk
    #[default]
    ValidateFirst,
    /// Write the body, then check it; a rate-limited body replaces the payload
    WriteThrough,
}

/// Everything a run needs to know
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the payload and timestamp files
    pub cache_dir: PathBuf,
    /// Maximum age in seconds before the cache is refreshed
    pub max_age: u64,
    /// Token for the HTTP path; blank values become `None`
    pub token: Option<String>,
    /// Endpoint fetched over HTTP
    pub url: String,
    /// Upper bound for each fetch attempt
    pub timeout: Duration,
    /// Whether bodies are checked before or after they are written
    pub write_policy: WritePolicy,
    /// Whether to try the GitHub CLI before HTTP
    pub use_gh: bool,
    /// GitHub CLI executable
    pub gh_program: String,
    /// Fetch even when the cache is fresh
    pub force: bool,
}

impl Config {
    /// Creates a Config from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(Config)` with defaults filled in
    /// * `Err(CliError)` if no cache directory can be determined or a value is invalid
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let cache_dir = match &cli.cache_dir {
            Some(dir) => dir.clone(),
            None => CacheManager::default_dir().ok_or(CliError::NoCacheDir)?,
        };

        if cli.timeout == 0 {
            return Err(CliError::ZeroTimeout);
        }

        // Validate early so a typo fails before any fetch
        gh_endpoint(&cli.url)?;

        Ok(Config {
            cache_dir,
            max_age: cli.max_age,
            token: cli
                .token
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            url: cli.url.clone(),
            timeout: Duration::from_secs(cli.timeout),
            write_policy: cli.write_policy,
            use_gh: !cli.no_gh,
            gh_program: cli.gh_bin.clone(),
            force: cli.force,
        })
    }

    /// Endpoint argument for `gh api`, derived from the URL path
    pub fn gh_endpoint(&self) -> Result<String, CliError> {
        gh_endpoint(&self.url)
    }
}

/// `https://api.github.com/meta` becomes `meta`
fn gh_endpoint(url: &str) -> Result<String, CliError> {
    let parsed = Url::parse(url).map_err(|_| CliError::InvalidUrl(url.to_string()))?;
    let path = parsed.path().trim_start_matches('/');
    if path.is_empty() {
        return Err(CliError::InvalidUrl(url.to_string()));
    }

    Ok(match parsed.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    })
}
