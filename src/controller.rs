//! Cache refresh controller
//!
//! Runs the whole decision tree once: reuse a fresh cache, otherwise walk the
//! fetchers in priority order, otherwise fall back to whatever payload is
//! already on disk.

use std::process::ExitCode;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{CacheManager, Freshness, PayloadStore, StoreError, TimestampStore};
use crate::config::{Config, WritePolicy};
use crate::fetch::{check_rate_limit, FetchError, Fetcher, GhCliFetcher, HttpFetcher};
use crate::summary::{count_action_domains, SummaryError};

/// Errors that abort a run before the fetch chain
#[derive(Debug, Error)]
pub enum RunError {
    /// The cache directory is unusable
    #[error(transparent)]
    Cache(#[from] StoreError),

    /// A fetcher could not be constructed
    #[error("Failed to set up fetcher: {0}")]
    Fetcher(#[from] FetchError),

    /// The configuration is inconsistent
    #[error(transparent)]
    Config(#[from] crate::cli::CliError),
}

/// How a run ended
#[derive(Debug)]
pub enum Outcome {
    /// The cache was fresh; nothing was fetched
    Fresh { age: i64 },
    /// A fetcher succeeded and its body was committed
    Fetched {
        source: String,
        action_domains: Result<usize, SummaryError>,
    },
    /// Every fetcher failed, an older payload is still on disk
    Stale,
    /// Every fetcher failed and there is nothing cached
    Failed,
}

impl Outcome {
    /// Process exit status: 0 unless nothing usable is cached
    pub fn code(&self) -> u8 {
        match self {
            Outcome::Fresh { .. } | Outcome::Fetched { .. } | Outcome::Stale => 0,
            Outcome::Failed => 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

/// Current time in epoch seconds
pub type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

fn system_clock() -> i64 {
    Utc::now().timestamp()
}

/// Drives one refresh over a cache and an ordered list of fetchers
pub struct RefreshController<P, T> {
    cache: CacheManager<P, T>,
    fetchers: Vec<Box<dyn Fetcher>>,
    max_age: u64,
    write_policy: WritePolicy,
    force: bool,
    clock: Clock,
}

impl<P: PayloadStore, T: TimestampStore> RefreshController<P, T> {
    /// Creates a controller; fetchers are tried in the order given
    pub fn new(
        cache: CacheManager<P, T>,
        fetchers: Vec<Box<dyn Fetcher>>,
        max_age: u64,
    ) -> Self {
        Self {
            cache,
            fetchers,
            max_age,
            write_policy: WritePolicy::default(),
            force: false,
            clock: Box::new(system_clock),
        }
    }

    pub fn with_write_policy(mut self, write_policy: WritePolicy) -> Self {
        self.write_policy = write_policy;
        self
    }

    /// Skip the freshness check and always fetch
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Runs the validity check, the fetch chain and the stale fallback
    pub async fn run(&self) -> Outcome {
        if self.force {
            println!("Refresh forced, ignoring cache age");
        } else {
            match self.cache.freshness((self.clock)(), self.max_age) {
                Freshness::Fresh { age } => {
                    println!(
                        "Using cached GitHub meta data ({age}s old, max {}s)",
                        self.max_age
                    );
                    return Outcome::Fresh { age };
                }
                Freshness::Expired { age } => {
                    println!("Cached data is {age}s old, refreshing");
                }
                Freshness::Missing => {
                    println!("No valid cache found, fetching");
                }
            }
        }

        // Write-through can leave this run's rejected body on disk; only a
        // payload from an earlier run counts for the stale fallback
        let had_payload = self.cache.has_payload();

        for fetcher in &self.fetchers {
            let name = fetcher.name();
            match self.attempt(fetcher.as_ref()).await {
                Ok(()) => {
                    println!("Fetched GitHub meta data via {name}");
                    let action_domains = self.summarize();
                    return Outcome::Fetched {
                        source: name.to_string(),
                        action_domains,
                    };
                }
                Err(FetchError::RateLimited) => {
                    warn!(fetcher = name, "response was rate limited");
                    println!("Warning: {name} fetch hit the API rate limit");
                }
                Err(e) => {
                    warn!(fetcher = name, error = %e, "fetch failed");
                    println!("{name} fetch failed: {e}");
                }
            }
        }

        if had_payload {
            println!(
                "Warning: all fetch attempts failed, using existing cached data (may be stale or corrupt)"
            );
            Outcome::Stale
        } else {
            eprintln!("Error: all fetch attempts failed and no cached data is available");
            Outcome::Failed
        }
    }

    /// One fetcher, end to end: availability, fetch, rate-limit check, commit
    async fn attempt(&self, fetcher: &dyn Fetcher) -> Result<(), FetchError> {
        if !fetcher.is_available().await {
            return Err(FetchError::NotAuthenticated(fetcher.name().to_string()));
        }

        let body = fetcher.fetch().await?;
        debug!(fetcher = fetcher.name(), bytes = body.len(), "fetched body");

        // Applied to every fetcher, gh included, not only the HTTP path
        match self.write_policy {
            WritePolicy::ValidateFirst => {
                check_rate_limit(&body)?;
                self.cache.commit(&body, (self.clock)())?;
            }
            WritePolicy::WriteThrough => {
                self.cache.write_payload(&body)?;
                check_rate_limit(&body)?;
                self.cache.write_timestamp((self.clock)())?;
            }
        }

        Ok(())
    }

    /// Prints the action domain count of the committed payload
    fn summarize(&self) -> Result<usize, SummaryError> {
        let result = match self.cache.read_payload() {
            Ok(Some(body)) => count_action_domains(&body),
            Ok(None) => Err(SummaryError::MissingField("payload".to_string())),
            Err(e) => Err(SummaryError::Unreadable(e)),
        };

        match &result {
            Ok(count) => println!("Actions domains: {count}"),
            Err(e) => {
                info!(error = %e, "summary extraction failed");
                println!("Fetched data saved, but parsing the summary failed: {e}");
            }
        }
        result
    }
}

/// Builds the fetch chain for `config`: `gh` first (unless disabled), then HTTP
pub fn build_fetchers(config: &Config) -> Result<Vec<Box<dyn Fetcher>>, RunError> {
    let mut fetchers: Vec<Box<dyn Fetcher>> = Vec::with_capacity(2);

    if config.use_gh {
        fetchers.push(Box::new(
            GhCliFetcher::new(config.gh_endpoint()?, config.timeout)
                .with_program(config.gh_program.clone()),
        ));
    }

    fetchers.push(Box::new(HttpFetcher::new(
        config.url.clone(),
        config.token.clone(),
        config.timeout,
    )?));

    Ok(fetchers)
}

/// Opens the cache directory and runs one refresh with the real fetchers
pub async fn run(config: &Config) -> Result<Outcome, RunError> {
    let cache = CacheManager::open(&config.cache_dir)?;
    let fetchers = build_fetchers(config)?;

    let controller = RefreshController::new(cache, fetchers, config.max_age)
        .with_write_policy(config.write_policy)
        .with_force(config.force);

    Ok(controller.run().await)
}
