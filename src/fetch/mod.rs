//! Fetch strategies for the GitHub meta endpoint
//!
//! Each strategy implements [`Fetcher`]; the controller walks them in priority
//! order and stops at the first body it can commit.

pub mod gh;
pub mod http;

pub use gh::GhCliFetcher;
pub use http::HttpFetcher;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::cache::StoreError;

/// Substring GitHub puts in the body of a rate-limited response
pub const RATE_LIMIT_MARKER: &str = "API rate limit exceeded";

/// Errors that can occur on a single fetch path
#[derive(Debug, Error)]
pub enum FetchError {
    /// The tool is not installed or not logged in
    #[error("{0} is not authenticated")]
    NotAuthenticated(String),

    /// The external program could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The external program exited with a failure status
    #[error("{program} exited with {}: {stderr}", describe_exit(.code))]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// No answer within the configured timeout
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body carries the rate-limit marker
    #[error("API rate limit exceeded")]
    RateLimited,

    /// The fetched body could not be stored
    #[error("Failed to store response: {0}")]
    Store(#[from] StoreError),
}

/// A way of retrieving the raw response body
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Short name used in status lines
    fn name(&self) -> &str;

    /// Whether this path can be attempted at all (e.g. the tool is logged in)
    async fn is_available(&self) -> bool;

    /// Retrieves the raw response body
    async fn fetch(&self) -> Result<Vec<u8>, FetchError>;
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

/// Returns true if the body carries the rate-limit marker
pub fn is_rate_limited(body: &[u8]) -> bool {
    let marker = RATE_LIMIT_MARKER.as_bytes();
    body.windows(marker.len()).any(|window| window == marker)
}

/// Fails with [`FetchError::RateLimited`] if the body carries the marker
pub fn check_rate_limit(body: &[u8]) -> Result<(), FetchError> {
    if is_rate_limited(body) {
        Err(FetchError::RateLimited)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_marker_in_github_error_body() {
        let body = br#"{"message":"API rate limit exceeded for 203.0.113.7. (But here's the good news: Authenticated requests get a higher rate limit.)","documentation_url":"https://docs.github.com/rest/overview/resources-in-the-rest-api#rate-limiting"}"#;
        assert!(is_rate_limited(body));
        assert!(matches!(check_rate_limit(body), Err(FetchError::RateLimited)));
    }

    #[test]
    fn test_normal_body_passes() {
        let body = br#"{"domains":{"actions":["github.com"]}}"#;
        assert!(!is_rate_limited(body));
        assert!(check_rate_limit(body).is_ok());
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        assert!(!is_rate_limited(b"api rate limit exceeded"));
    }

    #[test]
    fn test_empty_body_is_not_rate_limited() {
        assert!(!is_rate_limited(b""));
    }

    #[test]
    fn test_command_failed_message_includes_status() {
        let err = FetchError::CommandFailed {
            program: "gh".to_string(),
            code: Some(4),
            stderr: "gh: Not Found (HTTP 404)".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("status 4"));
        assert!(message.contains("Not Found"));
    }
}
