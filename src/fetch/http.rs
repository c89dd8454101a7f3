//! Secondary fetch path: direct HTTP request to the GitHub API
//!
//! The body is returned whatever the HTTP status; GitHub reports rate limiting
//! as a JSON error body, which the controller detects by substring.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use tracing::debug;

use super::{FetchError, Fetcher};

/// Default endpoint for the GitHub meta API
pub const DEFAULT_META_URL: &str = "https://api.github.com/meta";

/// GitHub rejects API requests without a User-Agent
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Client for fetching the meta document over HTTP
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpFetcher {
    /// Creates a fetcher for `url`
    ///
    /// # Arguments
    /// * `url` - Endpoint to GET
    /// * `token` - Sent as `Authorization: token <value>` when present
    /// * `timeout` - Total request timeout
    pub fn new(
        url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            token,
        })
    }

    /// Whether requests carry a token
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &str {
        if self.is_authenticated() {
            "http (token)"
        } else {
            "http"
        }
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        let mut request = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(url = %self.url, %status, bytes = body.len(), "http fetch finished");

        Ok(body.to_vec())
    }
}
