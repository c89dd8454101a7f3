//! Primary fetch path through the GitHub CLI
//!
//! Uses `gh auth status` to decide whether the CLI is logged in, then
//! `gh api <endpoint>` to retrieve the body with the CLI's own credentials.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{FetchError, Fetcher};

/// Program name used when none is configured
pub const DEFAULT_GH_PROGRAM: &str = "gh";

/// Fetcher that shells out to the GitHub CLI
#[derive(Debug, Clone)]
pub struct GhCliFetcher {
    program: String,
    endpoint: String,
    timeout: Duration,
}

impl GhCliFetcher {
    /// Creates a fetcher for `gh api <endpoint>`
    ///
    /// # Arguments
    /// * `endpoint` - API path relative to the GitHub API root (e.g. `meta`)
    /// * `timeout` - Upper bound for each `gh` invocation
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: DEFAULT_GH_PROGRAM.to_string(),
            endpoint: endpoint.into(),
            timeout,
        }
    }

    /// Uses a different executable instead of `gh` on `PATH`
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Runs the program with `args` and returns its stdout on success
    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, FetchError> {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
            .map_err(|source| FetchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(FetchError::CommandFailed {
                program: self.program.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl Fetcher for GhCliFetcher {
    fn name(&self) -> &str {
        "gh"
    }

    async fn is_available(&self) -> bool {
        match self.run(&["auth", "status"]).await {
            Ok(_) => true,
            Err(e) => {
                debug!(program = %self.program, error = %e, "gh auth check failed");
                false
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        debug!(program = %self.program, endpoint = %self.endpoint, "running gh api");
        self.run(&["api", &self.endpoint]).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    /// Writes an executable shell script standing in for `gh`
    fn fake_gh(dir: &Path, script: &str) -> String {
        let path = dir.join("gh");
        fs::write(&path, format!("#!/bin/sh\n{script}\n")).expect("Failed to write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to mark script executable");
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_authenticated_gh_returns_api_output() {
        let temp_dir = TempDir::new().unwrap();
        let program = fake_gh(
            temp_dir.path(),
            r#"case "$1" in
  auth) exit 0 ;;
  api) printf '{"domains":{"actions":["a"]}}' ;;
  *) exit 2 ;;
esac"#,
        );
        let fetcher = GhCliFetcher::new("meta", Duration::from_secs(10)).with_program(program);

        assert!(fetcher.is_available().await);
        let body = fetcher.fetch().await.expect("Fetch should succeed");
        assert_eq!(body, br#"{"domains":{"actions":["a"]}}"#);
    }

    #[tokio::test]
    async fn test_gh_receives_endpoint_argument() {
        let temp_dir = TempDir::new().unwrap();
        let program = fake_gh(temp_dir.path(), r#"printf '%s' "$2""#);
        let fetcher = GhCliFetcher::new("meta", Duration::from_secs(10)).with_program(program);

        let body = fetcher.fetch().await.expect("Fetch should succeed");
        assert_eq!(body, b"meta");
    }

    #[tokio::test]
    async fn test_logged_out_gh_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let program = fake_gh(
            temp_dir.path(),
            "echo 'You are not logged into any GitHub hosts.' >&2\nexit 1",
        );
        let fetcher = GhCliFetcher::new("meta", Duration::from_secs(10)).with_program(program);

        assert!(!fetcher.is_available().await);
    }

    #[tokio::test]
    async fn test_failed_api_call_reports_stderr() {
        let temp_dir = TempDir::new().unwrap();
        let program = fake_gh(temp_dir.path(), "echo 'HTTP 502' >&2\nexit 1");
        let fetcher = GhCliFetcher::new("meta", Duration::from_secs(10)).with_program(program);

        match fetcher.fetch().await {
            Err(FetchError::CommandFailed { code, stderr, .. }) => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "HTTP 502");
            }
            other => panic!("Expected CommandFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let fetcher = GhCliFetcher::new("meta", Duration::from_secs(10))
            .with_program("/nonexistent/path/to/gh");

        assert!(!fetcher.is_available().await);
        assert!(matches!(
            fetcher.fetch().await,
            Err(FetchError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn test_slow_program_times_out() {
        let temp_dir = TempDir::new().unwrap();
        let program = fake_gh(temp_dir.path(), "sleep 5");
        let fetcher = GhCliFetcher::new("meta", Duration::from_millis(100)).with_program(program);

        assert!(matches!(
            fetcher.fetch().await,
            Err(FetchError::Timeout(_))
        ));
    }
}
