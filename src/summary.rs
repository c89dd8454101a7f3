//! Summary line for a freshly fetched meta document

use serde::Deserialize;
use thiserror::Error;

use crate::cache::StoreError;

/// Errors from extracting the summary; never fatal
#[derive(Debug, Error)]
pub enum SummaryError {
    /// The payload is not JSON
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// The payload lacks `domains.actions`
    #[error("Missing expected field in response: {0}")]
    MissingField(String),

    /// The payload could not be read back from the cache
    #[error("Failed to read cached payload: {0}")]
    Unreadable(#[from] StoreError),
}

#[derive(Debug, Deserialize)]
struct MetaResponse {
    domains: Option<Domains>,
}

#[derive(Debug, Deserialize)]
struct Domains {
    actions: Option<Vec<serde_json::Value>>,
}

/// Counts the entries of `domains.actions` in a GitHub meta payload
pub fn count_action_domains(body: &[u8]) -> Result<usize, SummaryError> {
    let meta: MetaResponse = serde_json::from_slice(body)?;
    meta.domains
        .and_then(|domains| domains.actions)
        .map(|actions| actions.len())
        .ok_or_else(|| SummaryError::MissingField("domains.actions".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_actions_domains() {
        let body = br#"{"domains":{"actions":["a","b"]}}"#;
        assert_eq!(count_action_domains(body).unwrap(), 2);
    }

    #[test]
    fn test_ignores_other_fields() {
        let body = br#"{"verifiable_password_authentication":false,"hooks":["192.30.252.0/22"],"domains":{"website":["*.github.com"],"actions":["*.actions.githubusercontent.com","codeload.github.com","pkg.actions.githubusercontent.com"]}}"#;
        assert_eq!(count_action_domains(body).unwrap(), 3);
    }

    #[test]
    fn test_missing_domains_is_reported() {
        let body = br#"{"message":"API rate limit exceeded"}"#;
        let err = count_action_domains(body).unwrap_err();
        assert!(matches!(err, SummaryError::MissingField(_)));
        assert!(err.to_string().contains("domains.actions"));
    }

    #[test]
    fn test_non_json_is_parse_error() {
        let err = count_action_domains(b"<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, SummaryError::ParseError(_)));
    }
}
