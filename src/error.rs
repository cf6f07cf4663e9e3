use thiserror::Error;
use url::Url;

/// Errors that can occur during a feed fetch attempt.
///
/// Every variant leaves the feed info cache untouched: a failed fetch
/// preserves whatever entry was cached before the call, so a caller can
/// keep serving stale-but-valid content while it decides whether to retry.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with a non-2xx, non-304 status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the configured size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// The transport reported "not modified" but no cache entry exists.
    ///
    /// A conditional request is only issued when a prior entry supplied
    /// validators, so a 304 without one means a collaborator broke its
    /// contract (or the entry was cleared mid-flight). Surfaced rather
    /// than silently treated as a first retrieval.
    #[error("Server reported 'not modified' for {0} but no cached feed exists")]
    CacheInconsistency(Url),
}

impl FetchError {
    /// Whether a caller-side retry could plausibly succeed.
    ///
    /// Network failures and 5xx statuses are transient; 4xx statuses,
    /// parse failures, and cache inconsistencies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout => true,
            FetchError::HttpStatus(code) => *code >= 500,
            FetchError::Parse(_)
            | FetchError::ResponseTooLarge
            | FetchError::CacheInconsistency(_) => false,
        }
    }
}
