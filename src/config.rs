//! Fetcher configuration.
//!
//! `FetcherConfig` is a plain value: construct it with [`Default`], tweak
//! it with the builder-style setters, or deserialize it from a host
//! application's config file. All fields use `#[serde(default)]` so any
//! subset of keys can be specified; missing keys fall back to the defaults.
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024; // 10MB

/// Configuration for the conditional fetch client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Deadline for a whole fetch attempt (connect, headers, body), in seconds.
    pub timeout_secs: u64,

    /// Maximum accepted response body size in bytes.
    ///
    /// A body exceeding this yields `FetchError::ResponseTooLarge`.
    pub max_response_bytes: usize,

    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: format!("feedpoll/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetcherConfig {
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn max_response_bytes(mut self, bytes: usize) -> Self {
        self.max_response_bytes = bytes;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = FetcherConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_response_bytes, 10 * 1024 * 1024);
        assert!(config.user_agent.starts_with("feedpoll/"));
    }

    #[test]
    fn test_builder_setters() {
        let config = FetcherConfig::default()
            .timeout_secs(5)
            .max_response_bytes(1024)
            .user_agent("test-agent/1.0");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.max_response_bytes, 1024);
        assert_eq!(config.user_agent, "test-agent/1.0");
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: FetcherConfig = toml::from_str("timeout_secs = 10").unwrap();
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.max_response_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: FetcherConfig = toml::from_str("").unwrap();
        assert_eq!(config.timeout_secs, FetcherConfig::default().timeout_secs);
    }
}
