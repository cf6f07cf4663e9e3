//! Single-attempt conditional HTTP retrieval.
//!
//! The client issues exactly one request per [`fetch`](ConditionalFetchClient::fetch)
//! call and classifies the outcome; it never retries. Retry and backoff
//! policy, if any, belongs to whoever wraps the engine.

use crate::cache::Validators;
use crate::config::FetcherConfig;
use crate::error::FetchError;
use chrono::{DateTime, Utc};
use feed_rs::model::Feed;
use futures::StreamExt;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::StatusCode;
use sha2::{Digest, Sha256};
use url::Url;

/// A successfully retrieved full response.
#[derive(Debug, Clone)]
pub struct RetrievedFeed {
    /// The parsed feed document.
    pub feed: Feed,
    /// Validators from the response headers. May be empty, in which case
    /// the next fetch of this URL will be unconditional.
    pub validators: Validators,
    /// SHA-256 hex digest of the raw response body.
    pub fingerprint: String,
}

/// Classification of one retrieval attempt.
///
/// Failures travel separately as [`FetchError`]; the two variants here are
/// the non-error outcomes of a conditional GET.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The server sent a full response body.
    Retrieved(Box<RetrievedFeed>),
    /// The server confirmed the cached copy is still current (HTTP 304).
    Unchanged,
}

/// HTTP client that performs conditional feed retrievals.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct ConditionalFetchClient {
    http: reqwest::Client,
    config: FetcherConfig,
}

impl ConditionalFetchClient {
    /// Build a client from the given configuration.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { http, config })
    }

    /// Build a client around an existing `reqwest::Client`, e.g. to share
    /// a connection pool with the rest of the host application.
    pub fn from_client(http: reqwest::Client, config: FetcherConfig) -> Self {
        Self { http, config }
    }

    /// Perform one retrieval attempt for `url`.
    ///
    /// When `prior` carries validators, the request is conditional
    /// (`If-None-Match` / `If-Modified-Since`); a 304 answer yields
    /// [`FetchOutcome::Unchanged`] without reading or parsing a body.
    /// A 2xx answer is read (subject to the configured size cap), parsed,
    /// and returned with whatever validators the response supplied.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Network`] - connection, DNS, or TLS failure
    /// - [`FetchError::Timeout`] - the attempt exceeded the configured deadline
    /// - [`FetchError::HttpStatus`] - non-2xx, non-304 response
    /// - [`FetchError::ResponseTooLarge`] - body exceeded the size cap
    /// - [`FetchError::Parse`] - body was not a parseable RSS/Atom feed
    pub async fn fetch(
        &self,
        url: &Url,
        prior: Option<&Validators>,
    ) -> Result<FetchOutcome, FetchError> {
        tokio::time::timeout(self.config.timeout(), self.fetch_inner(url, prior))
            .await
            .map_err(|_| FetchError::Timeout)?
    }

    async fn fetch_inner(
        &self,
        url: &Url,
        prior: Option<&Validators>,
    ) -> Result<FetchOutcome, FetchError> {
        let mut request = self.http.get(url.clone());
        let conditional = prior.map(Validators::is_usable).unwrap_or(false);
        if let Some(validators) = prior {
            if let Some(etag) = &validators.etag {
                request = request.header(IF_NONE_MATCH, etag.as_str());
            }
            if let Some(last_modified) = validators.last_modified {
                request = request.header(IF_MODIFIED_SINCE, format_http_date(last_modified));
            }
        }

        tracing::debug!(url = %url, conditional = conditional, "Fetching feed");
        let response = request.send().await.map_err(FetchError::Network)?;

        if response.status() == StatusCode::NOT_MODIFIED {
            tracing::debug!(url = %url, "Server reported feed unchanged (304)");
            return Ok(FetchOutcome::Unchanged);
        }
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        // Grab validators before the body read consumes the response
        let validators = extract_validators(response.headers());
        let bytes = read_limited_bytes(response, self.config.max_response_bytes).await?;
        let fingerprint = format!("{:x}", Sha256::digest(&bytes));

        let feed = feed_rs::parser::parse(bytes.as_slice())
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        tracing::debug!(
            url = %url,
            bytes = bytes.len(),
            has_etag = validators.etag.is_some(),
            has_last_modified = validators.last_modified.is_some(),
            "Feed retrieved"
        );

        Ok(FetchOutcome::Retrieved(Box::new(RetrievedFeed {
            feed,
            validators,
            fingerprint,
        })))
    }
}

fn extract_validators(headers: &reqwest::header::HeaderMap) -> Validators {
    let etag = headers
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let last_modified = headers
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_http_date);
    Validators {
        etag,
        last_modified,
    }
}

/// Parse an HTTP date header value. Unparseable values are dropped, which
/// degrades the next fetch to ETag-only or unconditional.
fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Render a timestamp as an RFC 7231 IMF-fixdate, e.g.
/// `Sun, 06 Nov 1994 08:49:37 GMT`.
fn format_http_date(dt: DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: trust Content-Length when the server declares one
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
