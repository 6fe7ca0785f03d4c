//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - GET requests for article pages
//! - Charset-aware decoding of the response body
//! - Failure classification (transient, permanent, decode)
//!
//! The fetcher never retries; the engine drops an item on any failure.

use crate::config::{FetchConfig, UserAgentConfig};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a fetch failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Might succeed later (timeouts, connection failures, 429, 5xx)
    Transient,
    /// Will not succeed as-is (404, 410, other client errors)
    Permanent,
    /// The body could not be decoded as text
    Decode,
}

/// A failed page fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Request failed for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Could not decode body of {url} as {charset}")]
    Decode { url: String, charset: String },
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Status { status, .. } => classify_status(*status),
            Self::Timeout { .. } | Self::Connect { .. } | Self::Request { .. } => {
                FetchErrorKind::Transient
            }
            Self::Decode { .. } => FetchErrorKind::Decode,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. }
            | Self::Timeout { url }
            | Self::Connect { url, .. }
            | Self::Request { url, .. }
            | Self::Decode { url, .. } => url,
        }
    }
}

fn classify_status(status: u16) -> FetchErrorKind {
    match status {
        429 => FetchErrorKind::Transient,
        500..=599 => FetchErrorKind::Transient,
        _ => FetchErrorKind::Permanent,
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use wiki_crawler::config::{FetchConfig, UserAgentConfig};
/// use wiki_crawler::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    agent: &UserAgentConfig,
    fetch: &FetchConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(agent.header_value())
        .timeout(Duration::from_secs(fetch.timeout_secs))
        .connect_timeout(Duration::from_secs(fetch.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page and returns its decoded markup
///
/// # Failure mapping
///
/// | Condition | Kind |
/// |-----------|------|
/// | HTTP 429, 5xx | Transient |
/// | Timeout, connection error | Transient |
/// | Any other non-2xx | Permanent |
/// | Invalid bytes for the declared charset | Decode |
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify_request_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let charset = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(charset_from_content_type);

    match charset {
        Some(label) if !is_utf8_label(&label) => response
            .text_with_charset(&label)
            .await
            .map_err(|e| classify_request_error(url, e)),
        _ => {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| classify_request_error(url, e))?;
            String::from_utf8(bytes.to_vec()).map_err(|_| FetchError::Decode {
                url: url.to_string(),
                charset: "utf-8".to_string(),
            })
        }
    }
}

fn classify_request_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            message: e.to_string(),
        }
    } else if let Some(status) = e.status().filter(|s| *s != StatusCode::OK) {
        FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else {
        FetchError::Request {
            url: url.to_string(),
            source: e,
        }
    }
}

/// Extracts the `charset=` parameter of a Content-Type header value
fn charset_from_content_type(value: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|param| {
        let (key, val) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            let val = val.trim().trim_matches('"');
            (!val.is_empty()).then(|| val.to_ascii_lowercase())
        } else {
            None
        }
    })
}

fn is_utf8_label(label: &str) -> bool {
    matches!(label, "utf-8" | "utf8")
}
