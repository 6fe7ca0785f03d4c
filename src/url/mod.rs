//! URL handling module
//!
//! This module decides which URLs are crawlable articles and normalizes
//! article URLs so that fragment and query variants collapse to one key.

mod article;
mod normalize;

use crate::UrlError;
use url::Url;

// Re-export main functions
pub use article::{article_title, is_article_path, ARTICLE_PREFIX, ENCYCLOPEDIA_HOST};
pub use normalize::{normalize_parsed, normalize_url};

/// Checks that a seed URL is a crawlable encyclopedia article
///
/// A URL is accepted when:
/// 1. it parses and uses the HTTP or HTTPS scheme
/// 2. its host contains `wikipedia.org`
/// 3. its path starts with `/wiki/`
///
/// On success the normalized URL is returned.
///
/// # Examples
///
/// ```
/// use wiki_crawler::url::validate_article_url;
///
/// let url = validate_article_url("https://en.wikipedia.org/wiki/Rust#History").unwrap();
/// assert_eq!(url.as_str(), "https://en.wikipedia.org/wiki/Rust");
///
/// assert!(validate_article_url("https://example.com/wiki/Rust").is_err());
/// ```
pub fn validate_article_url(url_str: &str) -> Result<Url, UrlError> {
    let url = normalize_url(url_str)?;

    let host = url.host_str().unwrap_or_default();
    if !host.contains(ENCYCLOPEDIA_HOST) {
        return Err(UrlError::ForeignHost(url_str.to_string()));
    }

    if !article::is_encyclopedia_article(&url) {
        return Err(UrlError::NotAnArticle(url_str.to_string()));
    }

    Ok(url)
}

/// Returns true if `url_str` is a crawlable encyclopedia article URL
pub fn is_valid_article_url(url_str: &str) -> bool {
    validate_article_url(url_str).is_ok()
}
