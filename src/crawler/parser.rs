//! HTML parser for extracting article links
//!
//! Extraction is total: malformed markup yields a best-effort (possibly
//! empty) set, never an error.

use crate::url::{is_article_path, normalize_parsed};
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use url::Url;

/// Extracts the set of same-site article URLs linked from a page
///
/// # Link Extraction Rules
///
/// **Include:** `<a href="...">` whose resolved URL
/// - is on the same host (and port) as `base_url`
/// - has a path under `/wiki/`
/// - is not in a non-article namespace (`Special:`, `File:`, `Talk:` ...)
///
/// **Normalize:** fragments and query strings are removed, so
/// `/wiki/Example#Section1` and `/wiki/Example#Section2` collapse into one
/// URL.
///
/// **Exclude:** empty hrefs, `javascript:`, `mailto:`, `tel:` and `data:`
/// links, and anything that fails to resolve.
///
/// # Example
///
/// ```
/// use wiki_crawler::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<a href="/wiki/Article">a</a><a href="/wiki/Special:Random">r</a>"#;
/// let base = Url::parse("https://en.wikipedia.org/wiki/Start").unwrap();
/// let links = extract_links(html, &base);
/// assert_eq!(links.len(), 1);
/// assert!(links.contains("https://en.wikipedia.org/wiki/Article"));
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> BTreeSet<String> {
    let document = Html::parse_document(html);
    let mut links = BTreeSet::new();

    let Ok(selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&selector) {
        if let Some(href) = element.value().attr("href") {
            if let Some(url) = resolve_article_link(href, base_url) {
                links.insert(url);
            }
        }
    }

    links
}

/// Resolves an href against the base URL and keeps it only if it is a
/// same-site article
fn resolve_article_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let resolved = base_url.join(href).ok()?;
    if resolved.host_str() != base_url.host_str()
        || resolved.port_or_known_default() != base_url.port_or_known_default()
    {
        return None;
    }

    let normalized = normalize_parsed(resolved).ok()?;
    if !is_article_path(normalized.path()) {
        return None;
    }

    Some(normalized.to_string())
}
