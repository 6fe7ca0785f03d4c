use url::Url;

/// Path prefix shared by every article on the site
pub const ARTICLE_PREFIX: &str = "/wiki/";

/// Host fragment an acceptable seed URL must carry
pub const ENCYCLOPEDIA_HOST: &str = "wikipedia.org";

/// Title prefixes that mark non-article namespaces
const NON_ARTICLE_NAMESPACES: &[&str] = &[
    "special",
    "media",
    "file",
    "image",
    "talk",
    "user",
    "user_talk",
    "wikipedia",
    "wikipedia_talk",
    "file_talk",
    "mediawiki",
    "mediawiki_talk",
    "template",
    "template_talk",
    "help",
    "help_talk",
    "category",
    "category_talk",
    "portal",
    "portal_talk",
    "draft",
    "draft_talk",
    "timedtext",
    "timedtext_talk",
    "module",
    "module_talk",
    "book",
    "book_talk",
];

/// Returns the article title of a path, if the path is in the article namespace
///
/// `/wiki/Rust` yields `Some("Rust")`; `/wiki/Special:Random`, `/w/index.php`
/// and a bare `/wiki/` yield `None`.
pub fn article_title(path: &str) -> Option<&str> {
    let title = path.strip_prefix(ARTICLE_PREFIX)?;
    if title.is_empty() {
        return None;
    }

    if let Some(namespace) = namespace_of(title) {
        let namespace = namespace.to_ascii_lowercase().replace(' ', "_");
        if NON_ARTICLE_NAMESPACES.contains(&namespace.as_str()) {
            return None;
        }
    }

    Some(title)
}

/// Returns true if the path names an article (not a special or meta page)
pub fn is_article_path(path: &str) -> bool {
    article_title(path).is_some()
}

/// Splits off the `Namespace:` prefix of a title, literal or percent-encoded
fn namespace_of(title: &str) -> Option<&str> {
    if let Some((namespace, _)) = title.split_once(':') {
        return Some(namespace);
    }

    let lower = title.to_ascii_lowercase();
    lower.find("%3a").map(|idx| &title[..idx])
}

/// Returns true if `url` is an article on one of the encyclopedia's hosts
pub(crate) fn is_encyclopedia_article(url: &Url) -> bool {
    let host_ok = url
        .host_str()
        .map(|h| h.to_ascii_lowercase().contains(ENCYCLOPEDIA_HOST))
        .unwrap_or(false);

    host_ok && url.path().starts_with(ARTICLE_PREFIX)
}
