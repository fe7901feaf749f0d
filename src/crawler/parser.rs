//! Watch page parser for harvesting outbound video links
//!
//! A watch page exposes related videos in two places:
//! - `<a href="...">` anchors in the rendered markup
//! - inline JSON (`ytInitialData`) carrying `/watch?v=` URLs and `"videoId"` fields
//!
//! Both are collected. The parser does not decide what is a valid identifier;
//! it returns raw hrefs and leaves canonicalization to the identifier codec.

use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

/// Path fragments that mark an href as pointing at a video
const VIDEO_LINK_MARKERS: &[&str] = &["/watch?", "youtu.be/", "/shorts/", "/embed/"];

/// `/watch?v=` URLs embedded in script JSON
///
/// The whole token is captured so that an over-long value reaches the
/// identifier codec intact and is rejected there, never truncated here.
static INLINE_WATCH_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"/watch\?v=([0-9A-Za-z_-]+)"#).expect("inline watch pattern is valid")
});

/// `"videoId":"..."` fields in script JSON
static INLINE_VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""videoId"\s*:\s*"([0-9A-Za-z_-]+)""#).expect("videoId pattern is valid")
});

/// Extracts every outbound video href from a watch page
///
/// # Extraction Rules
///
/// **Include:**
/// - `<a href>` values that, once resolved against `page_url`, point at a
///   watch, short-link, shorts or embed URL
/// - `/watch?v=<token>` occurrences and `"videoId"` fields inside inline
///   scripts, rewritten as absolute watch URLs on the page's origin with the
///   token copied whole (its length is checked by the codec, not here)
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - fragment-only links
/// - any href that does not look like a video link
///
/// Hrefs are returned in document order with exact duplicates removed.
///
/// # Example
///
/// ```
/// use yt_frontier::crawler::extract_video_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/watch?v=dQw4w9WgXcQ">Next</a></body></html>"#;
/// let page = Url::parse("https://www.youtube.com/watch?v=9bZkp7q19f0").unwrap();
/// let links = extract_video_links(html, &page);
/// assert_eq!(links, vec!["https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string()]);
/// ```
pub fn extract_video_links(html: &str, page_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    let mut push = |link: String| {
        if seen.insert(link.clone()) {
            links.push(link);
        }
    };

    let document = Html::parse_document(html);
    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if let Some(absolute) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, page_url))
                .filter(|link| is_video_link(link))
            {
                push(absolute);
            }
        }
    }

    for caps in INLINE_WATCH_URL
        .captures_iter(html)
        .chain(INLINE_VIDEO_ID.captures_iter(html))
    {
        if let Some(id) = caps.get(1) {
            if let Some(absolute) = resolve_link(&format!("/watch?v={}", id.as_str()), page_url) {
                push(absolute);
            }
        }
    }

    links
}

/// Returns true if `link` points at something the identifier codec can decode
pub fn is_video_link(link: &str) -> bool {
    VIDEO_LINK_MARKERS.iter().any(|marker| link.contains(marker))
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
