use crate::identifier::{DecodeFailure, VideoId};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Hosts that serve canonical watch, embed and shorts pages
const VIDEO_HOSTS: &[&str] = &["www.youtube.com", "youtube.com", "m.youtube.com"];

/// Short-link host whose whole path is the identifier
const SHORT_LINK_HOST: &str = "youtu.be";

/// Path prefixes whose next segment is the identifier
const ID_PATH_PREFIXES: &[&str] = &["/embed/", "/v/", "/shorts/"];

/// Last-resort match for an identifier after `v=` or a path separator
static FALLBACK_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})(?:[?&#]|$)").expect("fallback pattern is valid")
});

/// Decodes a raw href into a canonical video identifier
///
/// # Decoding Rules
///
/// Tried in order, the first rule that produces a candidate wins:
///
/// 1. Video host with path `/watch` → the `v` query parameter
/// 2. Video host with an `/embed/`, `/v/` or `/shorts/` path → the segment after it
/// 3. `youtu.be` → the path without its leading slash
/// 4. Anything else (including relative hrefs) → an 11-character token after
///    `v=` or `/`, terminated by `?`, `&`, `#` or end of input
///
/// The candidate must then be exactly 11 characters from `[A-Za-z0-9_-]`.
///
/// Total and pure: any string, including empty input and garbage, yields
/// either an identifier or a [`DecodeFailure`].
///
/// # Examples
///
/// ```
/// use yt_frontier::identifier::decode;
///
/// let id = decode("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=5s").unwrap();
/// assert_eq!(id.as_str(), "dQw4w9WgXcQ");
/// assert!(decode("https://example.com/page").is_err());
/// ```
pub fn decode(raw_href: &str) -> Result<VideoId, DecodeFailure> {
    let raw = raw_href.trim();
    if raw.is_empty() {
        return Err(DecodeFailure::Empty);
    }

    if let Some(candidate) = Url::parse(raw).ok().and_then(|url| structured_candidate(&url)) {
        return candidate.parse();
    }

    match FALLBACK_ID.captures(raw).and_then(|caps| caps.get(1)) {
        Some(m) => m.as_str().parse(),
        None => Err(DecodeFailure::NoCandidate),
    }
}

/// Applies the host and path rules to an absolute URL
fn structured_candidate(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let path = url.path();

    if VIDEO_HOSTS.contains(&host) {
        if path == "/watch" {
            return url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())
                .filter(|value| !value.is_empty());
        }

        return ID_PATH_PREFIXES
            .iter()
            .find_map(|prefix| path.strip_prefix(prefix))
            .and_then(first_segment);
    }

    if host == SHORT_LINK_HOST {
        return first_segment(path.trim_start_matches('/'));
    }

    None
}

fn first_segment(path: &str) -> Option<String> {
    path.split('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
