//! Video identifier handling for yt-frontier
//!
//! This module defines the canonical [`VideoId`] type and the codec that
//! turns raw hrefs harvested from watch pages into identifiers.

mod decode;

pub use decode::decode;

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of every canonical video identifier
pub const ID_LEN: usize = 11;

/// Why an href could not be turned into an identifier
///
/// Decode failures are expected: most anchors on a watch page are navigation,
/// channel or ad links. Callers drop them without logging above `debug`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeFailure {
    #[error("empty href")]
    Empty,

    #[error("no identifier candidate found")]
    NoCandidate,

    #[error("candidate '{0}' is not an 11-character identifier")]
    Malformed(String),
}

/// A canonical 11-character video identifier
///
/// The only way to obtain one is through validated parsing, so every value
/// holds exactly [`ID_LEN`] characters from `[A-Za-z0-9_-]`.
///
/// # Examples
///
/// ```
/// use yt_frontier::identifier::VideoId;
///
/// let id: VideoId = "dQw4w9WgXcQ".parse().unwrap();
/// assert_eq!(id.watch_url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
/// assert!("dQw4w9WgXc".parse::<VideoId>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch page URL for this identifier
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }

    /// Returns true if `c` may appear in an identifier
    pub fn is_id_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '-' || c == '_'
    }
}

impl FromStr for VideoId {
    type Err = DecodeFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(DecodeFailure::Empty);
        }

        // chars().count() rather than len() so multi-byte input is reported, not sliced
        if s.chars().count() != ID_LEN || !s.chars().all(Self::is_id_char) {
            return Err(DecodeFailure::Malformed(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
