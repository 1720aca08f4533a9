//! Video URL value object

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::error::InvalidVideoUrl;

/// A validated video source URL.
///
/// Guaranteed to be an absolute http(s) URL with a non-empty host.
/// Used as the deduplication key for jobs, so two textually different
/// strings that parse to the same URL compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoUrl(Url);

impl VideoUrl {
    /// Parse and validate a video URL
    pub fn parse(input: &str) -> Result<Self, InvalidVideoUrl> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(InvalidVideoUrl {
                input: input.to_string(),
            });
        }

        let url = Url::parse(trimmed).map_err(|_| InvalidVideoUrl {
            input: input.to_string(),
        })?;

        let scheme_ok = matches!(url.scheme(), "http" | "https");
        let has_host = url.host_str().map(|h| !h.is_empty()).unwrap_or(false);

        if !scheme_ok || !has_host {
            return Err(InvalidVideoUrl {
                input: input.to_string(),
            });
        }

        Ok(Self(url))
    }

    /// Get the URL as a string slice
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for VideoUrl {
    type Err = InvalidVideoUrl;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VideoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for VideoUrl {
    type Error = InvalidVideoUrl;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VideoUrl> for String {
    fn from(url: VideoUrl) -> Self {
        url.0.into()
    }
}
