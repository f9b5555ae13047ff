//! URL threat lookup.

pub mod safebrowsing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One threat-list hit for a URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatMatch {
    /// Threat list the URL matched (e.g. `MALWARE`, `SOCIAL_ENGINEERING`).
    pub threat_type: String,

    /// Platform the match applies to.
    pub platform_type: String,

    /// The matched URL as echoed by the service.
    pub url: String,

    /// How long the service allows this match to be cached.
    pub cache_duration: Option<Duration>,
}

/// Error from a URL lookup.
#[derive(Debug)]
pub enum LookupError {
    /// HTTP request failed.
    Http(reqwest::Error),
    /// Timeout.
    Timeout,
    /// Rate limited.
    RateLimited,
    /// Invalid response.
    InvalidResponse(String),
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::Http(e) => write!(f, "HTTP error: {}", e),
            LookupError::Timeout => write!(f, "Request timed out"),
            LookupError::RateLimited => write!(f, "Rate limited"),
            LookupError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for LookupError {}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LookupError::Timeout
        } else {
            LookupError::Http(e)
        }
    }
}

/// Trait for URL threat lookup backends.
///
/// Returns one match list per submitted URL, in submission order; an empty
/// list means the URL is not on any threat list. The scan driver is written
/// against this trait so tests can script verdicts without a network.
#[async_trait]
pub trait UrlLookup: Send + Sync {
    /// Look up a batch of URLs against the threat lists.
    async fn lookup_urls(&self, urls: &[String]) -> Result<Vec<Vec<ThreatMatch>>, LookupError>;
}
