//! Google Safe Browsing v4 Lookup API client.

use super::{LookupError, ThreatMatch, UrlLookup};
use crate::cache::VerdictCache;
use crate::config::SafeBrowsingConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Threat lists every lookup is checked against.
const THREAT_TYPES: [&str; 4] = [
    "MALWARE",
    "SOCIAL_ENGINEERING",
    "UNWANTED_SOFTWARE",
    "POTENTIALLY_HARMFUL_APPLICATION",
];

/// `threatMatches:find` request body.
#[derive(Debug, Serialize)]
struct FindThreatMatchesRequest {
    client: ClientInfo,
    #[serde(rename = "threatInfo")]
    threat_info: ThreatInfo,
}

#[derive(Debug, Serialize)]
struct ClientInfo {
    #[serde(rename = "clientId")]
    client_id: String,
    #[serde(rename = "clientVersion")]
    client_version: String,
}

#[derive(Debug, Serialize)]
struct ThreatInfo {
    #[serde(rename = "threatTypes")]
    threat_types: Vec<String>,
    #[serde(rename = "platformTypes")]
    platform_types: Vec<String>,
    #[serde(rename = "threatEntryTypes")]
    threat_entry_types: Vec<String>,
    #[serde(rename = "threatEntries")]
    threat_entries: Vec<ThreatEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ThreatEntry {
    url: String,
}

/// `threatMatches:find` response body. An absent `matches` field means no URL
/// in the batch is on any list.
#[derive(Debug, Deserialize)]
struct FindThreatMatchesResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Debug, Deserialize)]
struct WireMatch {
    #[serde(rename = "threatType")]
    threat_type: String,

    #[serde(rename = "platformType", default)]
    platform_type: String,

    /// The submitted entry this match is for.
    threat: ThreatEntry,

    /// Duration string like "300s" or "300.5s".
    #[serde(rename = "cacheDuration", default)]
    cache_duration: Option<String>,
}

/// Safe Browsing Lookup API client with a verdict cache in front.
pub struct SafeBrowsingClient {
    config: SafeBrowsingConfig,
    client: Client,
    cache: Arc<VerdictCache>,
    db_path: Option<PathBuf>,
}

impl SafeBrowsingClient {
    /// Create a new client. With a `db_path`, previously persisted verdicts
    /// are loaded; an unreadable cache file degrades to an empty cache.
    pub fn new(config: SafeBrowsingConfig, db_path: Option<PathBuf>) -> anyhow::Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        let cache = Arc::new(VerdictCache::new(
            config.cache_ttl_seconds,
            config.cache_max_entries,
        ));

        if let Some(ref path) = db_path {
            if let Err(e) = cache.load(path) {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable verdict cache");
            }
        }

        Ok(Self {
            config,
            client,
            cache,
            db_path,
        })
    }

    /// Persist the verdict cache if a database path was configured. A failed
    /// save only costs the next run its warm cache, so it is logged, not
    /// propagated.
    pub fn save_cache(&self) {
        if let Some(ref path) = self.db_path {
            if let Err(e) = self.cache.save(path) {
                warn!(path = %path.display(), error = %e, "Failed to save verdict cache");
            }
        }
    }

    fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache_ttl_seconds)
    }

    /// One `threatMatches:find` POST for the given URLs, grouped per URL.
    async fn find_threat_matches(
        &self,
        urls: &[String],
    ) -> Result<HashMap<String, Vec<ThreatMatch>>, LookupError> {
        let request = FindThreatMatchesRequest {
            client: ClientInfo {
                client_id: "sbscan".to_string(),
                client_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            threat_info: ThreatInfo {
                threat_types: THREAT_TYPES.iter().map(|s| s.to_string()).collect(),
                platform_types: vec!["ANY_PLATFORM".to_string()],
                threat_entry_types: vec!["URL".to_string()],
                threat_entries: urls.iter().map(|u| ThreatEntry { url: u.clone() }).collect(),
            },
        };

        debug!(urls = urls.len(), "Querying Safe Browsing");

        let endpoint = format!("{}?key={}", self.config.endpoint, self.config.api_key);
        let response = self.client.post(&endpoint).json(&request).send().await?;

        // Check for rate limiting
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Safe Browsing rate limit exceeded");
            return Err(LookupError::RateLimited);
        }

        // Check for other errors
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::InvalidResponse(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        // Parse response
        let body: FindThreatMatchesResponse = response.json().await.map_err(|e| {
            LookupError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        debug!(matches = body.matches.len(), "Safe Browsing lookup complete");

        Ok(group_matches(urls, body.matches))
    }
}

#[async_trait]
impl UrlLookup for SafeBrowsingClient {
    async fn lookup_urls(&self, urls: &[String]) -> Result<Vec<Vec<ThreatMatch>>, LookupError> {
        let mut results: Vec<Option<Vec<ThreatMatch>>> = vec![None; urls.len()];

        // Serve cache hits first
        for (slot, url) in results.iter_mut().zip(urls) {
            if let Some(hit) = self.cache.get(url) {
                debug!(url = %url, matches = hit.matches.len(), "Verdict cache hit");
                *slot = Some(hit.matches);
            }
        }

        let pending: Vec<String> = results
            .iter()
            .zip(urls)
            .filter(|(slot, _)| slot.is_none())
            .map(|(_, url)| url.clone())
            .collect();

        if !pending.is_empty() {
            let grouped = self.find_threat_matches(&pending).await?;

            for (slot, url) in results.iter_mut().zip(urls) {
                if slot.is_none() {
                    let matches = grouped.get(url).cloned().unwrap_or_default();

                    // Honor the service's cache hints; clean verdicts get the
                    // configured default TTL (negative caching).
                    let ttl = matches
                        .iter()
                        .filter_map(|m| m.cache_duration)
                        .min()
                        .unwrap_or_else(|| self.default_ttl());
                    self.cache.insert_with_ttl(url.clone(), matches.clone(), ttl);

                    *slot = Some(matches);
                }
            }
        }

        Ok(results.into_iter().map(|r| r.unwrap_or_default()).collect())
    }
}

/// Group wire matches by the echoed URL, keyed over the submitted batch.
/// Matches for URLs not in the batch are dropped.
fn group_matches(urls: &[String], wire: Vec<WireMatch>) -> HashMap<String, Vec<ThreatMatch>> {
    let mut grouped: HashMap<String, Vec<ThreatMatch>> =
        urls.iter().map(|u| (u.clone(), Vec::new())).collect();

    for m in wire {
        match grouped.get_mut(&m.threat.url) {
            Some(list) => {
                let cache_duration = m.cache_duration.as_deref().and_then(parse_cache_duration);
                list.push(ThreatMatch {
                    threat_type: m.threat_type,
                    platform_type: m.platform_type,
                    url: m.threat.url,
                    cache_duration,
                });
            }
            None => {
                warn!(url = %m.threat.url, "Dropping match for URL not in this request");
            }
        }
    }

    grouped
}

/// Parse a Safe Browsing duration string ("300s", "300.5s"). Negative,
/// non-finite, and over-range values are all rejected, not panicked on.
fn parse_cache_duration(s: &str) -> Option<Duration> {
    let secs: f64 = s.strip_suffix('s')?.parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}
