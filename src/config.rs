//! Configuration types for the scanner.

use std::path::PathBuf;

/// Default path of the userdomains input file.
pub fn default_input_path() -> PathBuf {
    PathBuf::from("/etc/userdomains")
}

/// Default directory of cPanel per-account status files.
pub fn default_users_dir() -> PathBuf {
    PathBuf::from("/var/cpanel/users")
}

/// Scan run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the `domain: account` input file.
    pub input_path: PathBuf,

    /// Directory holding one status file per cPanel account.
    pub users_dir: PathBuf,

    /// Skip domains owned by suspended accounts.
    pub ignore_suspended: bool,

    /// Verdict-cache persistence path; `None` disables persistence.
    pub db_path: Option<PathBuf>,

    /// Safe Browsing client settings.
    pub safebrowsing: SafeBrowsingConfig,
}

impl Config {
    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.safebrowsing.validate()
    }
}

/// Safe Browsing Lookup API client configuration.
#[derive(Debug, Clone)]
pub struct SafeBrowsingConfig {
    /// API key for the Lookup API.
    pub api_key: String,

    /// `threatMatches:find` endpoint. Overridable so tests can point the
    /// client elsewhere; the key is appended as a query parameter.
    pub endpoint: String,

    /// API request timeout in milliseconds.
    pub timeout_ms: u64,

    /// Verdict-cache TTL in seconds for entries without a service cache hint.
    pub cache_ttl_seconds: u64,

    /// Verdict-cache capacity.
    pub cache_max_entries: usize,
}

impl SafeBrowsingConfig {
    /// Client settings for the given API key, everything else defaulted.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
            cache_ttl_seconds: default_cache_ttl(),
            cache_max_entries: default_cache_max_entries(),
        }
    }

    /// Validate client settings.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.is_empty() {
            anyhow::bail!("API key is empty");
        }
        if reqwest::Url::parse(&self.endpoint).is_err() {
            anyhow::bail!("Invalid endpoint URL: {}", self.endpoint);
        }
        if self.timeout_ms == 0 {
            anyhow::bail!("timeout_ms must be nonzero");
        }
        if self.cache_ttl_seconds == 0 {
            anyhow::bail!("cache_ttl_seconds must be nonzero");
        }
        if self.cache_max_entries == 0 {
            anyhow::bail!("cache_max_entries must be nonzero");
        }
        Ok(())
    }
}

fn default_endpoint() -> String {
    "https://safebrowsing.googleapis.com/v4/threatMatches:find".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    10_000
}
