//! TTL-based cache for URL verdicts.

use crate::lookup::ThreatMatch;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// On-disk format version for the persisted cache document.
const CACHE_FORMAT_VERSION: u32 = 1;

/// Cached verdict for one URL. An empty match list is a cached "clean".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedVerdict {
    /// Threat-list matches for the URL (possibly none).
    pub matches: Vec<ThreatMatch>,
    /// Wall-clock expiry, so persisted entries stay meaningful across runs.
    pub expires_at: SystemTime,
}

impl CachedVerdict {
    /// Check if this cache entry has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= SystemTime::now()
    }
}

/// Persisted cache document.
#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
    version: u32,
    entries: HashMap<String, CachedVerdict>,
}

/// Thread-safe TTL cache of per-URL verdicts.
pub struct VerdictCache {
    entries: RwLock<HashMap<String, CachedVerdict>>,
    default_ttl: Duration,
    max_entries: usize,
}

impl VerdictCache {
    /// Create a new verdict cache.
    pub fn new(default_ttl_seconds: u64, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl: Duration::from_secs(default_ttl_seconds),
            max_entries,
        }
    }

    /// Get a cached verdict if present and not expired.
    pub fn get(&self, url: &str) -> Option<CachedVerdict> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(url)?;

        if entry.is_expired() {
            // Don't remove here to avoid the write lock, cleanup handles it
            None
        } else {
            Some(entry.clone())
        }
    }

    /// Store a verdict with the default TTL.
    pub fn insert(&self, url: String, matches: Vec<ThreatMatch>) {
        self.insert_with_ttl(url, matches, self.default_ttl);
    }

    /// Store a verdict with a custom TTL. A TTL too large to express as a
    /// wall-clock expiry is not cached rather than overflowed.
    pub fn insert_with_ttl(&self, url: String, matches: Vec<ThreatMatch>, ttl: Duration) {
        let expires_at = match SystemTime::now().checked_add(ttl) {
            Some(t) => t,
            None => return,
        };
        let entry = CachedVerdict { matches, expires_at };

        if let Ok(mut entries) = self.entries.write() {
            // Evict if at capacity
            if entries.len() >= self.max_entries && !entries.contains_key(&url) {
                evict_expired_entries(&mut entries);

                // If still at capacity, drop the entry closest to expiry
                if entries.len() >= self.max_entries {
                    if let Some(next_out) = entries
                        .iter()
                        .min_by_key(|(_, v)| v.expires_at)
                        .map(|(k, _)| k.clone())
                    {
                        entries.remove(&next_out);
                    }
                }
            }

            entries.insert(url, entry);
        }
    }

    /// Remove expired entries from the cache.
    pub fn cleanup(&self) {
        if let Ok(mut entries) = self.entries.write() {
            evict_expired_entries(&mut entries);
        }
    }

    /// Get the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Load persisted entries from `path`, dropping any that have expired.
    ///
    /// A missing file is a quiet empty start. Returns the number of fresh
    /// entries loaded.
    pub fn load(&self, path: &Path) -> anyhow::Result<usize> {
        if !path.exists() {
            return Ok(0);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading cache file {}", path.display()))?;
        let doc: CacheDocument = serde_json::from_str(&content)
            .with_context(|| format!("parsing cache file {}", path.display()))?;
        if doc.version != CACHE_FORMAT_VERSION {
            anyhow::bail!("unsupported cache format version {}", doc.version);
        }

        let mut loaded = 0;
        if let Ok(mut entries) = self.entries.write() {
            for (url, entry) in doc.entries {
                if !entry.is_expired() {
                    entries.insert(url, entry);
                    loaded += 1;
                }
            }
        }

        debug!(entries = loaded, path = %path.display(), "Verdict cache loaded");
        Ok(loaded)
    }

    /// Persist the fresh entries to `path` as JSON.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow::anyhow!("cache lock poisoned"))?;

        let doc = CacheDocument {
            version: CACHE_FORMAT_VERSION,
            entries: entries
                .iter()
                .filter(|(_, v)| !v.is_expired())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };

        let json = serde_json::to_string_pretty(&doc)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing cache file {}", path.display()))?;

        debug!(entries = doc.entries.len(), path = %path.display(), "Verdict cache saved");
        Ok(())
    }
}

fn evict_expired_entries(entries: &mut HashMap<String, CachedVerdict>) {
    entries.retain(|_, v| !v.is_expired());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn malware_match(url: &str) -> ThreatMatch {
        ThreatMatch {
            threat_type: "MALWARE".to_string(),
            platform_type: "ANY_PLATFORM".to_string(),
            url: url.to_string(),
            cache_duration: Some(Duration::from_secs(300)),
        }
    }

    #[test]
    fn test_cache_insert_and_get() {
        let cache = VerdictCache::new(3600, 1000);

        cache.insert(
            "http://evil.example".to_string(),
            vec![malware_match("http://evil.example")],
        );

        let entry = cache.get("http://evil.example").unwrap();
        assert_eq!(entry.matches.len(), 1);
        assert_eq!(entry.matches[0].threat_type, "MALWARE");
    }

    #[test]
    fn test_cache_miss() {
        let cache = VerdictCache::new(3600, 1000);
        assert!(cache.get("http://unknown.example").is_none());
    }

    #[test]
    fn test_clean_verdict_is_cached() {
        let cache = VerdictCache::new(3600, 1000);

        cache.insert("http://ok.example".to_string(), vec![]);

        let entry = cache.get("http://ok.example").unwrap();
        assert!(entry.matches.is_empty());
    }

    #[test]
    fn test_cache_expiration() {
        let cache = VerdictCache::new(0, 1000); // 0 second TTL

        cache.insert("http://evil.example".to_string(), vec![]);

        thread::sleep(Duration::from_millis(10));
        assert!(cache.get("http://evil.example").is_none());
    }

    #[test]
    fn test_cache_custom_ttl() {
        let cache = VerdictCache::new(3600, 1000);

        cache.insert_with_ttl(
            "http://evil.example".to_string(),
            vec![],
            Duration::from_millis(1),
        );

        thread::sleep(Duration::from_millis(10));
        assert!(cache.get("http://evil.example").is_none());
    }

    #[test]
    fn test_capacity_evicts_earliest_expiring() {
        let cache = VerdictCache::new(3600, 2);

        cache.insert_with_ttl("a".to_string(), vec![], Duration::from_secs(10));
        cache.insert_with_ttl("b".to_string(), vec![], Duration::from_secs(1000));
        cache.insert_with_ttl("c".to_string(), vec![], Duration::from_secs(100));

        assert!(cache.len() <= 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let cache = VerdictCache::new(3600, 1000);

        // Parses as a Duration but has no representable expiry time
        cache.insert_with_ttl(
            "http://evil.example".to_string(),
            vec![],
            Duration::from_secs(u64::MAX),
        );

        assert!(cache.get("http://evil.example").is_none());
    }

    #[test]
    fn test_cache_cleanup() {
        let cache = VerdictCache::new(0, 1000); // 0 second TTL

        cache.insert("a".to_string(), vec![]);
        cache.insert("b".to_string(), vec![]);

        thread::sleep(Duration::from_millis(10));
        cache.cleanup();

        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_cache_clear() {
        let cache = VerdictCache::new(3600, 1000);

        cache.insert("a".to_string(), vec![]);
        cache.insert("b".to_string(), vec![]);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("verdicts.json");

        let cache = VerdictCache::new(3600, 1000);
        cache.insert(
            "http://evil.example".to_string(),
            vec![malware_match("http://evil.example")],
        );
        cache.insert("http://ok.example".to_string(), vec![]);
        cache.save(&path).unwrap();

        let restored = VerdictCache::new(3600, 1000);
        assert_eq!(restored.load(&path).unwrap(), 2);
        assert_eq!(
            restored.get("http://evil.example").unwrap().matches[0].threat_type,
            "MALWARE"
        );
        assert!(restored.get("http://ok.example").unwrap().matches.is_empty());
    }

    #[test]
    fn test_load_drops_expired_entries() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("verdicts.json");

        let cache = VerdictCache::new(3600, 1000);
        cache.insert_with_ttl("stale".to_string(), vec![], Duration::from_millis(1));
        cache.insert_with_ttl("fresh".to_string(), vec![], Duration::from_secs(3600));
        cache.save(&path).unwrap();

        thread::sleep(Duration::from_millis(10));

        let restored = VerdictCache::new(3600, 1000);
        assert_eq!(restored.load(&path).unwrap(), 1);
        assert!(restored.get("stale").is_none());
        assert!(restored.get("fresh").is_some());
    }

    #[test]
    fn test_load_missing_file_is_empty_start() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = VerdictCache::new(3600, 1000);

        assert_eq!(cache.load(&dir.path().join("absent.json")).unwrap(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("verdicts.json");
        std::fs::write(&path, "not json").unwrap();

        let cache = VerdictCache::new(3600, 1000);
        assert!(cache.load(&path).is_err());
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("verdicts.json");
        std::fs::write(&path, r#"{"version": 99, "entries": {}}"#).unwrap();

        let cache = VerdictCache::new(3600, 1000);
        assert!(cache.load(&path).is_err());
    }
}
