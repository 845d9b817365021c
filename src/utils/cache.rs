//! Local caching for search results and paper metadata.
//!
//! # Cache Structure
//!
//! ```text
//! ~/.cache/arxiv-fetch/
//!   searches/
//!     <md5 of query parameters>.json
//!   papers/
//!     <arxiv id>.json
//! ```
//!
//! Each file holds `{"payload": ..., "cached_at": "<RFC 3339>"}`. The two
//! namespaces expire independently. Entries that are expired, unreadable or
//! carry a bad timestamp are deleted when they are read.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::CacheConfig;
use crate::error::ArxivError;
use crate::models::Paper;

/// The two independently expiring cache areas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheNamespace {
    /// Search results keyed by query hash
    Search,
    /// Single papers keyed by arXiv id
    Paper,
}

impl CacheNamespace {
    pub fn dir_name(&self) -> &'static str {
        match self {
            CacheNamespace::Search => "searches",
            CacheNamespace::Paper => "papers",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    payload: T,
    cached_at: DateTime<Utc>,
}

/// Timestamp-only view of an entry, used when sweeping
#[derive(Debug, Deserialize)]
struct EntryStamp {
    cached_at: DateTime<Utc>,
}

/// Result of a cache lookup
#[derive(Debug, PartialEq)]
pub enum CacheResult<T> {
    /// Item was found and is valid
    Hit(T),

    /// Item was not found, or was unreadable and has been removed
    Miss,

    /// Item was found but had expired and has been removed
    Expired,
}

impl<T> CacheResult<T> {
    /// The cached value, if any
    pub fn hit(self) -> Option<T> {
        match self {
            CacheResult::Hit(value) => Some(value),
            _ => None,
        }
    }
}

/// Number of entries removed from each namespace by a sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearedCounts {
    pub searches: usize,
    pub papers: usize,
}

impl ClearedCounts {
    pub fn total(&self) -> usize {
        self.searches + self.papers
    }
}

/// Cache service for storing and retrieving cached data
#[derive(Debug, Clone)]
pub struct CacheService {
    /// Base cache directory
    base_dir: PathBuf,

    search_dir: PathBuf,

    paper_dir: PathBuf,

    config: CacheConfig,
}

impl CacheService {
    /// Create a new cache service with the given config
    pub fn from_config(config: CacheConfig) -> Self {
        let base_dir = config
            .directory
            .clone()
            .unwrap_or_else(crate::config::default_cache_dir);

        let search_dir = base_dir.join(CacheNamespace::Search.dir_name());
        let paper_dir = base_dir.join(CacheNamespace::Paper.dir_name());

        Self {
            base_dir,
            search_dir,
            paper_dir,
            config,
        }
    }

    /// Initialize the cache directories
    pub fn initialize(&self) -> std::io::Result<()> {
        if self.config.enabled {
            fs::create_dir_all(&self.search_dir)?;
            fs::create_dir_all(&self.paper_dir)?;
            tracing::debug!(dir = %self.base_dir.display(), "Cache initialized");
        } else {
            tracing::debug!("Cache is disabled");
        }
        Ok(())
    }

    /// Check if caching is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.base_dir
    }

    fn namespace_dir(&self, namespace: CacheNamespace) -> &Path {
        match namespace {
            CacheNamespace::Search => &self.search_dir,
            CacheNamespace::Paper => &self.paper_dir,
        }
    }

    /// Time-to-live of a namespace
    pub fn ttl(&self, namespace: CacheNamespace) -> Duration {
        match namespace {
            CacheNamespace::Search => Duration::from_secs(self.config.search_ttl_secs),
            CacheNamespace::Paper => Duration::from_secs(self.config.paper_ttl_secs),
        }
    }

    fn entry_path(&self, namespace: CacheNamespace, key: &str) -> PathBuf {
        self.namespace_dir(namespace)
            .join(format!("{}.json", file_key(key)))
    }

    fn is_expired(&self, namespace: CacheNamespace, cached_at: DateTime<Utc>) -> bool {
        let ttl = chrono::Duration::from_std(self.ttl(namespace))
            .unwrap_or(chrono::Duration::MAX);
        Utc::now().signed_duration_since(cached_at) > ttl
    }

    /// Look up `key`, removing the entry if it is expired or unreadable
    pub fn get<T: DeserializeOwned>(&self, namespace: CacheNamespace, key: &str) -> CacheResult<T> {
        if !self.is_enabled() {
            return CacheResult::Miss;
        }

        let path = self.entry_path(namespace, key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => {
                tracing::debug!(key, namespace = namespace.dir_name(), "Cache MISS");
                return CacheResult::Miss;
            }
        };

        match serde_json::from_str::<CacheEntry<T>>(&content) {
            Ok(entry) if self.is_expired(namespace, entry.cached_at) => {
                tracing::debug!(key, namespace = namespace.dir_name(), "Cache entry expired");
                remove_entry(&path);
                CacheResult::Expired
            }
            Ok(entry) => {
                tracing::debug!(key, namespace = namespace.dir_name(), "Cache HIT");
                CacheResult::Hit(entry.payload)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Removing corrupt cache entry");
                remove_entry(&path);
                CacheResult::Miss
            }
        }
    }

    /// Store `payload` under `key`, overwriting any previous entry
    pub fn put<T: Serialize + ?Sized>(
        &self,
        namespace: CacheNamespace,
        key: &str,
        payload: &T,
    ) -> Result<(), ArxivError> {
        self.write_entry(namespace, key, payload, Utc::now())
    }

    fn write_entry<T: Serialize + ?Sized>(
        &self,
        namespace: CacheNamespace,
        key: &str,
        payload: &T,
        cached_at: DateTime<Utc>,
    ) -> Result<(), ArxivError> {
        if !self.is_enabled() {
            return Ok(());
        }

        let dir = self.namespace_dir(namespace);
        fs::create_dir_all(dir)?;

        let entry = CacheEntry { payload, cached_at };
        let content = serde_json::to_string_pretty(&entry)?;
        fs::write(self.entry_path(namespace, key), content)?;
        tracing::debug!(key, namespace = namespace.dir_name(), "Cached entry");
        Ok(())
    }

    /// Cached search result for a query key
    pub fn get_search<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(CacheNamespace::Search, key).hit()
    }

    pub fn put_search<T: Serialize + ?Sized>(&self, key: &str, result: &T) -> Result<(), ArxivError> {
        self.put(CacheNamespace::Search, key, result)
    }

    /// Cached metadata for one paper id
    pub fn get_paper(&self, id: &str) -> Option<Paper> {
        self.get(CacheNamespace::Paper, id).hit()
    }

    pub fn put_paper(&self, id: &str, paper: &Paper) -> Result<(), ArxivError> {
        self.put(CacheNamespace::Paper, id, paper)
    }

    /// Delete every expired or unreadable entry in both namespaces
    pub fn clear_expired(&self) -> ClearedCounts {
        if !self.is_enabled() {
            return ClearedCounts::default();
        }

        let counts = ClearedCounts {
            searches: self.sweep(CacheNamespace::Search),
            papers: self.sweep(CacheNamespace::Paper),
        };
        tracing::info!(
            searches = counts.searches,
            papers = counts.papers,
            "Cleared expired cache entries"
        );
        counts
    }

    fn sweep(&self, namespace: CacheNamespace) -> usize {
        let mut removed = 0;
        for path in json_files(self.namespace_dir(namespace)) {
            let keep = fs::read_to_string(&path)
                .ok()
                .and_then(|content| serde_json::from_str::<EntryStamp>(&content).ok())
                .is_some_and(|stamp| !self.is_expired(namespace, stamp.cached_at));
            if !keep && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Clear all cached data
    pub fn clear_all(&self) -> std::io::Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let _ = fs::remove_dir_all(&self.search_dir);
        let _ = fs::remove_dir_all(&self.paper_dir);
        self.initialize()?;
        tracing::info!("Cache cleared");
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        if !self.is_enabled() {
            return CacheStats::disabled();
        }

        let (search_count, search_bytes) = dir_usage(&self.search_dir);
        let (paper_count, paper_bytes) = dir_usage(&self.paper_dir);

        CacheStats {
            enabled: true,
            cache_dir: self.base_dir.clone(),
            search_count,
            paper_count,
            search_size_kb: search_bytes / 1024,
            paper_size_kb: paper_bytes / 1024,
            total_size_kb: (search_bytes + paper_bytes) / 1024,
            ttl_search: self.ttl(CacheNamespace::Search),
            ttl_paper: self.ttl(CacheNamespace::Paper),
        }
    }
}

/// Map a key onto a safe file stem
fn file_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn remove_entry(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        tracing::debug!(path = %path.display(), error = %e, "Could not remove cache entry");
    }
}

fn json_files(dir: &Path) -> Vec<PathBuf> {
    dir.read_dir()
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
                .collect()
        })
        .unwrap_or_default()
}

fn dir_usage(dir: &Path) -> (usize, u64) {
    json_files(dir).iter().fold((0, 0), |(count, bytes), path| {
        let len = path.metadata().map(|m| m.len()).unwrap_or(0);
        (count + 1, bytes + len)
    })
}

/// Statistics about the cache
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Whether caching is enabled
    pub enabled: bool,

    /// Cache directory path
    pub cache_dir: PathBuf,

    /// Number of cached search results
    pub search_count: usize,

    /// Number of cached papers
    pub paper_count: usize,

    /// Size of search cache in KB
    pub search_size_kb: u64,

    /// Size of paper cache in KB
    pub paper_size_kb: u64,

    /// Total size in KB
    pub total_size_kb: u64,

    /// TTL for search results
    pub ttl_search: Duration,

    /// TTL for paper metadata
    pub ttl_paper: Duration,
}

impl CacheStats {
    /// Return stats indicating cache is disabled
    fn disabled() -> Self {
        Self {
            enabled: false,
            cache_dir: PathBuf::new(),
            search_count: 0,
            paper_count: 0,
            search_size_kb: 0,
            paper_size_kb: 0,
            total_size_kb: 0,
            ttl_search: Duration::ZERO,
            ttl_paper: Duration::ZERO,
        }
    }
}
