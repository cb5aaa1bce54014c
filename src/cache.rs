//! Time-boxed cache of decoded months.
//!
//! Each month is stored as one JSON envelope under a key derived from the
//! month id. Entries older than the TTL are refetched and overwritten; there
//! is no other eviction. Two concurrent misses for the same month both hit
//! the network and the last write wins.

use crate::error::Result;
use crate::fetch::MonthFetcher;
use crate::months::Month;
use crate::schema::ProductDataset;
use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Bumped whenever the envelope or dataset layout changes.
pub const CACHE_VERSION: u32 = 1;

const CACHE_KEY_PREFIX: &str = "funnel-data";

/// Scratch entry written and removed again while probing a directory.
const PROBE_KEY: &str = "probe";

pub fn cache_key(month: Month) -> String {
    format!("{}:{}", CACHE_KEY_PREFIX, month.id())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEnvelope {
    pub version: u32,
    pub data: Vec<ProductDataset>,
    /// Write time in epoch milliseconds.
    pub timestamp: i64,
}

impl CacheEnvelope {
    pub fn new(data: Vec<ProductDataset>, written_at: DateTime<Utc>) -> Self {
        Self {
            version: CACHE_VERSION,
            data,
            timestamp: written_at.timestamp_millis(),
        }
    }

    /// `None` when the stored timestamp is out of range or lies after `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        now.timestamp_millis()
            .checked_sub(self.timestamp)
            .filter(|millis| *millis >= 0)
            .and_then(Duration::try_milliseconds)
    }

    /// An entry without a usable age is never fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now).is_some_and(|age| age < ttl)
    }
}

/// Opaque string key-value persistence.
pub trait CacheStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn remove(&self, key: &str) -> Result<()> {
        fs::remove_file(self.path_for(key))?;
        Ok(())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

impl CacheStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    File,
    Memory,
}

/// The store chosen for this session. Picked once by [`CacheBackend::probe`]
/// and never switched afterwards.
#[derive(Debug)]
pub enum CacheBackend {
    File(FileStore),
    Memory(MemoryStore),
}

impl CacheBackend {
    /// Uses `dir` when it can be created and written to, memory otherwise.
    pub fn probe(dir: Option<&Path>) -> Self {
        let Some(dir) = dir else {
            debug!("No cache directory configured, caching in memory");
            return Self::Memory(MemoryStore::new());
        };

        match FileStore::new(dir).and_then(|store| {
            store.write(PROBE_KEY, "{}")?;
            store.remove(PROBE_KEY)?;
            Ok(store)
        }) {
            Ok(store) => {
                debug!("Caching months under {}", dir.display());
                Self::File(store)
            }
            Err(e) => {
                warn!(
                    "Cache directory {} is not writable ({}), caching in memory",
                    dir.display(),
                    e
                );
                Self::Memory(MemoryStore::new())
            }
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::File(_) => BackendKind::File,
            Self::Memory(_) => BackendKind::Memory,
        }
    }
}

impl CacheStore for CacheBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match self {
            Self::File(store) => store.read(key),
            Self::Memory(store) => store.read(key),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        match self {
            Self::File(store) => store.write(key, value),
            Self::Memory(store) => store.write(key, value),
        }
    }
}

pub struct MonthCache<F, S = CacheBackend> {
    fetcher: F,
    store: S,
    ttl: Duration,
}

impl<F: MonthFetcher + Sync, S: CacheStore> MonthCache<F, S> {
    pub fn new(fetcher: F, store: S, ttl: Duration) -> Self {
        Self {
            fetcher,
            store,
            ttl,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn get_or_fetch(&self, month_name: &str) -> Result<Vec<ProductDataset>> {
        self.get_or_fetch_at(month_name, Utc::now()).await
    }

    /// Serves a fresh entry without touching the network; otherwise fetches,
    /// stores the result stamped with `now` and returns it. A failed fetch
    /// leaves the stored entry as it was.
    pub async fn get_or_fetch_at(
        &self,
        month_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProductDataset>> {
        let month = Month::from_name(month_name)?;
        let key = cache_key(month);

        if let Some(envelope) = self.read_fresh(&key, now) {
            debug!("Cache hit for {} ({} products)", key, envelope.data.len());
            return Ok(envelope.data);
        }

        let data = self.fetcher.fetch_month(month_name).await?;

        let envelope = CacheEnvelope::new(data, now);
        match serde_json::to_string(&envelope) {
            Ok(text) => {
                if let Err(e) = self.store.write(&key, &text) {
                    warn!("Failed to persist cache entry {}: {}", key, e);
                }
            }
            Err(e) => warn!("Failed to serialize cache entry {}: {}", key, e),
        }

        Ok(envelope.data)
    }

    /// Fetches several months concurrently. Each month is independent;
    /// the first error aborts the whole batch.
    pub async fn get_many(&self, month_names: &[&str]) -> Result<Vec<Vec<ProductDataset>>> {
        try_join_all(month_names.iter().map(|name| self.get_or_fetch(name))).await
    }

    fn read_fresh(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEnvelope> {
        let text = match self.store.read(key) {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!("Cache miss for {}", key);
                return None;
            }
            Err(e) => {
                warn!("Failed to read cache entry {}: {}", key, e);
                return None;
            }
        };

        let envelope: CacheEnvelope = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Discarding unreadable cache entry {}: {}", key, e);
                return None;
            }
        };

        if envelope.version != CACHE_VERSION {
            debug!(
                "Discarding cache entry {} with version {} (current {})",
                key, envelope.version, CACHE_VERSION
            );
            return None;
        }

        let Some(age) = envelope.age(now) else {
            debug!(
                "Discarding cache entry {} with unusable timestamp {}",
                key, envelope.timestamp
            );
            return None;
        };

        if !envelope.is_fresh(now, self.ttl) {
            debug!("Cache entry {} is stale ({}s old)", key, age.num_seconds());
            return None;
        }

        Some(envelope)
    }
}
