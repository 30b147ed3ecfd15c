//! On-disk metadata cache.
//!
//! Wraps a resolver and remembers its answers (hits and misses) in a JSON
//! file, so re-running a batch does not repeat remote lookups. Entries older
//! than the configured number of days are dropped on load. Errors are never
//! cached.

use crate::models::media::{MetadataQuery, ResolvedMetadata};
use crate::services::resolver::MetadataResolver;
use crate::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Cache format version.
pub const CACHE_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    metadata: Option<ResolvedMetadata>,
    cached_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    version: String,
    entries: BTreeMap<String, CacheEntry>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: BTreeMap<String, CacheEntry>,
    dirty: bool,
}

/// Cache key: kind, lowercase title and year.
pub fn cache_key(query: &MetadataQuery) -> String {
    format!(
        "{:?}|{}|{}",
        query.kind,
        query.title.to_lowercase(),
        query.year.map(|y| y.to_string()).unwrap_or_default()
    )
}

/// Resolver with a persistent answer cache in front of it.
pub struct CachedResolver<R> {
    inner: R,
    path: PathBuf,
    state: Mutex<CacheState>,
}

impl<R: MetadataResolver> CachedResolver<R> {
    /// Load the cache at `path`, dropping entries older than `max_age_days`.
    ///
    /// A missing or unreadable file starts an empty cache.
    pub fn open(inner: R, path: &Path, max_age_days: u32) -> Self {
        let mut entries = match read_cache(path) {
            Ok(entries) => entries,
            Err(e) => {
                if path.exists() {
                    tracing::warn!("Ignoring metadata cache {:?}: {}", path, e);
                }
                BTreeMap::new()
            }
        };

        let cutoff = Utc::now() - Duration::days(i64::from(max_age_days));
        let before = entries.len();
        entries.retain(|_, entry| entry.cached_at >= cutoff);
        let expired = before - entries.len();
        if expired > 0 {
            tracing::debug!("Dropped {} expired cache entries", expired);
        }
        tracing::debug!("Metadata cache {:?}: {} entries", path, entries.len());

        Self {
            inner,
            path: path.to_path_buf(),
            state: Mutex::new(CacheState {
                entries,
                dirty: expired > 0,
            }),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, key: &str) -> Option<Option<ResolvedMetadata>> {
        let state = self.state.lock().ok()?;
        state.entries.get(key).map(|entry| entry.metadata.clone())
    }

    fn remember(&self, key: String, metadata: Option<ResolvedMetadata>) {
        if let Ok(mut state) = self.state.lock() {
            state.entries.insert(
                key,
                CacheEntry {
                    metadata,
                    cached_at: Utc::now(),
                },
            );
            state.dirty = true;
        }
    }

    /// Write the cache file if anything changed since it was loaded.
    pub fn save(&self) -> Result<()> {
        let json = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| crate::Error::other("Metadata cache lock poisoned"))?;
            if !state.dirty {
                return Ok(());
            }
            state.dirty = false;
            let file = CacheFile {
                version: CACHE_VERSION.to_string(),
                entries: state.entries.clone(),
            };
            serde_json::to_string_pretty(&file)?
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, json)?;
        tracing::debug!("Metadata cache saved to {:?}", self.path);
        Ok(())
    }
}

fn read_cache(path: &Path) -> Result<BTreeMap<String, CacheEntry>> {
    let content = fs::read_to_string(path)?;
    let file: CacheFile = serde_json::from_str(&content)?;
    if file.version != CACHE_VERSION {
        return Err(crate::Error::other(format!(
            "Unsupported cache version {}",
            file.version
        )));
    }
    Ok(file.entries)
}

impl<R: MetadataResolver> MetadataResolver for CachedResolver<R> {
    fn resolve(
        &self,
        query: &MetadataQuery,
    ) -> impl Future<Output = Result<Option<ResolvedMetadata>>> + Send {
        async move {
            let key = cache_key(query);
            if let Some(hit) = self.cached(&key) {
                tracing::debug!("Cache hit for {}", query.title);
                return Ok(hit);
            }
            let resolved = self.inner.resolve(query).await?;
            self.remember(key, resolved.clone());
            Ok(resolved)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::media::{ExternalId, MediaKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Resolves everything to the same id and counts calls.
    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl MetadataResolver for Counting {
        fn resolve(
            &self,
            query: &MetadataQuery,
        ) -> impl Future<Output = Result<Option<ResolvedMetadata>>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let found = (query.title != "Nothing").then(|| ResolvedMetadata {
                title: query.title.clone(),
                year: query.year,
                external_id: ExternalId::Tmdb(603),
                kind_confidence: 1.0,
            });
            async move { Ok(found) }
        }
    }

    /// Always fails.
    struct Failing;

    impl MetadataResolver for Failing {
        fn resolve(
            &self,
            _query: &MetadataQuery,
        ) -> impl Future<Output = Result<Option<ResolvedMetadata>>> + Send {
            async { Err(crate::Error::other("service unavailable")) }
        }
    }

    fn query(title: &str) -> MetadataQuery {
        MetadataQuery {
            title: title.to_string(),
            year: Some(1999),
            kind: MediaKind::Movie,
        }
    }

    #[tokio::test]
    async fn test_answers_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache").join("metadata.json");

        let cache = CachedResolver::open(Counting::default(), &path, 30);
        assert!(cache.resolve(&query("Matrix")).await.unwrap().is_some());
        assert!(cache.resolve(&query("Nothing")).await.unwrap().is_none());
        assert!(cache.resolve(&query("matrix")).await.unwrap().is_some());
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 2);
        cache.save().unwrap();

        let reopened = CachedResolver::open(Counting::default(), &path, 30);
        assert_eq!(reopened.len(), 2);
        let hit = reopened.resolve(&query("Matrix")).await.unwrap().unwrap();
        assert_eq!(hit.external_id, ExternalId::Tmdb(603));
        assert!(reopened.resolve(&query("Nothing")).await.unwrap().is_none());
        assert_eq!(reopened.inner().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");

        let cache = CachedResolver::open(Failing, &path, 30);
        assert!(cache.resolve(&query("Matrix")).await.is_err());
        assert!(cache.is_empty());
        cache.save().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");
        let mut entries = BTreeMap::new();
        entries.insert(
            cache_key(&query("Old")),
            CacheEntry {
                metadata: None,
                cached_at: Utc::now() - Duration::days(40),
            },
        );
        entries.insert(
            cache_key(&query("Fresh")),
            CacheEntry {
                metadata: None,
                cached_at: Utc::now() - Duration::days(2),
            },
        );
        let file = CacheFile {
            version: CACHE_VERSION.to_string(),
            entries,
        };
        fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();

        let cache = CachedResolver::open(Counting::default(), &path, 30);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");
        fs::write(&path, "{ not json").unwrap();

        let cache = CachedResolver::open(Counting::default(), &path, 30);
        assert!(cache.is_empty());
    }
}
