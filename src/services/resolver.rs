//! Metadata resolver abstraction.

use crate::models::config::Config;
use crate::models::media::{MetadataQuery, ResolvedMetadata};
use crate::services::cache::CachedResolver;
use crate::services::tmdb::TmdbClient;
use crate::Result;
use std::future::Future;

/// Looks up canonical title, year and external id for a media item.
///
/// `Ok(None)` means unresolved. Errors are treated the same way by the
/// planner, so implementations may fail freely.
pub trait MetadataResolver: Send + Sync {
    fn resolve(
        &self,
        query: &MetadataQuery,
    ) -> impl Future<Output = Result<Option<ResolvedMetadata>>> + Send;
}

/// Resolver that never resolves anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl MetadataResolver for Offline {
    fn resolve(
        &self,
        _query: &MetadataQuery,
    ) -> impl Future<Output = Result<Option<ResolvedMetadata>>> + Send {
        async { Ok(None) }
    }
}

/// Resolver picked at runtime from configuration.
pub enum ConfiguredResolver {
    Offline(Offline),
    Tmdb(TmdbClient),
    CachedTmdb(CachedResolver<TmdbClient>),
}

impl ConfiguredResolver {
    /// TMDB when a key is configured and lookups are enabled, offline otherwise.
    pub fn from_config(config: &Config, offline: bool) -> Self {
        if offline || !config.fetch_metadata {
            return ConfiguredResolver::Offline(Offline);
        }
        match TmdbClient::from_config(&config.tmdb) {
            Ok(client) => match &config.metadata_cache {
                Some(path) => ConfiguredResolver::CachedTmdb(CachedResolver::open(
                    client,
                    path,
                    config.cache_days,
                )),
                None => ConfiguredResolver::Tmdb(client),
            },
            Err(e) => {
                tracing::warn!("Metadata lookups disabled: {}", e);
                ConfiguredResolver::Offline(Offline)
            }
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, ConfiguredResolver::Offline(_))
    }

    /// Write cached answers back to disk, if a cache is in use.
    pub fn persist(&self) -> Result<()> {
        match self {
            ConfiguredResolver::CachedTmdb(cache) => cache.save(),
            _ => Ok(()),
        }
    }
}

impl MetadataResolver for ConfiguredResolver {
    fn resolve(
        &self,
        query: &MetadataQuery,
    ) -> impl Future<Output = Result<Option<ResolvedMetadata>>> + Send {
        async move {
            match self {
                ConfiguredResolver::Offline(_) => Ok(None),
                ConfiguredResolver::Tmdb(client) => client.lookup(query).await,
                ConfiguredResolver::CachedTmdb(cache) => cache.resolve(query).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::TmdbConfig;
    use crate::models::media::MediaKind;

    #[tokio::test]
    async fn test_offline_never_resolves() {
        let query = MetadataQuery {
            title: "Matrix".to_string(),
            year: Some(1999),
            kind: MediaKind::Movie,
        };
        assert_eq!(Offline.resolve(&query).await.unwrap(), None);
    }

    #[test]
    fn test_configured_resolver_without_key_is_offline() {
        let config = Config {
            tmdb: TmdbConfig {
                api_key: None,
                language: "pt-BR".to_string(),
            },
            ..Default::default()
        };
        assert!(ConfiguredResolver::from_config(&config, false).is_offline());
        assert!(ConfiguredResolver::from_config(&Config::default(), true).is_offline());
    }
}
