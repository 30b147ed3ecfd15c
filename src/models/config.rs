//! Configuration model.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration.
///
/// Read-only for the core: every component receives a reference to it
/// instead of consulting global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default directory when none is given on the command line.
    pub work_dir: PathBuf,
    /// Simulate operations instead of touching the filesystem.
    pub dry_run: bool,
    /// Subtitle languages to keep (ISO 639-2/B codes).
    pub kept_languages: Vec<String>,
    /// Language assigned to code-less subtitles that pass the word check.
    pub home_language: String,
    /// Minimum number of Portuguese stop-words for the home-language check.
    pub min_pt_words: usize,
    /// Deduplicate `por2`/`por3` variants and rename the winner to `por`.
    pub rename_variants: bool,
    /// Add the home language code to code-less subtitles.
    pub add_language_codes: bool,
    /// Delete subtitles whose language is not kept.
    pub remove_foreign_subs: bool,
    /// Query the metadata resolver.
    pub fetch_metadata: bool,
    /// Append a resolution tag (` - 1080p`) to video filenames.
    pub add_quality_tag: bool,
    /// Timeout for a single metadata lookup, in seconds.
    pub resolve_timeout_secs: u64,
    /// JSON file remembering metadata answers. `None` disables the cache.
    pub metadata_cache: Option<PathBuf>,
    /// Days before a cached answer is looked up again.
    pub cache_days: u32,
    /// Maximum folders processed at once in batch mode.
    pub concurrency: usize,
    /// Directory for per-folder batch logs.
    pub log_dir: Option<PathBuf>,
    /// TMDB configuration.
    pub tmdb: TmdbConfig,
}

/// TMDB configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    /// API key.
    pub api_key: Option<String>,
    /// Language for responses.
    pub language: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            dry_run: true,
            kept_languages: vec!["por".to_string(), "eng".to_string()],
            home_language: "por".to_string(),
            min_pt_words: 5,
            rename_variants: true,
            add_language_codes: true,
            remove_foreign_subs: true,
            fetch_metadata: true,
            add_quality_tag: false,
            resolve_timeout_secs: 10,
            metadata_cache: Some(dirs_config_path().join("cache").join("metadata.json")),
            cache_days: 30,
            concurrency: 5,
            log_dir: Some(dirs_config_path().join("logs")),
            tmdb: TmdbConfig::default(),
        }
    }
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("TMDB_API_KEY").ok(),
            language: "pt-BR".to_string(),
        }
    }
}

impl Config {
    /// Whether subtitles in `language` survive foreign-language removal.
    pub fn keeps_language(&self, language: &str) -> bool {
        language == self.home_language || self.kept_languages.iter().any(|l| l == language)
    }

    /// Resolver timeout as a duration.
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    /// Check values the rest of the crate relies on.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(crate::Error::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        for lang in self.kept_languages.iter().chain(std::iter::once(&self.home_language)) {
            if lang.len() != 3 || !lang.chars().all(|c| c.is_ascii_lowercase()) {
                return Err(crate::Error::InvalidConfig(format!(
                    "language codes must be 3 lowercase letters, got {:?}",
                    lang
                )));
            }
        }
        Ok(())
    }
}

/// Get the configuration directory path.
fn dirs_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("library_fixer")
}

/// Load configuration from the default location, falling back to defaults.
pub fn load_config() -> Config {
    let config_path = dirs_config_path().join("config.toml");

    if config_path.exists() {
        match load_config_from(&config_path) {
            Ok(config) => return config,
            Err(e) => tracing::warn!("Ignoring config {:?}: {}", config_path, e),
        }
    }

    Config::default()
}

/// Load configuration from an explicit file.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(crate::Error::PathNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
