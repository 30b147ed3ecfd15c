//! Media-related data models.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Classification of a scanned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Video,
    Subtitle,
    Sidecar,
}

/// Language and flag markers parsed from a subtitle filename.
///
/// `Movie.por2.forced.srt` parses to base `Movie`, language `por`,
/// variant 2, forced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleTag {
    /// Filename before the language code and flags.
    pub base: String,
    /// Normalized ISO 639-2/B code, if the filename carries one.
    pub language: Option<String>,
    /// Variant index: 1 for `por`, 2 for `por2`.
    pub variant: u8,
    /// `.forced` marker present.
    pub forced: bool,
    /// `.sdh` marker present.
    pub sdh: bool,
    /// Lowercase extension without the dot.
    pub extension: String,
}

/// A file found by the scanner. Immutable once scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    /// Full path to the file.
    pub path: PathBuf,
    /// File name without path.
    pub filename: String,
    /// Video, subtitle or sidecar.
    pub kind: FileKind,
    /// File size in bytes.
    pub size: u64,
    /// Parsed subtitle markers (subtitles only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<SubtitleTag>,
}

impl MediaFile {
    /// File name without its last extension.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Lowercase extension without the dot.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    /// Directory containing the file.
    pub fn parent_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Kind hint passed to the metadata resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Series => write!(f, "series"),
        }
    }
}

/// What a video is, as inferred from its name and location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MediaIdentity {
    Movie {
        title: String,
        year: Option<u16>,
        /// Disc or part marker for split releases (`cd1`, `part2`).
        part: Option<String>,
    },
    Episode {
        series: String,
        year: Option<u16>,
        season: u16,
        episode: u16,
        /// Last episode of a multi-episode file.
        episode_end: Option<u16>,
    },
}

impl MediaIdentity {
    /// Title (movie) or series title (episode).
    pub fn title(&self) -> &str {
        match self {
            MediaIdentity::Movie { title, .. } => title,
            MediaIdentity::Episode { series, .. } => series,
        }
    }

    pub fn year(&self) -> Option<u16> {
        match self {
            MediaIdentity::Movie { year, .. } | MediaIdentity::Episode { year, .. } => *year,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            MediaIdentity::Movie { .. } => MediaKind::Movie,
            MediaIdentity::Episode { .. } => MediaKind::Series,
        }
    }

    /// Case-insensitive key; two videos with the same key compete for one slot.
    pub fn key(&self) -> String {
        match self {
            MediaIdentity::Movie { title, year, part } => format!(
                "movie|{}|{}|{}",
                title.to_lowercase(),
                year.map(|y| y.to_string()).unwrap_or_default(),
                part.as_deref().unwrap_or_default()
            ),
            MediaIdentity::Episode {
                series,
                season,
                episode,
                ..
            } => format!("episode|{}|{}|{}", series.to_lowercase(), season, episode),
        }
    }
}

impl std::fmt::Display for MediaIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaIdentity::Movie { title, year, .. } => match year {
                Some(y) => write!(f, "{} ({})", title, y),
                None => write!(f, "{}", title),
            },
            MediaIdentity::Episode {
                series,
                season,
                episode,
                ..
            } => write!(f, "{} S{:02}E{:02}", series, season, episode),
        }
    }
}

/// How much the detector trusts the title it extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Low,
}

/// Language assigned to a subtitle after inference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleLanguage {
    Code(String),
    Unknown,
}

impl SubtitleLanguage {
    pub fn code(&self) -> Option<&str> {
        match self {
            SubtitleLanguage::Code(c) => Some(c),
            SubtitleLanguage::Unknown => None,
        }
    }
}

/// A subtitle attached to a media item, with its resolved language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleCandidate {
    pub file: MediaFile,
    pub language: SubtitleLanguage,
    /// True when the language came from the word-count heuristic.
    pub inferred: bool,
}

impl SubtitleCandidate {
    /// Subtitle markers; every candidate is built from a parsed subtitle file.
    pub fn tag(&self) -> Option<&SubtitleTag> {
        self.file.subtitle.as_ref()
    }

    pub fn variant(&self) -> u8 {
        self.tag().map(|t| t.variant).unwrap_or(1)
    }

    pub fn is_forced(&self) -> bool {
        self.tag().map(|t| t.forced).unwrap_or(false)
    }

    pub fn is_sdh(&self) -> bool {
        self.tag().map(|t| t.sdh).unwrap_or(false)
    }
}

/// One logical title unit with its chosen video and attached files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub identity: MediaIdentity,
    pub confidence: Confidence,
    /// Id recovered from an already-organized folder name.
    pub local_id: Option<ExternalId>,
    /// Resolution tag found in the filename (`1080p`).
    pub quality: Option<String>,
    pub video: MediaFile,
    /// Subtitles attached to the video, before deduplication.
    pub subtitles: Vec<SubtitleCandidate>,
    /// Same-stem files (`.nfo`, artwork) that travel with the video.
    pub sidecars: Vec<MediaFile>,
}

impl MediaItem {
    /// Query for the metadata resolver.
    pub fn query(&self) -> MetadataQuery {
        MetadataQuery {
            title: self.identity.title().to_string(),
            year: self.identity.year(),
            kind: self.identity.kind(),
        }
    }
}

/// External database id used in folder names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "source", content = "id", rename_all = "lowercase")]
pub enum ExternalId {
    Tmdb(u64),
    Tvdb(u64),
    Imdb(String),
}

impl std::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExternalId::Tmdb(id) => write!(f, "tmdbid-{}", id),
            ExternalId::Tvdb(id) => write!(f, "tvdbid-{}", id),
            ExternalId::Imdb(id) => write!(f, "imdbid-{}", id),
        }
    }
}

impl std::str::FromStr for ExternalId {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let (kind, id) = s
            .split_once('-')
            .ok_or_else(|| crate::Error::other(format!("Invalid external id: {}", s)))?;
        let numeric = || {
            id.parse::<u64>()
                .map_err(|_| crate::Error::other(format!("Invalid external id: {}", s)))
        };
        match kind.to_lowercase().as_str() {
            "tmdbid" => Ok(ExternalId::Tmdb(numeric()?)),
            "tvdbid" => Ok(ExternalId::Tvdb(numeric()?)),
            "imdbid" if id.starts_with("tt") => Ok(ExternalId::Imdb(id.to_string())),
            _ => Err(crate::Error::other(format!("Invalid external id: {}", s))),
        }
    }
}

/// Lookup key sent to the metadata resolver.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MetadataQuery {
    pub title: String,
    pub year: Option<u16>,
    pub kind: MediaKind,
}

/// Canonical record returned by the metadata resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMetadata {
    /// Canonical title.
    pub title: String,
    /// Release (or first air) year.
    pub year: Option<u16>,
    /// External id used for the folder suffix.
    pub external_id: ExternalId,
    /// Resolver confidence that the kind (movie/series) is right, 0.0 - 1.0.
    pub kind_confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_id_display_and_parse() {
        assert_eq!(ExternalId::Tmdb(603).to_string(), "tmdbid-603");
        assert_eq!(
            "tvdbid-81189".parse::<ExternalId>().unwrap(),
            ExternalId::Tvdb(81189)
        );
        assert_eq!(
            "imdbid-tt0133093".parse::<ExternalId>().unwrap(),
            ExternalId::Imdb("tt0133093".to_string())
        );
        assert!("tmdbid-abc".parse::<ExternalId>().is_err());
        assert!("foo".parse::<ExternalId>().is_err());
    }

    #[test]
    fn test_identity_key_ignores_case() {
        let a = MediaIdentity::Episode {
            series: "Breaking Bad".to_string(),
            year: None,
            season: 1,
            episode: 1,
            episode_end: None,
        };
        let b = MediaIdentity::Episode {
            series: "breaking bad".to_string(),
            year: Some(2008),
            season: 1,
            episode: 1,
            episode_end: None,
        };
        assert_eq!(a.key(), b.key());
        assert_eq!(a.to_string(), "Breaking Bad S01E01");
    }

    #[test]
    fn test_movie_parts_are_distinct() {
        let cd1 = MediaIdentity::Movie {
            title: "Heat".to_string(),
            year: Some(1995),
            part: Some("cd1".to_string()),
        };
        let cd2 = MediaIdentity::Movie {
            title: "Heat".to_string(),
            year: Some(1995),
            part: Some("cd2".to_string()),
        };
        assert_ne!(cd1.key(), cd2.key());
    }
}
