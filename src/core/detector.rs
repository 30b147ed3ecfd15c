//! Media detector module.
//!
//! Turns scanned files into `MediaItem`s: decides whether a video is a movie
//! or an episode, extracts a clean title, attaches subtitles and sidecars to
//! their video and infers the language of code-less subtitles.

use crate::core::scanner::ScanResult;
use crate::generators::filename::extract_disc_identifier;
use crate::models::config::Config;
use crate::models::media::{
    Confidence, ExternalId, FileKind, MediaFile, MediaIdentity, MediaItem, SubtitleCandidate,
    SubtitleLanguage,
};
use crate::utils::fs::is_sidecar_file;
use crate::utils::language::count_portuguese_words;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Number of subtitle lines sampled for language inference.
const LANGUAGE_SAMPLE_LINES: usize = 100;

/// Release tags. Everything from the first match onwards is dropped from a title.
const RELEASE_TAG_PATTERN: &str = r"(?i)\b(?:2160p|1080p|1080i|720p|576p|480p|4k|uhd|hdr|hdr10|hdr10plus|dolby ?vision|bluray|blu-ray|bdrip|brrip|bdremux|remux|web-?dl|webrip|web-?rip|hdtv|pdtv|dvdrip|dvdscr|dvd|hdrip|hdcam|camrip|x264|x265|h ?264|h ?265|hevc|avc|xvid|divx|10bit|8bit|aac|aac2|ac3|eac3|dts|dts-hd|ddp?5 1|ddp?2 0|atmos|truehd|flac|5 1|7 1|amzn|nflx|dsnp|hmax|atvp|pmtp|proper|repack|extended|unrated|remastered|uncut|imax|limited|internal|multi|dual|dublado|legendado|nacional|cd\d+|disc\d+|disk\d+|part\d+|dvd\d+)\b";

/// Folder names that hold subtitles for the videos one level up.
const SUBTITLE_FOLDERS: &[&str] = &["subs", "subtitles", "legendas", "legenda", "sub"];

/// Season/episode pair extracted from a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeToken {
    pub season: u16,
    pub episode: u16,
    pub episode_end: Option<u16>,
    /// Byte offset of the token; text before it is the series title.
    pub start: usize,
}

/// Detector output for one library folder.
#[derive(Debug, Default)]
pub struct Detection {
    /// One item per video, in video-path order.
    pub items: Vec<MediaItem>,
    /// Subtitles no video claimed.
    pub orphans: Vec<SubtitleCandidate>,
}

/// Media detector.
pub struct Detector<'a> {
    config: &'a Config,
    root: PathBuf,
}

fn captures<'t>(pattern: &str, text: &'t str) -> Option<regex::Captures<'t>> {
    regex::Regex::new(pattern).ok()?.captures(text)
}

fn parse_num(caps: &regex::Captures<'_>, idx: usize) -> Option<u16> {
    caps.get(idx).and_then(|m| m.as_str().parse().ok())
}

/// Replace `.` and `_` separators with spaces.
fn spaced(stem: &str) -> String {
    stem.replace(['.', '_'], " ")
}

/// Find an episode token in a filename stem.
///
/// Accepts `S01E02`, `S01E02-E03`, `T01E02`, `1x02`, `Season 1 Episode 2`
/// and `Temporada 1 Episodio 2`. `20x18` style tokens that read as a year
/// are rejected.
pub fn parse_episode_token(stem: &str) -> Option<EpisodeToken> {
    let text = spaced(stem);

    if let Some(caps) = captures(
        r"(?i)\bs(\d{1,2}) ?e(\d{1,3})(?: ?-? ?e(\d{1,3}))?",
        &text,
    ) {
        let start = caps.get(0)?.start();
        return Some(EpisodeToken {
            season: parse_num(&caps, 1)?,
            episode: parse_num(&caps, 2)?,
            episode_end: parse_num(&caps, 3),
            start,
        });
    }

    if let Some(caps) = captures(r"(?i)\bt(\d{1,2})e(\d{1,3})\b", &text) {
        return Some(EpisodeToken {
            season: parse_num(&caps, 1)?,
            episode: parse_num(&caps, 2)?,
            episode_end: None,
            start: caps.get(0)?.start(),
        });
    }

    if let Some(caps) = captures(
        r"(?i)\b(?:season|temporada|temp)\s*(\d{1,2})\s*-?\s*(?:episode|episodio|episódio|ep|e|cap|capitulo|capítulo)\s*(\d{1,3})\b",
        &text,
    ) {
        return Some(EpisodeToken {
            season: parse_num(&caps, 1)?,
            episode: parse_num(&caps, 2)?,
            episode_end: None,
            start: caps.get(0)?.start(),
        });
    }

    if let Ok(re) = regex::Regex::new(r"\b(\d{1,2})x(\d{2,3})\b") {
        for caps in re.captures_iter(&text) {
            let (Some(season), Some(episode)) = (parse_num(&caps, 1), parse_num(&caps, 2)) else {
                continue;
            };
            let joined = format!("{}{}", &caps[1], &caps[2]);
            let looks_like_year = joined.len() == 4
                && joined
                    .parse::<u16>()
                    .map(|y| (1900..=2099).contains(&y))
                    .unwrap_or(false);
            if looks_like_year {
                continue;
            }
            return Some(EpisodeToken {
                season,
                episode,
                episode_end: None,
                start: caps.get(0)?.start(),
            });
        }
    }

    None
}

/// Season number of a `Season 01` / `Temporada 1` / `S01` folder.
pub fn parse_season_folder(name: &str) -> Option<u16> {
    let caps = captures(r"(?i)^\s*(?:season|temporada|temp|s)\s*(\d{1,2})\s*$", name)?;
    parse_num(&caps, 1)
}

/// Episode number of a bare `E05` / `Ep 05` / `Episode 05` token.
fn parse_bare_episode(stem: &str) -> Option<(u16, usize)> {
    let text = spaced(stem);
    let caps = captures(
        r"(?i)\b(?:episode|episodio|episódio|ep|e|cap)\s*(\d{1,3})\b",
        &text,
    )?;
    Some((parse_num(&caps, 1)?, caps.get(0)?.start()))
}

/// Split a release name into a clean title and an optional year.
///
/// The year is the last `19xx`/`20xx` token that does not open the name, so
/// `2001.A.Space.Odyssey.1968` keeps `2001` in the title.
pub fn split_title_year(raw: &str) -> (String, Option<u16>) {
    let text = spaced(raw);
    let mut year = None;
    let mut title_part = text.as_str();

    if let Ok(re) = regex::Regex::new(r"\b(19\d{2}|20\d{2})\b") {
        if let Some(m) = re.find_iter(&text).filter(|m| m.start() > 0).last() {
            year = m.as_str().parse().ok();
            title_part = &text[..m.start()];
        }
    }

    (clean_title(title_part), year)
}

/// Strip release tags, brackets and stray separators from a title.
pub fn clean_title(raw: &str) -> String {
    let mut text = spaced(raw);

    if let Ok(re) = regex::Regex::new(RELEASE_TAG_PATTERN) {
        if let Some(m) = re.find(&text) {
            if m.start() > 0 {
                text.truncate(m.start());
            }
        }
    }

    // Bracketed groups, except a bare year in parentheses.
    if let Ok(re) = regex::Regex::new(r"\[[^\]]*\]|\{[^}]*\}|\([^)]*\)") {
        text = re
            .replace_all(&text, |caps: &regex::Captures<'_>| {
                let inner = caps[0].trim_matches(|c| matches!(c, '(' | ')'));
                if inner.len() == 4 && inner.chars().all(|c| c.is_ascii_digit()) {
                    caps[0].to_string()
                } else {
                    " ".to_string()
                }
            })
            .to_string();
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed
        .trim_matches(|c: char| matches!(c, '-' | '(' | '[' | ' ' | ',' | '+'))
        .to_string();

    title_case_if_lower(&trimmed)
}

/// Title-case names written entirely in lower case (`breaking bad`).
fn title_case_if_lower(s: &str) -> String {
    if s.chars().any(|c| c.is_uppercase()) {
        return s.to_string();
    }
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolution tag from a filename (`1080p`; `4K` and `UHD` map to `2160p`).
pub fn detect_quality(filename: &str) -> Option<String> {
    let caps = captures(r"(?i)\b(2160p|4k|uhd|1080p|720p|480p)\b", filename)?;
    let tag = caps.get(1)?.as_str().to_lowercase();
    Some(match tag.as_str() {
        "4k" | "uhd" => "2160p".to_string(),
        _ => tag,
    })
}

/// Title, year and id recovered from an already-organized folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizedFolder {
    pub title: String,
    pub year: Option<u16>,
    pub id: Option<ExternalId>,
}

/// Parse `Title (Year) [tmdbid-N]` style folder names.
///
/// Only names carrying a year or an id count as organized.
pub fn parse_organized_folder(name: &str) -> Option<OrganizedFolder> {
    let caps = captures(
        r"^(?P<title>.+?)(?: \((?P<year>\d{4})\))?(?: \[(?P<id>(?:tmdbid|tvdbid|imdbid)-[^\]]+)\])?$",
        name.trim(),
    )?;
    let year = caps.name("year").and_then(|m| m.as_str().parse().ok());
    let id = caps.name("id").and_then(|m| m.as_str().parse().ok());
    if year.is_none() && id.is_none() {
        return None;
    }
    Some(OrganizedFolder {
        title: caps.name("title")?.as_str().trim().to_string(),
        year,
        id,
    })
}

/// Titles are equal once both are cleaned the same way (`Dr. No` == `Dr No`).
fn same_title(a: &str, b: &str) -> bool {
    clean_title(a).eq_ignore_ascii_case(&clean_title(b))
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_string())
}

impl<'a> Detector<'a> {
    pub fn new(config: &'a Config, root: &Path) -> Self {
        Self {
            config,
            root: root.to_path_buf(),
        }
    }

    /// Classify every scanned file of one library folder.
    pub fn detect(&self, scan: &ScanResult) -> Detection {
        let mut by_dir: BTreeMap<PathBuf, Vec<usize>> = BTreeMap::new();
        for (idx, video) in scan.videos.iter().enumerate() {
            by_dir
                .entry(video.parent_dir().to_path_buf())
                .or_default()
                .push(idx);
        }

        let mut siblings: Vec<Vec<MediaFile>> = vec![Vec::new(); scan.videos.len()];
        let mut orphan_files = Vec::new();

        for sub in &scan.subtitles {
            match self.find_owner(sub, &scan.videos, &by_dir) {
                Some(idx) => siblings[idx].push(sub.clone()),
                None => orphan_files.push(sub.clone()),
            }
        }

        let mut claimed: HashSet<PathBuf> = HashSet::new();
        for other in scan.others.iter().filter(|f| is_sidecar_file(&f.path)) {
            if let Some(indices) = by_dir.get(other.parent_dir()) {
                let stem = other.stem().to_lowercase();
                let owner = indices
                    .iter()
                    .find(|&&i| scan.videos[i].stem().to_lowercase() == stem);
                if let Some(&idx) = owner {
                    if claimed.insert(other.path.clone()) {
                        siblings[idx].push(other.clone());
                    }
                }
            }
        }

        let items = scan
            .videos
            .iter()
            .zip(siblings)
            .map(|(video, files)| self.classify(video, &files))
            .collect();

        let orphans = orphan_files
            .into_iter()
            .map(|file| self.subtitle_candidate(file))
            .collect();

        Detection { items, orphans }
    }

    /// Build the `MediaItem` for a video and the files attached to it.
    pub fn classify(&self, video: &MediaFile, siblings: &[MediaFile]) -> MediaItem {
        let (identity, confidence, local_id) = self.identify(video);
        let quality = detect_quality(&video.filename);

        let mut subtitles = Vec::new();
        let mut sidecars = Vec::new();
        for file in siblings {
            match file.kind {
                FileKind::Subtitle => subtitles.push(self.subtitle_candidate(file.clone())),
                _ => sidecars.push(file.clone()),
            }
        }

        tracing::debug!(
            "Detected {} ({:?}) for {}: {} subtitles, {} sidecars",
            identity,
            confidence,
            video.filename,
            subtitles.len(),
            sidecars.len()
        );

        MediaItem {
            identity,
            confidence,
            local_id,
            quality,
            video: video.clone(),
            subtitles,
            sidecars,
        }
    }

    /// Work out what a video is from its name and location.
    fn identify(&self, video: &MediaFile) -> (MediaIdentity, Confidence, Option<ExternalId>) {
        let stem = video.stem();
        let parent = video.parent_dir();
        let parent_name = dir_name(parent);
        let season_folder = parent_name.as_deref().and_then(parse_season_folder);

        let token = parse_episode_token(&stem).or_else(|| {
            season_folder.and_then(|season| {
                parse_bare_episode(&stem).map(|(episode, start)| EpisodeToken {
                    season,
                    episode,
                    episode_end: None,
                    start,
                })
            })
        });

        if let Some(token) = token {
            let series_dir = if season_folder.is_some() {
                parent.parent()
            } else {
                Some(parent)
            };
            let folder = series_dir.and_then(|d| self.folder_info(d));

            let prefix = &spaced(&stem)[..token.start];
            let (mut series, mut year) = split_title_year(prefix);
            let mut local_id = None;
            let mut confidence = Confidence::High;

            if let Some(folder) = folder {
                if series.is_empty() || same_title(&series, &folder.title) {
                    series = folder.title;
                    year = year.or(folder.year);
                    local_id = folder.id;
                }
            }
            if series.is_empty() {
                series = stem.clone();
                confidence = Confidence::Low;
            }

            let identity = MediaIdentity::Episode {
                series,
                year,
                season: token.season,
                episode: token.episode,
                episode_end: token.episode_end,
            };
            return (identity, confidence, local_id);
        }

        let (mut title, mut year) = split_title_year(&stem);
        let mut local_id = None;
        let mut confidence = Confidence::High;

        if parent != self.root {
            if let Some(folder) = self.folder_info(parent) {
                if title.is_empty() || same_title(&title, &folder.title) {
                    title = folder.title;
                    year = year.or(folder.year);
                    local_id = folder.id;
                }
            }
        }
        if title.is_empty() {
            title = stem.clone();
            confidence = Confidence::Low;
        }

        let identity = MediaIdentity::Movie {
            title,
            year,
            part: extract_disc_identifier(&video.filename),
        };
        (identity, confidence, local_id)
    }

    /// Title information carried by a folder name, organized or not.
    fn folder_info(&self, dir: &Path) -> Option<OrganizedFolder> {
        if !dir.starts_with(&self.root) {
            return None;
        }
        let name = dir_name(dir)?;
        if let Some(organized) = parse_organized_folder(&name) {
            return Some(organized);
        }
        let (title, year) = split_title_year(&name);
        if title.is_empty() {
            return None;
        }
        Some(OrganizedFolder {
            title,
            year,
            id: None,
        })
    }

    /// Pick the video a subtitle belongs to.
    fn find_owner(
        &self,
        sub: &MediaFile,
        videos: &[MediaFile],
        by_dir: &BTreeMap<PathBuf, Vec<usize>>,
    ) -> Option<usize> {
        let base = sub
            .subtitle
            .as_ref()
            .map(|t| t.base.to_lowercase())
            .unwrap_or_else(|| sub.stem().to_lowercase());

        let dir = sub.parent_dir();
        let mut search_dirs = vec![dir];
        let in_subs_folder = dir_name(dir)
            .map(|n| SUBTITLE_FOLDERS.contains(&n.to_lowercase().as_str()))
            .unwrap_or(false);
        if in_subs_folder {
            if let Some(parent) = dir.parent() {
                search_dirs.push(parent);
            }
        }

        for search_dir in search_dirs {
            let Some(indices) = by_dir.get(search_dir) else {
                continue;
            };

            if let Some(&idx) = indices
                .iter()
                .find(|&&i| videos[i].stem().to_lowercase() == base)
            {
                return Some(idx);
            }

            if let Some(sub_token) = parse_episode_token(&base) {
                if let Some(&idx) = indices.iter().find(|&&i| {
                    parse_episode_token(&videos[i].stem())
                        .map(|t| t.season == sub_token.season && t.episode == sub_token.episode)
                        .unwrap_or(false)
                }) {
                    return Some(idx);
                }
            }

            if indices.len() == 1 {
                return Some(indices[0]);
            }

            if let Some(&idx) = indices
                .iter()
                .filter(|&&i| base.starts_with(&videos[i].stem().to_lowercase()))
                .max_by_key(|&&i| videos[i].stem().len())
            {
                return Some(idx);
            }
        }

        None
    }

    /// Resolve the language of a subtitle, sampling its text when the
    /// filename carries no code.
    fn subtitle_candidate(&self, file: MediaFile) -> SubtitleCandidate {
        if let Some(code) = file.subtitle.as_ref().and_then(|t| t.language.clone()) {
            return SubtitleCandidate {
                file,
                language: SubtitleLanguage::Code(code),
                inferred: false,
            };
        }

        let words = match std::fs::read(&file.path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                let sample: Vec<&str> = text.lines().take(LANGUAGE_SAMPLE_LINES).collect();
                count_portuguese_words(&sample.join("\n"))
            }
            Err(e) => {
                tracing::warn!("Failed to read subtitle {:?}: {}", file.path, e);
                0
            }
        };

        if words >= self.config.min_pt_words {
            tracing::debug!(
                "Inferred {} for {} ({} stop-words)",
                self.config.home_language,
                file.filename,
                words
            );
            SubtitleCandidate {
                file,
                language: SubtitleLanguage::Code(self.config.home_language.clone()),
                inferred: true,
            }
        } else {
            SubtitleCandidate {
                file,
                language: SubtitleLanguage::Unknown,
                inferred: false,
            }
        }
    }
}
