//! Directory scanner module.
//!
//! Walks a library folder recursively and classifies every file as a video,
//! a subtitle or something else. Subtitle filenames are parsed here so the
//! resulting `MediaFile`s never change afterwards.

use crate::models::config::Config;
use crate::models::media::{FileKind, MediaFile, SubtitleTag};
use crate::utils::fs::{ensure_directory, is_hidden, is_subtitle_file, is_video_file};
use crate::utils::language::normalize_code;
use crate::Result;
use std::path::Path;
use walkdir::WalkDir;

/// Result of scanning a directory.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Video files found (excluding samples).
    pub videos: Vec<MediaFile>,
    /// Subtitle files found.
    pub subtitles: Vec<MediaFile>,
    /// Everything else, including sample videos.
    pub others: Vec<MediaFile>,
    /// Total files scanned.
    pub total_files_scanned: usize,
    /// Total directories scanned.
    pub total_dirs_scanned: usize,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.videos.is_empty() && self.subtitles.is_empty() && self.others.is_empty()
    }
}

/// Check if a path component indicates a sample.
fn is_sample_path(path: &Path) -> bool {
    path.components().any(|component| {
        if let std::path::Component::Normal(name) = component {
            let name_lower = name.to_string_lossy().to_lowercase();
            name_lower == "sample" || name_lower == "samples"
        } else {
            false
        }
    })
}

/// Check if a filename indicates a sample file.
fn is_sample_filename(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    lower.contains("sample") && !lower.contains("sampler")
}

/// Parse language, variant and flags from a subtitle filename.
///
/// `Movie.pt-BR.srt`, `Movie.por2.srt`, `Movie.eng.forced.srt` and
/// `Movie.srt` are all accepted; a trailing token that is not a known
/// language code is kept as part of the base name.
pub fn parse_subtitle_tag(filename: &str) -> Option<SubtitleTag> {
    let path = Path::new(filename);
    let extension = path.extension()?.to_string_lossy().to_lowercase();
    let stem = path.file_stem()?.to_string_lossy().to_string();

    let mut segments: Vec<&str> = stem.split('.').collect();
    let mut forced = false;
    let mut sdh = false;

    while segments.len() > 1 {
        match segments.last().map(|s| s.to_lowercase()).as_deref() {
            Some("forced") => forced = true,
            Some("sdh") | Some("cc") => sdh = true,
            Some("default") => {}
            _ => break,
        }
        segments.pop();
    }

    let mut language = None;
    let mut variant = 1u8;

    if segments.len() > 1 {
        if let Ok(re) = regex::Regex::new(r"(?i)^([a-z]{2,3}(?:[-_][a-z]{2})?)([2-9])?$") {
            if let Some(caps) = segments.last().and_then(|s| re.captures(s)) {
                if let Some(code) = caps.get(1).and_then(|m| normalize_code(m.as_str())) {
                    language = Some(code);
                    variant = caps
                        .get(2)
                        .and_then(|m| m.as_str().parse().ok())
                        .unwrap_or(1);
                    segments.pop();
                }
            }
        }
    }

    Some(SubtitleTag {
        base: segments.join("."),
        language,
        variant,
        forced,
        sdh,
        extension,
    })
}

/// Build a `MediaFile` from a path.
fn create_media_file(path: &Path, kind: FileKind) -> Result<MediaFile> {
    let metadata = std::fs::metadata(path)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let subtitle = match kind {
        FileKind::Subtitle => parse_subtitle_tag(&filename),
        _ => None,
    };

    Ok(MediaFile {
        path: path.to_path_buf(),
        filename,
        kind,
        size: metadata.len(),
        subtitle,
    })
}

/// Scan a directory for media files.
///
/// Symlinks are not followed. A missing root or a root that is not a
/// directory is an error; an empty directory yields an empty result.
///
/// # Arguments
/// * `path` - The library folder to scan
/// * `_config` - Configuration (reserved for scan filters)
///
/// # Returns
/// A `ScanResult` with files sorted by path.
pub fn scan_directory(path: &Path, _config: &Config) -> Result<ScanResult> {
    ensure_directory(path)?;

    let mut result = ScanResult::default();

    let walker = WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));

    for entry in walker.filter_map(|e| e.ok()) {
        let entry_path = entry.path();

        if entry.file_type().is_dir() {
            result.total_dirs_scanned += 1;
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }
        result.total_files_scanned += 1;

        let kind = if is_video_file(entry_path) {
            let filename = entry.file_name().to_string_lossy();
            if is_sample_path(entry_path.strip_prefix(path).unwrap_or(entry_path))
                || is_sample_filename(&filename)
            {
                tracing::debug!("Sample file left in place: {}", entry_path.display());
                FileKind::Sidecar
            } else {
                FileKind::Video
            }
        } else if is_subtitle_file(entry_path) {
            FileKind::Subtitle
        } else {
            FileKind::Sidecar
        };

        match create_media_file(entry_path, kind) {
            Ok(file) => match file.kind {
                FileKind::Video => result.videos.push(file),
                FileKind::Subtitle => result.subtitles.push(file),
                FileKind::Sidecar => result.others.push(file),
            },
            Err(e) => {
                tracing::warn!("Failed to read file {:?}: {}", entry_path, e);
            }
        }
    }

    // Sort results for consistent output
    result.videos.sort_by(|a, b| a.path.cmp(&b.path));
    result.subtitles.sort_by(|a, b| a.path.cmp(&b.path));
    result.others.sort_by(|a, b| a.path.cmp(&b.path));

    tracing::info!(
        "Scanned {} files in {} directories: {} videos, {} subtitles, {} other",
        result.total_files_scanned,
        result.total_dirs_scanned,
        result.videos.len(),
        result.subtitles.len(),
        result.others.len()
    );

    Ok(result)
}
