//! File system utilities.

use crate::Result;
use std::path::{Path, PathBuf};

/// Supported video file extensions.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "mov", "wmv", "m4v", "ts", "m2ts", "flv", "webm", "mpg", "mpeg", "3gp",
    "ogv",
];

/// Supported subtitle file extensions.
pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass", "ssa", "sub", "vtt"];

/// Sidecar extensions that follow their video when it is renamed.
pub const SIDECAR_EXTENSIONS: &[&str] = &["nfo", "jpg", "jpeg", "png", "webp"];

/// Check if a path exists and is a directory.
pub fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(crate::Error::PathNotFound(path.display().to_string()));
    }
    if !path.is_dir() {
        return Err(crate::Error::NotADirectory(path.display().to_string()));
    }
    Ok(())
}

/// Get file extension in lowercase.
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Check if a file is a video file based on extension.
pub fn is_video_file(path: &Path) -> bool {
    get_extension(path)
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Check if a file is a subtitle file based on extension.
pub fn is_subtitle_file(path: &Path) -> bool {
    get_extension(path)
        .map(|ext| SUBTITLE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Check if a file can travel with a video as a sidecar.
pub fn is_sidecar_file(path: &Path) -> bool {
    get_extension(path)
        .map(|ext| SIDECAR_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Dot-files (`.DS_Store`, `.hidden.mkv`) are never organized.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Ancestors of `path` strictly below `root`, nearest first.
pub fn ancestors_below(path: &Path, root: &Path) -> Vec<PathBuf> {
    path.ancestors()
        .skip(1)
        .take_while(|a| *a != root && a.starts_with(root))
        .map(Path::to_path_buf)
        .collect()
}

/// Remove characters that are not allowed in file names.
pub fn sanitize_filename(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
