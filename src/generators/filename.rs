//! Filename generator.

use crate::utils::fs::sanitize_filename;

/// Extract disc/part identifier from filename.
///
/// Detects patterns like: cd1, cd2, disc1, disc2, part1, part2, dvd1, dvd2, etc.
/// Returns the identifier in lowercase format (e.g., "cd1", "part2").
pub fn extract_disc_identifier(filename: &str) -> Option<String> {
    let filename_lower = filename.to_lowercase();

    let separated = r"[_\s\-\.](cd|disc|disk|part|dvd)\s?(\d+)\b";
    let at_end = r"(cd|disc|disk|part|dvd)(\d+)\.[a-z0-9]+$";

    for pattern in [separated, at_end] {
        if let Ok(re) = regex::Regex::new(pattern) {
            if let Some(caps) = re.captures(&filename_lower) {
                if let (Some(prefix), Some(num)) = (caps.get(1), caps.get(2)) {
                    return Some(format!("{}{}", prefix.as_str(), num.as_str()));
                }
            }
        }
    }

    None
}

/// Generate movie filename.
///
/// Format: `${title} (${year})( - ${discId})( - ${resolution}).${ext}`
pub fn generate_movie_filename(
    title: &str,
    year: Option<u16>,
    disc_id: Option<&str>,
    quality: Option<&str>,
    extension: &str,
) -> String {
    let mut name = sanitize_filename(title);

    if let Some(y) = year {
        name.push_str(&format!(" ({})", y));
    }
    // Add disc identifier if present (for multi-disc movies)
    if let Some(disc) = disc_id {
        name.push_str(&format!(" - {}", disc));
    }
    if let Some(q) = quality {
        name.push_str(&format!(" - {}", q));
    }

    format!("{}.{}", name, extension)
}

/// Generate TV episode filename.
///
/// Format: `${series} - S${seasonNr2}E${episodeNr2}(-E${lastEpisodeNr2})( - ${resolution}).${ext}`
pub fn generate_episode_filename(
    series: &str,
    season: u16,
    episode: u16,
    episode_end: Option<u16>,
    quality: Option<&str>,
    extension: &str,
) -> String {
    let mut name = format!("{} - S{:02}E{:02}", sanitize_filename(series), season, episode);

    if let Some(end) = episode_end.filter(|&e| e > episode) {
        name.push_str(&format!("-E{:02}", end));
    }
    if let Some(q) = quality {
        name.push_str(&format!(" - {}", q));
    }

    format!("{}.{}", name, extension)
}

/// Generate subtitle filename next to its video.
///
/// Format: `${videoStem}(.${lang})(.sdh)(.forced).${ext}`
pub fn generate_subtitle_filename(
    video_stem: &str,
    language: Option<&str>,
    sdh: bool,
    forced: bool,
    extension: &str,
) -> String {
    let mut name = video_stem.to_string();

    if let Some(lang) = language {
        name.push('.');
        name.push_str(lang);
    }
    if sdh {
        name.push_str(".sdh");
    }
    if forced {
        name.push_str(".forced");
    }

    format!("{}.{}", name, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_disc_identifier() {
        // Various disc identifier patterns
        assert_eq!(
            extract_disc_identifier("movie-cd1.avi"),
            Some("cd1".to_string())
        );
        assert_eq!(
            extract_disc_identifier("movie_part1.mkv"),
            Some("part1".to_string())
        );
        assert_eq!(
            extract_disc_identifier("movie part2.mkv"),
            Some("part2".to_string())
        );
        assert_eq!(
            extract_disc_identifier("movie.disc1.avi"),
            Some("disc1".to_string())
        );
        assert_eq!(
            extract_disc_identifier("Heat.1995.CD2.avi"),
            Some("cd2".to_string())
        );

        // No disc identifier
        assert_eq!(extract_disc_identifier("movie.mkv"), None);
        assert_eq!(extract_disc_identifier("movie-2024.avi"), None);
        assert_eq!(extract_disc_identifier("The.Party.1968.mkv"), None);
    }

    #[test]
    fn test_generate_movie_filename() {
        assert_eq!(
            generate_movie_filename("Matrix", Some(1999), None, None, "mkv"),
            "Matrix (1999).mkv"
        );
        assert_eq!(
            generate_movie_filename("Heat", Some(1995), Some("cd1"), Some("1080p"), "avi"),
            "Heat (1995) - cd1 - 1080p.avi"
        );
    }

    #[test]
    fn test_generate_episode_filename() {
        assert_eq!(
            generate_episode_filename("Breaking Bad", 1, 1, None, None, "mkv"),
            "Breaking Bad - S01E01.mkv"
        );
        assert_eq!(
            generate_episode_filename("Show", 2, 3, Some(4), Some("720p"), "mp4"),
            "Show - S02E03-E04 - 720p.mp4"
        );
    }

    #[test]
    fn test_generate_subtitle_filename() {
        assert_eq!(
            generate_subtitle_filename("Matrix (1999)", Some("por"), false, false, "srt"),
            "Matrix (1999).por.srt"
        );
        assert_eq!(
            generate_subtitle_filename("Matrix (1999)", Some("eng"), false, true, "srt"),
            "Matrix (1999).eng.forced.srt"
        );
        assert_eq!(
            generate_subtitle_filename("Matrix (1999)", None, false, false, "ass"),
            "Matrix (1999).ass"
        );
    }
}
