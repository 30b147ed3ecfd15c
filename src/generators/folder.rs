//! Folder name generator.

use crate::models::media::ExternalId;
use crate::utils::fs::sanitize_filename;

/// Generate a title folder name.
///
/// Format: `${title} (${year}) [${idkind}-${id}]`; missing parts are omitted.
pub fn generate_title_folder(title: &str, year: Option<u16>, id: Option<&ExternalId>) -> String {
    let mut name = sanitize_filename(title);

    if let Some(y) = year {
        name.push_str(&format!(" ({})", y));
    }
    if let Some(id) = id {
        name.push_str(&format!(" [{}]", id));
    }

    name
}

/// Generate movie folder name.
pub fn generate_movie_folder(title: &str, year: Option<u16>, id: Option<&ExternalId>) -> String {
    generate_title_folder(title, year, id)
}

/// Generate series folder name.
pub fn generate_series_folder(title: &str, year: Option<u16>, id: Option<&ExternalId>) -> String {
    generate_title_folder(title, year, id)
}

/// Generate season folder name.
///
/// Format: `Season ${seasonNr2}`
pub fn generate_season_folder(season_number: u16) -> String {
    format!("Season {:02}", season_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_movie_folder() {
        let folder = generate_movie_folder("Matrix", Some(1999), Some(&ExternalId::Tmdb(603)));
        assert_eq!(folder, "Matrix (1999) [tmdbid-603]");
    }

    #[test]
    fn test_unresolved_folder_omits_suffixes() {
        assert_eq!(generate_series_folder("Breaking Bad", None, None), "Breaking Bad");
        assert_eq!(
            generate_movie_folder("Mission: Impossible", Some(1996), None),
            "Mission Impossible (1996)"
        );
    }

    #[test]
    fn test_generate_season_folder() {
        assert_eq!(generate_season_folder(1), "Season 01");
        assert_eq!(generate_season_folder(12), "Season 12");
    }
}
