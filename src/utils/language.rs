//! Subtitle language utilities.

/// ISO 639-2/B codes recognized in subtitle filenames.
const KNOWN_CODES: &[&str] = &[
    "ara", "baq", "bul", "cat", "chi", "cze", "dan", "dut", "eng", "fil", "fin", "fre", "ger",
    "glg", "gre", "heb", "hin", "hrv", "hun", "ind", "ita", "jpn", "kor", "lav", "lit", "may",
    "nob", "nor", "pol", "por", "rum", "rus", "slo", "slv", "spa", "swe", "tam", "tel", "tha",
    "tur", "ukr", "vie",
];

/// Two-letter and terminology codes mapped to ISO 639-2/B.
const ALIASES: &[(&str, &str)] = &[
    ("ar", "ara"),
    ("bg", "bul"),
    ("ca", "cat"),
    ("cs", "cze"),
    ("ces", "cze"),
    ("da", "dan"),
    ("de", "ger"),
    ("deu", "ger"),
    ("el", "gre"),
    ("ell", "gre"),
    ("en", "eng"),
    ("es", "spa"),
    ("eu", "baq"),
    ("eus", "baq"),
    ("fi", "fin"),
    ("fr", "fre"),
    ("fra", "fre"),
    ("he", "heb"),
    ("hi", "hin"),
    ("hr", "hrv"),
    ("hu", "hun"),
    ("id", "ind"),
    ("it", "ita"),
    ("ja", "jpn"),
    ("ko", "kor"),
    ("nl", "dut"),
    ("nld", "dut"),
    ("no", "nor"),
    ("nb", "nob"),
    ("pl", "pol"),
    ("pt", "por"),
    ("pob", "por"),
    ("ro", "rum"),
    ("ron", "rum"),
    ("ru", "rus"),
    ("sk", "slo"),
    ("slk", "slo"),
    ("sl", "slv"),
    ("sv", "swe"),
    ("th", "tha"),
    ("tr", "tur"),
    ("uk", "ukr"),
    ("vi", "vie"),
    ("zh", "chi"),
    ("zho", "chi"),
];

/// Portuguese stop-words used to recognize code-less subtitles.
pub const PORTUGUESE_WORDS: &[&str] = &[
    "que", "não", "para", "com", "uma", "mais", "muito", "está", "você", "seu", "sua", "ele",
    "ela", "são", "mas", "por", "até", "também", "bem", "foi", "ser", "vai", "pode", "ainda",
    "onde", "quando", "como", "porque", "sem", "sobre", "todo", "tinha", "foram", "fazer",
];

/// Normalize a filename language token (`pt`, `pt-BR`, `por`) to ISO 639-2/B.
///
/// Returns `None` for tokens that are not a known language, so words such as
/// `the` in `Movie.the.srt` are never mistaken for a code.
pub fn normalize_code(token: &str) -> Option<String> {
    let lower = token.to_lowercase();
    let primary = lower.split(['-', '_']).next().unwrap_or_default();

    if KNOWN_CODES.contains(&primary) {
        return Some(primary.to_string());
    }
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == primary)
        .map(|(_, code)| code.to_string())
}

/// Count distinct Portuguese stop-words appearing as whole words in `text`.
pub fn count_portuguese_words(text: &str) -> usize {
    let lower = text.to_lowercase();
    let words: std::collections::HashSet<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    PORTUGUESE_WORDS
        .iter()
        .filter(|w| words.contains(*w))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("por").as_deref(), Some("por"));
        assert_eq!(normalize_code("pt").as_deref(), Some("por"));
        assert_eq!(normalize_code("pt-BR").as_deref(), Some("por"));
        assert_eq!(normalize_code("EN").as_deref(), Some("eng"));
        assert_eq!(normalize_code("fra").as_deref(), Some("fre"));
        assert_eq!(normalize_code("the"), None);
        assert_eq!(normalize_code("x264"), None);
    }

    #[test]
    fn test_count_portuguese_words() {
        let text = "Você não sabe o que está fazendo.\nEle foi para casa com ela.";
        // você, não, que, está, ele, foi, para, com, ela
        assert_eq!(count_portuguese_words(text), 9);
        assert_eq!(count_portuguese_words("I don't know what you are doing."), 0);
    }

    #[test]
    fn test_count_ignores_substrings() {
        // "quest" and "comet" must not count as "que" / "com"
        assert_eq!(count_portuguese_words("quest comet parade"), 0);
    }
}
