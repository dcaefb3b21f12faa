//! Keyword extraction and normalization helpers.

/// Words that carry no search value and are dropped from keyword sets.
const STOP_WORDS: &[&str] = &[
    "and", "are", "the", "for", "from", "with", "this", "that", "was", "were",
    "has", "have", "had", "its", "his", "her", "their", "our", "your", "but",
    "not", "all", "any", "can", "out", "into", "img", "dsc", "photo",
    "image", "file", "copy", "jpg", "jpeg", "raw", "mov", "mp4", "edit",
    "edited", "new", "untitled", "scan", "screenshot",
];

/// Minimum length for a word to count as a keyword.
const MIN_WORD_LEN: usize = 3;

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Split free text into normalized keyword candidates.
///
/// Words are lower-cased, split on anything that is not alphanumeric, and
/// filtered against the stop-word list. Purely numeric tokens are dropped
/// since sequence numbers from camera file names are noise.
pub fn keywords(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.trim().to_lowercase())
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| !is_stop_word(w))
        .collect()
}

/// Keyword candidates from a file name or path fragment.
///
/// Path separators, underscores and dashes all act as word boundaries, so
/// `"2021/Summer/beach-trip_042.jpg"` yields `["summer", "beach", "trip"]`.
pub fn filename_keywords(name: &str) -> Vec<String> {
    keywords(&name.replace(['/', '\\', '_', '-', '.'], " "))
}

/// Deduplicate words preserving first occurrence, dropping empties.
pub fn unique_words(words: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    words
        .into_iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Parse a stored comma-separated keyword list.
pub fn split_keywords(list: &str) -> Vec<String> {
    list.split(',')
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Join a keyword set the way it is stored on the details record.
pub fn join_keywords(words: Vec<String>) -> String {
    unique_words(words).join(", ")
}

/// True when a base name looks machine-generated: a camera counter like
/// `IMG_2371` or `DSC00042`, or a long hex identifier. Such names contribute
/// no useful keywords.
pub fn is_generated_id(base: &str) -> bool {
    if base.is_empty() {
        return false;
    }

    // Long hex or uuid-like tokens.
    if base.len() >= 16 && base.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        return true;
    }

    // Short alphabetic prefix followed by digits, e.g. IMG_0042, P1010007.
    let prefix: String = base
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let rest = &base[prefix.len()..];
    let rest = rest.trim_start_matches(['_', '-', ' ']);

    !rest.is_empty()
        && prefix.len() <= 4
        && rest.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_filters_noise() {
        let words = keywords("At the Beach, 2021! Sunset and Waves");
        assert!(words.contains(&"beach".to_string()));
        assert!(words.contains(&"sunset".to_string()));
        assert!(words.contains(&"waves".to_string()));
        assert!(!words.contains(&"the".to_string()));
        assert!(!words.contains(&"2021".to_string()));
    }

    #[test]
    fn test_filename_keywords() {
        let words = filename_keywords("2021/Summer/beach-trip_042.jpg");
        assert_eq!(words, vec!["summer", "beach", "trip"]);
    }

    #[test]
    fn test_unique_words_keeps_first_occurrence() {
        let words = unique_words(vec![
            "Beach".to_string(),
            "sunset".to_string(),
            "beach".to_string(),
            "".to_string(),
        ]);
        assert_eq!(words, vec!["beach", "sunset"]);
    }

    #[test]
    fn test_join_keywords_is_deterministic() {
        let a = join_keywords(vec!["b".repeat(3), "a".repeat(3), "b".repeat(3)]);
        let b = join_keywords(vec!["b".repeat(3), "a".repeat(3)]);
        assert_eq!(a, b);
        assert_eq!(a, "bbb, aaa");
    }

    #[test]
    fn test_is_generated_id() {
        assert!(is_generated_id("IMG_0042"));
        assert!(is_generated_id("DSC00042"));
        assert!(is_generated_id("P1010007"));
        assert!(is_generated_id("20f3a1bc49de5f720b59d1ab"));
        assert!(!is_generated_id("beach sunset"));
        assert!(!is_generated_id("Birthday2021"));
        assert!(!is_generated_id(""));
    }
}
