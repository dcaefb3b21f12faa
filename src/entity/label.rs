//! Label identity helpers.
//!
//! Labels accumulate on photos over time; re-indexing merges new
//! sightings into existing rows instead of replacing them. The slug is
//! the identity rows are merged on.

/// Lower-cased, dash-separated identity for a label name.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Brandenburg Gate"), "brandenburg-gate");
        assert_eq!(slugify("  Cat & Dog  "), "cat-dog");
        assert_eq!(slugify("café"), "café");
    }
}
