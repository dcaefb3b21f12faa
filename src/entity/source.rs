//! Source tags for merged photo metadata.
//!
//! Every settable field on a photo remembers which source last wrote it.
//! Sources form a total order; a merge overwrites a field only when the
//! incoming source ranks at least as high as the current one.

use serde::{Deserialize, Serialize};

/// Origin of a metadata value, ordered from least to most authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Derived fallback (filename, file modification time).
    #[default]
    Auto,
    /// Reverse geocoding result.
    Location,
    /// JSON sidecar file.
    Json,
    /// Metadata embedded in the media file (EXIF and vendor tags).
    Meta,
    /// XMP sidecar file.
    Xmp,
    /// YAML sidecar file.
    Yaml,
    /// Explicit user edit.
    Manual,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Auto => "auto",
            Source::Location => "location",
            Source::Json => "json",
            Source::Meta => "meta",
            Source::Xmp => "xmp",
            Source::Yaml => "yaml",
            Source::Manual => "manual",
        }
    }

    /// Parse a stored tag, treating anything unknown as `Auto` so that
    /// records written by older versions keep merging.
    pub fn parse(s: &str) -> Source {
        match s {
            "location" => Source::Location,
            "json" => Source::Json,
            "meta" => Source::Meta,
            "xmp" => Source::Xmp,
            "yaml" => Source::Yaml,
            "manual" => Source::Manual,
            _ => Source::Auto,
        }
    }

    /// True when a value tagged `self` may replace one tagged `current`.
    pub fn overrides(self, current: Source) -> bool {
        self >= current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_order() {
        assert!(Source::Manual > Source::Yaml);
        assert!(Source::Yaml > Source::Xmp);
        assert!(Source::Xmp > Source::Meta);
        assert!(Source::Meta > Source::Json);
        assert!(Source::Json > Source::Location);
        assert!(Source::Location > Source::Auto);
    }

    #[test]
    fn test_overrides_is_inclusive() {
        assert!(Source::Meta.overrides(Source::Meta));
        assert!(!Source::Auto.overrides(Source::Meta));
    }

    #[test]
    fn test_parse_round_trip() {
        for src in [
            Source::Auto,
            Source::Location,
            Source::Json,
            Source::Meta,
            Source::Xmp,
            Source::Yaml,
            Source::Manual,
        ] {
            assert_eq!(Source::parse(src.as_str()), src);
        }
        assert_eq!(Source::parse("estimate"), Source::Auto);
    }
}
