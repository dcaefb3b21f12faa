//! Media format classification by file extension.

use std::path::Path;

/// Recognized media formats. Sidecar variants carry metadata for a
/// neighboring image rather than pixels of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Jpeg,
    Raw,
    Heif,
    OtherImage,
    Video,
    Xmp,
    Json,
    Yaml,
}

const RAW_EXT: &[&str] = &[
    "cr2", "cr3", "crw", "nef", "nrw", "arw", "srf", "sr2", "dng", "orf",
    "rw2", "raf", "pef", "srw", "x3f", "3fr", "raw",
];

const IMAGE_EXT: &[&str] = &["png", "gif", "tif", "tiff", "bmp", "webp", "avif"];

const VIDEO_EXT: &[&str] = &[
    "mp4", "mov", "m4v", "avi", "3gp", "3g2", "mts", "m2ts", "webm", "mkv",
    "mpg", "mpeg", "wmv", "hevc",
];

impl MediaKind {
    /// Classify a path by its extension; `None` for unrecognized formats.
    pub fn from_path(path: &Path) -> Option<MediaKind> {
        let ext = path.extension()?.to_str()?.to_lowercase();

        let kind = match ext.as_str() {
            "jpg" | "jpeg" | "jpe" => MediaKind::Jpeg,
            "heif" | "heic" | "hif" => MediaKind::Heif,
            "xmp" => MediaKind::Xmp,
            "json" => MediaKind::Json,
            "yml" | "yaml" => MediaKind::Yaml,
            e if RAW_EXT.contains(&e) => MediaKind::Raw,
            e if IMAGE_EXT.contains(&e) => MediaKind::OtherImage,
            e if VIDEO_EXT.contains(&e) => MediaKind::Video,
            _ => return None,
        };

        Some(kind)
    }

    pub fn is_sidecar(self) -> bool {
        matches!(self, MediaKind::Xmp | MediaKind::Json | MediaKind::Yaml)
    }

    pub fn is_image(self) -> bool {
        matches!(
            self,
            MediaKind::Jpeg | MediaKind::Raw | MediaKind::Heif | MediaKind::OtherImage
        )
    }

    pub fn is_video(self) -> bool {
        self == MediaKind::Video
    }

    /// Short type token stored on the file row.
    pub fn file_type(self) -> &'static str {
        match self {
            MediaKind::Jpeg => "jpg",
            MediaKind::Raw => "raw",
            MediaKind::Heif => "heif",
            MediaKind::OtherImage => "image",
            MediaKind::Video => "video",
            MediaKind::Xmp => "xmp",
            MediaKind::Json => "json",
            MediaKind::Yaml => "yml",
        }
    }

    /// Default mime type for the format. RAW formats have no registered
    /// type, so they report the generic octet-stream.
    pub fn mime_type(self) -> &'static str {
        match self {
            MediaKind::Jpeg => "image/jpeg",
            MediaKind::Heif => "image/heif",
            MediaKind::Raw => "application/octet-stream",
            MediaKind::OtherImage => "image/*",
            MediaKind::Video => "video/mp4",
            MediaKind::Xmp => "application/rdf+xml",
            MediaKind::Json => "application/json",
            MediaKind::Yaml => "text/yaml",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_path() {
        let cases = [
            ("IMG_0001.JPG", Some(MediaKind::Jpeg)),
            ("IMG_0001.cr2", Some(MediaKind::Raw)),
            ("IMG_0001.heic", Some(MediaKind::Heif)),
            ("IMG_0001.png", Some(MediaKind::OtherImage)),
            ("IMG_0001.mov", Some(MediaKind::Video)),
            ("IMG_0001.xmp", Some(MediaKind::Xmp)),
            ("IMG_0001.json", Some(MediaKind::Json)),
            ("IMG_0001.yml", Some(MediaKind::Yaml)),
            ("IMG_0001.docx", None),
            ("no_extension", None),
        ];

        for (name, expected) in cases {
            assert_eq!(MediaKind::from_path(&PathBuf::from(name)), expected, "{name}");
        }
    }

    #[test]
    fn test_sidecar_classification() {
        assert!(MediaKind::Xmp.is_sidecar());
        assert!(MediaKind::Yaml.is_sidecar());
        assert!(!MediaKind::Jpeg.is_sidecar());
        assert!(MediaKind::Jpeg.is_image());
        assert!(!MediaKind::Video.is_image());
    }
}
