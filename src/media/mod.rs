//! Media file probe: format classification, content hashing and lazy
//! metadata extraction for one file on disk.

pub mod colors;
pub mod kind;
pub mod metadata;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub use kind::MediaKind;
pub use metadata::MetaData;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("cannot read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unrecognized media format: {}", .0.display())]
    Unsupported(PathBuf),
}

/// A probed file on disk. Hash, metadata and dimensions are read lazily
/// and memoized for the lifetime of the probe.
#[derive(Debug)]
pub struct MediaFile {
    path: PathBuf,
    kind: MediaKind,
    size: u64,
    modified: DateTime<Utc>,

    hash: OnceLock<String>,
    metadata: OnceLock<MetaData>,
    dimensions: OnceLock<(u32, u32)>,
}

impl MediaFile {
    /// Probe a path, classifying it by format and reading its size and
    /// modification time. Fails when the path is unreadable or the
    /// format is not recognized.
    pub fn probe(path: impl Into<PathBuf>) -> Result<MediaFile, ProbeError> {
        let path = path.into();

        let kind = MediaKind::from_path(&path).ok_or_else(|| ProbeError::Unsupported(path.clone()))?;

        let stat = std::fs::metadata(&path).map_err(|source| ProbeError::Unreadable {
            path: path.clone(),
            source,
        })?;

        let modified = stat
            .modified()
            .map(DateTime::<Utc>::from)
            .map_err(|source| ProbeError::Unreadable {
                path: path.clone(),
                source,
            })?;

        Ok(MediaFile {
            path,
            kind,
            size: stat.len(),
            modified,
            hash: OnceLock::new(),
            metadata: OnceLock::new(),
            dimensions: OnceLock::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    pub fn is_jpeg(&self) -> bool {
        self.kind == MediaKind::Jpeg
    }

    pub fn is_sidecar(&self) -> bool {
        self.kind.is_sidecar()
    }

    pub fn is_video(&self) -> bool {
        self.kind.is_video()
    }

    /// Path relative to the library root, or the absolute path for files
    /// outside of it. This is the identity the store keys files on.
    pub fn rel_name(&self, root: &Path) -> String {
        self.path
            .strip_prefix(root)
            .unwrap_or(&self.path)
            .to_string_lossy()
            .to_string()
    }

    /// Directory part of `rel_name`, empty for files at the root.
    pub fn rel_path(&self, root: &Path) -> String {
        let rel = self.path.strip_prefix(root).unwrap_or(&self.path);
        rel.parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Base name without extension. With `strip_sequence`, trailing copy
    /// markers like `" (2)"` or `" copy"` are removed so renditions and
    /// duplicates group under one stem.
    pub fn base_name(&self, strip_sequence: bool) -> String {
        stem_of(&self.path.to_string_lossy(), strip_sequence)
    }

    /// Stable content digest, computed once per probe.
    pub fn hash(&self) -> &str {
        self.hash.get_or_init(|| match file_hash(&self.path) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(path = %self.path.display(), "hash failed: {e}");
                String::new()
            }
        })
    }

    /// Normalized metadata, extracted once per probe. Extraction failures
    /// degrade to empty metadata; malformed files still index.
    pub fn metadata(&self) -> &MetaData {
        self.metadata.get_or_init(|| {
            let mut data = match self.kind {
                MediaKind::Xmp => metadata::from_xmp(&self.path),
                MediaKind::Json => metadata::from_json(&self.path),
                MediaKind::Yaml => Ok(MetaData::default()),
                MediaKind::Video => Ok(MetaData::default()),
                _ => metadata::from_exif(&self.path),
            }
            .unwrap_or_else(|e| {
                warn!(path = %self.path.display(), "metadata extraction failed: {e}");
                MetaData::default()
            });

            // A JSON sidecar next to the file fills anything the embedded
            // metadata does not carry.
            if !self.is_sidecar() {
                if let Some(json) = self.json_sidecar() {
                    match metadata::from_json(&json) {
                        Ok(extra) => data.absorb(extra),
                        Err(e) => {
                            warn!(path = %json.display(), "json sidecar skipped: {e}")
                        }
                    }
                }
            }

            if data.width == 0 {
                if let Some((w, h)) = self.pixel_dimensions() {
                    data.width = w;
                    data.height = h;
                }
            }

            data
        })
    }

    /// A `file.ext.json` or `file.json` sidecar adjacent to this file.
    fn json_sidecar(&self) -> Option<PathBuf> {
        let full = PathBuf::from(format!("{}.json", self.path.display()));
        if full.exists() {
            return Some(full);
        }

        let stemmed = self.path.with_extension("json");
        stemmed.exists().then_some(stemmed)
    }

    fn pixel_dimensions(&self) -> Option<(u32, u32)> {
        if !self.kind.is_image() {
            return None;
        }

        Some(
            *self
                .dimensions
                .get_or_init(|| image::image_dimensions(&self.path).unwrap_or((0, 0))),
        )
        .filter(|&(w, h)| w > 0 && h > 0)
    }

    /// Width in pixels after orientation, 0 when unknown.
    pub fn width(&self) -> u32 {
        self.metadata().actual_width()
    }

    /// Height in pixels after orientation, 0 when unknown.
    pub fn height(&self) -> u32 {
        self.metadata().actual_height()
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.metadata().aspect_ratio()
    }

    pub fn portrait(&self) -> bool {
        self.metadata().portrait()
    }

    pub fn duration(&self) -> Duration {
        self.metadata().duration
    }

    pub fn orientation(&self) -> i32 {
        self.metadata().orientation
    }

    pub fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }

    /// Fallback capture time when metadata has none: the file
    /// modification time, tagged as an automatic source.
    pub fn taken_at_fallback(&self) -> DateTime<Utc> {
        self.metadata().taken_at.unwrap_or(self.modified)
    }

    /// Color fingerprint of the decoded image.
    pub fn color_profile(&self) -> anyhow::Result<colors::ColorProfile> {
        colors::from_path(&self.path)
    }

    #[cfg(test)]
    pub fn with_metadata(self, data: MetaData) -> Self {
        let _ = self.metadata.set(data);
        self
    }
}

/// Streaming content hash over the raw file bytes.
fn file_hash(path: &Path) -> anyhow::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();

    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Base name of a file name without its extension. Sidecars are often
/// named after the full original file name (IMG_0001.jpg.json), so a
/// nested media extension is stripped as well.
pub fn stem_of(name: &str, strip_sequence: bool) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let stem = match stem.rsplit_once('.') {
        Some((inner, ext)) if MediaKind::from_path(Path::new(&format!("x.{ext}"))).is_some() => {
            inner.to_string()
        }
        _ => stem,
    };

    if strip_sequence {
        strip_sequence_suffix(&stem)
    } else {
        stem
    }
}

/// Remove trailing copy markers from a base name: `"Test (4)"` and
/// `"Test copy 2"` both reduce to `"Test"`.
fn strip_sequence_suffix(stem: &str) -> String {
    let trimmed = stem.trim_end();

    if let Some(open) = trimmed.rfind(" (") {
        let tail = &trimmed[open + 2..];
        if let Some(num) = tail.strip_suffix(')') {
            if !num.is_empty() && num.chars().all(|c| c.is_ascii_digit()) {
                return trimmed[..open].trim_end().to_string();
            }
        }
    }

    let lower = trimmed.to_lowercase();
    if let Some(pos) = lower.rfind(" copy") {
        let tail = &trimmed[pos + 5..];
        if tail.trim().chars().all(|c| c.is_ascii_digit()) {
            return trimmed[..pos].trim_end().to_string();
        }
    }

    trimmed.to_string()
}
