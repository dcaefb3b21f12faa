//! Thumbnail generation and caching for the indexer's fixed presets.

use anyhow::Result;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::fs;
use std::path::{Path, PathBuf};

/// The crops and fits the pipeline requests. Classification reads the
/// square crops; NSFW detection reads the 720 fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThumbPreset {
    Tile224,
    Left224,
    Right224,
    Fit720,
}

impl ThumbPreset {
    pub fn name(self) -> &'static str {
        match self {
            ThumbPreset::Tile224 => "tile_224",
            ThumbPreset::Left224 => "left_224",
            ThumbPreset::Right224 => "right_224",
            ThumbPreset::Fit720 => "fit_720",
        }
    }
}

/// Renders thumbnails into a cache directory, keyed by a hash of the
/// original path and preset so repeat requests are free.
pub struct ThumbCache {
    cache_dir: PathBuf,
}

impl ThumbCache {
    pub fn new(cache_dir: &Path) -> ThumbCache {
        ThumbCache {
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    fn ensure_cache_dir(&self) -> Result<()> {
        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    fn cache_path(&self, original: &Path, preset: ThumbPreset) -> PathBuf {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        original.to_string_lossy().hash(&mut hasher);
        preset.hash(&mut hasher);
        let hash = hasher.finish();

        self.cache_dir
            .join(format!("{:016x}_{}.jpg", hash, preset.name()))
    }

    /// Render (or reuse) a thumbnail for the given preset and return its
    /// path on disk.
    pub fn thumbnail(&self, original: &Path, preset: ThumbPreset) -> Result<PathBuf> {
        self.ensure_cache_dir()?;

        let target = self.cache_path(original, preset);
        if target.exists() {
            return Ok(target);
        }

        let img = image::open(original)?;
        let thumb = render(&img, preset);
        thumb.to_rgb8().save(&target)?;

        Ok(target)
    }
}

fn render(img: &DynamicImage, preset: ThumbPreset) -> DynamicImage {
    let (w, h) = img.dimensions();

    match preset {
        ThumbPreset::Fit720 => img.resize(720, 720, FilterType::Triangle),
        ThumbPreset::Tile224 | ThumbPreset::Left224 | ThumbPreset::Right224 => {
            let side = w.min(h);
            let x = match preset {
                ThumbPreset::Left224 => 0,
                ThumbPreset::Right224 => w - side,
                _ => (w - side) / 2,
            };
            let y = (h - side) / 2;
            img.crop_imm(x, y, side, side)
                .resize_exact(224, 224, FilterType::Triangle)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn write_jpeg(path: &Path, w: u32, h: u32) {
        RgbImage::from_pixel(w, h, Rgb([10, 120, 200]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_thumbnail_renders_and_caches() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("IMG_0001.jpg");
        write_jpeg(&original, 640, 480);

        let cache = ThumbCache::new(&dir.path().join("cache"));
        let first = cache.thumbnail(&original, ThumbPreset::Tile224).unwrap();
        assert!(first.exists());

        let again = cache.thumbnail(&original, ThumbPreset::Tile224).unwrap();
        assert_eq!(first, again);

        let (w, h) = image::image_dimensions(&first).unwrap();
        assert_eq!((w, h), (224, 224));
    }

    #[test]
    fn test_fit_720_preserves_aspect() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("IMG_0002.jpg");
        write_jpeg(&original, 1440, 720);

        let cache = ThumbCache::new(&dir.path().join("cache"));
        let path = cache.thumbnail(&original, ThumbPreset::Fit720).unwrap();
        let (w, h) = image::image_dimensions(&path).unwrap();
        assert_eq!((w, h), (720, 360));
    }

    #[test]
    fn test_presets_produce_distinct_cache_entries() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("IMG_0003.jpg");
        write_jpeg(&original, 640, 480);

        let cache = ThumbCache::new(&dir.path().join("cache"));
        let left = cache.thumbnail(&original, ThumbPreset::Left224).unwrap();
        let right = cache.thumbnail(&original, ThumbPreset::Right224).unwrap();
        assert_ne!(left, right);
    }
}
