use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::geo::ApiKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub thumbnails: ThumbnailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Root directory holding the original media files.
    #[serde(default = "default_originals_path")]
    pub originals_path: PathBuf,

    /// Separate tree for sidecar files. When unset, sidecars live next
    /// to the originals.
    #[serde(default)]
    pub sidecar_path: Option<PathBuf>,

    #[serde(default = "default_media_extensions")]
    pub media_extensions: Vec<String>,
}

fn default_originals_path() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_media_extensions() -> Vec<String> {
    [
        "jpg", "jpeg", "png", "gif", "webp", "tif", "tiff", "bmp", "avif",
        "heic", "heif", "cr2", "cr3", "nef", "arw", "dng", "orf", "rw2",
        "raf", "pef", "mp4", "mov", "m4v", "avi", "mts", "webm", "mkv",
        "xmp", "json", "yml", "yaml",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            originals_path: default_originals_path(),
            sidecar_path: None,
            media_extensions: default_media_extensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Write a YAML sidecar whenever a primary file changes.
    #[serde(default = "default_true")]
    pub sidecar_yaml: bool,

    /// Group renditions by stem with copy markers removed.
    #[serde(default = "default_true")]
    pub strip_sequence: bool,

    /// Disable the image classifier entirely.
    #[serde(default = "default_true")]
    pub classifier_off: bool,

    /// Run NSFW detection on new primary files.
    #[serde(default)]
    pub detect_nsfw: bool,

    /// Whether photos may be flagged private at all.
    #[serde(default = "default_true")]
    pub private_feature: bool,

    #[serde(default)]
    pub geocoder: ApiKind,

    /// Indexing worker threads; 0 picks a count from the machine.
    #[serde(default)]
    pub workers: usize,
}

fn default_true() -> bool {
    true
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            sidecar_yaml: true,
            strip_sequence: true,
            classifier_off: true,
            detect_nsfw: false,
            private_feature: true,
            geocoder: ApiKind::default(),
            workers: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    #[serde(default = "default_thumb_cache_path")]
    pub path: PathBuf,
}

fn default_thumb_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("pixarc/thumbnails")
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            path: default_thumb_cache_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pixarc")
        .join("pixarc.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            library: LibraryConfig::default(),
            index: IndexConfig::default(),
            thumbnails: ThumbnailConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Create default config
            let config = Config::default();
            config.save(&config_path)?;
            Ok(config)
        }
    }

    pub fn save(&self, config_path: &PathBuf) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;

        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pixarc")
            .join("config.toml")
    }
}
