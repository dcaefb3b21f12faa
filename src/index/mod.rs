//! The index pipeline: drives one probed media file through identity
//! resolution, metadata merging, classification, scoring and persistence.

mod mediafile;
pub mod resolve;

use std::fmt;
use std::sync::Arc;

use crate::classify::{Classifier, NsfwDetector};
use crate::config::Config;
use crate::db::Repo;
use crate::geo::{ApiKind, Geocoder, NopGeocoder};
use crate::media::MediaFile;
use crate::thumb::ThumbCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// New file row created.
    Added,
    /// Existing rows updated.
    Updated,
    /// Unchanged file skipped without writes.
    Skipped,
    /// Same content already indexed under a live path.
    Duplicate,
    /// Photo is soft-deleted and not resurrectable.
    Archived,
    Failed,
}

impl IndexStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IndexStatus::Added => "added",
            IndexStatus::Updated => "updated",
            IndexStatus::Skipped => "skipped",
            IndexStatus::Duplicate => "skipped duplicate",
            IndexStatus::Archived => "skipped archived",
            IndexStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of indexing one file.
#[derive(Debug)]
pub struct IndexResult {
    pub status: IndexStatus,
    pub error: Option<anyhow::Error>,
    pub file_id: i64,
    pub file_uid: String,
    pub photo_id: i64,
    pub photo_uid: String,
}

impl IndexResult {
    fn with_status(status: IndexStatus) -> IndexResult {
        IndexResult {
            status,
            error: None,
            file_id: 0,
            file_uid: String::new(),
            photo_id: 0,
            photo_uid: String::new(),
        }
    }

    fn failed(error: anyhow::Error) -> IndexResult {
        IndexResult {
            error: Some(error),
            ..IndexResult::with_status(IndexStatus::Failed)
        }
    }

    #[allow(dead_code)]
    pub fn success(&self) -> bool {
        self.error.is_none() && self.file_id > 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Re-index files even when they look unchanged.
    pub rescan: bool,
    /// Name the file was ingested under, when it differs from the one
    /// on disk.
    pub original_name: String,
}

impl IndexOptions {
    pub fn skip_unchanged(&self) -> bool {
        !self.rescan
    }
}

/// The indexer binds the store, the thumbnail cache and the optional
/// enrichment collaborators together. One instance is shared by all
/// workers; a single file always runs on a single thread.
pub struct Indexer {
    config: Config,
    repo: Repo,
    thumbs: ThumbCache,
    classifier: Option<Arc<dyn Classifier>>,
    nsfw_detector: Option<Arc<dyn NsfwDetector>>,
    geocoder: Arc<dyn Geocoder>,
}

impl Indexer {
    pub fn new(config: Config, repo: Repo) -> Indexer {
        let thumbs = ThumbCache::new(&config.thumbnails.path);
        Indexer {
            config,
            repo,
            thumbs,
            classifier: None,
            nsfw_detector: None,
            geocoder: Arc::new(NopGeocoder),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Indexer {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_nsfw_detector(mut self, detector: Arc<dyn NsfwDetector>) -> Indexer {
        self.nsfw_detector = Some(detector);
        self
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Indexer {
        self.geocoder = geocoder;
        self
    }

    pub fn repo(&self) -> &Repo {
        &self.repo
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn geocoding_enabled(&self) -> bool {
        self.config.index.geocoder != ApiKind::None
    }

    /// Index one probed media file. See the module docs for the stages;
    /// persistence failures abort with `Failed`, enrichment failures
    /// degrade to missing data.
    pub fn index(&self, media: &MediaFile, options: &IndexOptions) -> IndexResult {
        mediafile::index_media_file(self, media, options)
    }
}
