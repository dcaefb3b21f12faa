pub mod discovery;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::index::{IndexOptions, IndexStatus, Indexer};
use crate::media::MediaFile;

pub use discovery::discover_media;

/// Progress protocol sent to whoever started the scan.
#[derive(Debug, Clone)]
pub enum ScanUpdate {
    Started { total: usize },
    Progress { current: usize, total: usize, path: String },
    Completed { summary: ScanSummary },
    Cancelled,
    Failed { error: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub archived: usize,
    pub failed: usize,
}

impl ScanSummary {
    fn record(&mut self, status: IndexStatus) {
        match status {
            IndexStatus::Added => self.added += 1,
            IndexStatus::Updated => self.updated += 1,
            IndexStatus::Skipped => self.skipped += 1,
            IndexStatus::Duplicate => self.duplicates += 1,
            IndexStatus::Archived => self.archived += 1,
            IndexStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.added + self.updated + self.skipped + self.duplicates + self.archived + self.failed
    }
}

impl std::fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} added, {} updated, {} skipped, {} duplicates, {} archived, {} failed",
            self.added, self.updated, self.skipped, self.duplicates, self.archived, self.failed
        )
    }
}

/// Dispatches discovered files across a worker pool. Each file runs
/// through the indexer on a single worker; distinct files go in
/// parallel.
pub struct Scanner {
    indexer: Arc<Indexer>,
}

impl Scanner {
    pub fn new(indexer: Arc<Indexer>) -> Scanner {
        Scanner { indexer }
    }

    fn worker_count(&self) -> usize {
        let configured = self.indexer.config().index.workers;
        if configured > 0 {
            return configured;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(8)
    }

    /// Scan a directory with cancellation support, reporting progress
    /// over the channel.
    pub fn scan(
        &self,
        directory: &Path,
        options: &IndexOptions,
        tx: mpsc::Sender<ScanUpdate>,
        cancel_flag: Arc<AtomicBool>,
    ) -> Result<ScanSummary> {
        let extensions = &self.indexer.config().library.media_extensions;
        let paths = match discover_media(directory, extensions) {
            Ok(paths) => paths,
            Err(e) => {
                let _ = tx.send(ScanUpdate::Failed {
                    error: format!("discovery failed: {e}"),
                });
                return Err(e);
            }
        };

        let total = paths.len();
        let _ = tx.send(ScanUpdate::Started { total });

        let summary = Mutex::new(ScanSummary::default());
        let cursor = AtomicUsize::new(0);
        let workers = self.worker_count().min(total.max(1));

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let paths: &[PathBuf] = &paths;
                let cursor = &cursor;
                let summary = &summary;
                let cancel_flag = &cancel_flag;
                let indexer = &self.indexer;

                scope.spawn(move || loop {
                    if cancel_flag.load(Ordering::SeqCst) {
                        return;
                    }

                    let next = cursor.fetch_add(1, Ordering::SeqCst);
                    if next >= paths.len() {
                        return;
                    }
                    let path = &paths[next];

                    let _ = tx.send(ScanUpdate::Progress {
                        current: next + 1,
                        total,
                        path: path.to_string_lossy().to_string(),
                    });

                    let status = index_one(indexer, path, options);
                    summary.lock().expect("summary poisoned").record(status);
                });
            }
        });

        let summary = *summary.lock().expect("summary poisoned");

        if cancel_flag.load(Ordering::SeqCst) {
            let _ = tx.send(ScanUpdate::Cancelled);
        } else {
            let _ = tx.send(ScanUpdate::Completed { summary });
        }

        Ok(summary)
    }
}

fn index_one(indexer: &Indexer, path: &Path, options: &IndexOptions) -> IndexStatus {
    let media = match MediaFile::probe(path) {
        Ok(media) => media,
        Err(e) => {
            warn!("scan: {e}");
            return IndexStatus::Failed;
        }
    };

    let status = indexer.index(&media, options).status;
    debug!("scan: {} {}", status, path.display());
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, IndexConfig, LibraryConfig, ThumbnailConfig};
    use crate::db::{Database, Repo};
    use crate::events::EventBus;
    use crate::geo::ApiKind;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn indexer_for(lib: &Path) -> Arc<Indexer> {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.initialize().unwrap();
        let repo = Repo::new(db, Arc::new(EventBus::new()));

        let config = Config {
            db_path: lib.join("index.db"),
            library: LibraryConfig {
                originals_path: lib.to_path_buf(),
                sidecar_path: None,
                media_extensions: Vec::new(),
            },
            index: IndexConfig {
                sidecar_yaml: false,
                strip_sequence: true,
                classifier_off: true,
                detect_nsfw: false,
                private_feature: true,
                geocoder: ApiKind::None,
                workers: 2,
            },
            thumbnails: ThumbnailConfig {
                path: lib.join(".thumbs"),
            },
        };

        Arc::new(Indexer::new(config, repo))
    }

    #[test]
    fn test_scan_indexes_every_file_once() {
        let lib = tempdir().unwrap();
        for i in 0..5 {
            RgbImage::from_pixel(16, 16, Rgb([i * 40, 60, 120]))
                .save(lib.path().join(format!("IMG_{i:04}.jpg")))
                .unwrap();
        }

        let indexer = indexer_for(lib.path());
        let scanner = Scanner::new(indexer.clone());
        let (tx, rx) = mpsc::channel();

        let summary = scanner
            .scan(
                lib.path(),
                &IndexOptions::default(),
                tx,
                Arc::new(AtomicBool::new(false)),
            )
            .unwrap();

        assert_eq!(summary.added, 5);
        assert_eq!(summary.failed, 0);
        assert_eq!(indexer.repo().count_photos().unwrap(), 5);

        let updates: Vec<ScanUpdate> = rx.try_iter().collect();
        assert!(matches!(updates.first(), Some(ScanUpdate::Started { total: 5 })));
        assert!(matches!(updates.last(), Some(ScanUpdate::Completed { .. })));
    }

    #[test]
    fn test_scan_second_pass_skips_unchanged() {
        let lib = tempdir().unwrap();
        RgbImage::from_pixel(16, 16, Rgb([200, 60, 120]))
            .save(lib.path().join("IMG_0001.jpg"))
            .unwrap();

        let indexer = indexer_for(lib.path());
        let scanner = Scanner::new(indexer);
        let (tx, _rx) = mpsc::channel();

        let cancel = Arc::new(AtomicBool::new(false));
        scanner
            .scan(lib.path(), &IndexOptions::default(), tx.clone(), cancel.clone())
            .unwrap();
        let second = scanner
            .scan(lib.path(), &IndexOptions::default(), tx, cancel)
            .unwrap();

        assert_eq!(second.skipped, 1);
        assert_eq!(second.added, 0);
    }

    #[test]
    fn test_cancelled_scan_reports_cancelled() {
        let lib = tempdir().unwrap();
        RgbImage::from_pixel(16, 16, Rgb([10, 60, 120]))
            .save(lib.path().join("IMG_0001.jpg"))
            .unwrap();

        let indexer = indexer_for(lib.path());
        let scanner = Scanner::new(indexer);
        let (tx, rx) = mpsc::channel();

        let cancel = Arc::new(AtomicBool::new(true));
        scanner
            .scan(lib.path(), &IndexOptions::default(), tx, cancel)
            .unwrap();

        let updates: Vec<ScanUpdate> = rx.try_iter().collect();
        assert!(matches!(updates.last(), Some(ScanUpdate::Cancelled)));
    }
}
