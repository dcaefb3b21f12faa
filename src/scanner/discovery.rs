use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::media::MediaKind;

/// Find all indexable files under a directory.
///
/// Hidden directories are skipped. The result is ordered so that real
/// media sorts before sidecars; a sidecar indexed after its image binds
/// to the photo the image created.
pub fn discover_media(directory: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e
                    .file_name()
                    .to_string_lossy()
                    .starts_with('.')
        })
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let Some(kind) = MediaKind::from_path(path) else {
            continue;
        };

        if !extensions.is_empty() {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .unwrap_or_default();
            if !extensions.iter().any(|e| e.to_lowercase() == ext) {
                continue;
            }
        }

        found.push((kind.is_sidecar(), path.to_path_buf()));
    }

    found.sort();

    Ok(found.into_iter().map(|(_, path)| path).collect())
}
