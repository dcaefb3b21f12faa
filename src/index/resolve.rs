//! Identity resolution: bind a probed file to its file and photo rows.
//!
//! Rules run in a fixed order and the first match is authoritative:
//! file by path, file by content hash, file by embedded instance id,
//! then photo by path and stem, by coordinates and capture time, and by
//! embedded document id.

use anyhow::Result;
use std::path::Path;

use crate::db::Repo;
use crate::entity::{File, Photo};
use crate::media::MediaFile;

/// A successful binding of a probed file to (possibly fresh) records.
#[derive(Debug)]
pub struct Binding {
    pub file: File,
    pub photo: Photo,
    pub file_exists: bool,
    pub photo_exists: bool,
    pub file_changed: bool,
}

#[derive(Debug)]
pub enum Resolution {
    /// Same content already indexed under a path that still exists.
    Duplicate,
    Bound(Box<Binding>),
}

pub fn resolve(
    repo: &Repo,
    media: &MediaFile,
    originals: &Path,
    strip_sequence: bool,
) -> Result<Resolution> {
    let file_name = media.rel_name(originals);
    let file_path = media.rel_path(originals);
    let file_base = media.base_name(strip_sequence);

    let mut file = File::default();
    let mut file_exists = false;

    // 1. File by exact path.
    if let Some(found) = repo.find_file_by_name(&file_name)? {
        file = found;
        file_exists = true;
    }

    // 2. File by content hash; only for real media, sidecars share too
    // little content to be identified this way.
    if !file_exists && !media.is_sidecar() {
        if let Some(found) = repo.find_file_by_hash(media.hash())? {
            if originals.join(&found.name).exists() {
                return Ok(Resolution::Duplicate);
            }
            // The original location is gone; the file moved.
            file = found;
            file_exists = true;
        }

        // 3. File by embedded instance id.
        if !file_exists && media.metadata().has_instance_id() {
            if let Some(found) = repo.find_file_by_instance_id(&media.metadata().instance_id)? {
                file = found;
                file_exists = true;
            }
        }
    }

    let mut photo = None;

    if file_exists {
        // 7. The bound file names its photo.
        photo = repo.find_photo_by_id(file.photo_id)?;
    } else {
        // 4. Photo by directory and stem, grouping renditions.
        photo = repo.find_photo_by_path_name(&file_path, &file_base)?;

        // 5. Photo by coordinates and capture time.
        if photo.is_none() && media.metadata().has_time_and_place() {
            let meta = media.metadata();
            if let Some(taken_at) = meta.taken_at {
                photo = repo.find_photo_by_coords_taken(meta.lat, meta.lng, taken_at)?;
            }
        }

        // 6. Photo by embedded document id.
        if photo.is_none() && media.metadata().has_document_id() {
            photo = repo.find_photo_by_document_id(&media.metadata().document_id)?;
        }
    }

    let file_changed = file_changed(&file, file_exists, media);

    let photo_exists = photo.is_some();
    let photo = photo.unwrap_or_else(|| Photo::new(&file_path, &file_base));

    Ok(Resolution::Bound(Box::new(Binding {
        file,
        photo,
        file_exists,
        photo_exists,
        file_changed,
    })))
}

/// Size is checked first, then the modification time; when only the
/// mtime moved the content hash decides, so a metadata-only touch does
/// not force a re-index.
fn file_changed(file: &File, file_exists: bool, media: &MediaFile) -> bool {
    if !file_exists {
        return true;
    }

    if file.size != media.size() as i64 {
        return true;
    }

    let mtime_differs = match file.modified {
        Some(prev) => (prev.timestamp() - media.modified().timestamp()).abs() > 1,
        None => true,
    };

    if !mtime_differs {
        return false;
    }

    file.hash.is_empty() || file.hash != media.hash()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::entity::Details;
    use crate::events::EventBus;
    use crate::media::MetaData;
    use chrono::{TimeZone, Utc};
    use image::{Rgb, RgbImage};
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    fn repo() -> Repo {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.initialize().unwrap();
        Repo::new(db, Arc::new(EventBus::new()))
    }

    fn library() -> TempDir {
        tempdir().unwrap()
    }

    fn write_jpeg(path: &Path, shade: u8) {
        RgbImage::from_pixel(16, 16, Rgb([shade, shade / 2, 30]))
            .save(path)
            .unwrap();
    }

    fn seed_file(repo: &Repo, media: &MediaFile, originals: &Path, photo_id: i64) -> File {
        let mut file = File {
            uid: File::new_uid(),
            photo_id,
            name: media.rel_name(originals),
            hash: media.hash().to_string(),
            size: media.size() as i64,
            modified: Some(media.modified()),
            file_type: "jpg".to_string(),
            ..File::default()
        };
        repo.create_file(&mut file).unwrap();
        file
    }

    fn seed_photo(repo: &Repo, path: &str, name: &str) -> Photo {
        let mut photo = Photo::new(path, name);
        repo.create_photo(&mut photo, &mut Details::new(0)).unwrap();
        photo
    }

    #[test]
    fn test_unknown_file_binds_fresh_records() {
        let repo = repo();
        let lib = library();
        let path = lib.path().join("IMG_0001.jpg");
        write_jpeg(&path, 200);
        let media = MediaFile::probe(&path).unwrap();

        match resolve(&repo, &media, lib.path(), true).unwrap() {
            Resolution::Bound(b) => {
                assert!(!b.file_exists);
                assert!(!b.photo_exists);
                assert!(b.file_changed);
                assert_eq!(b.photo.name, "IMG_0001");
            }
            Resolution::Duplicate => panic!("unexpected duplicate"),
        }
    }

    #[test]
    fn test_file_found_by_path() {
        let repo = repo();
        let lib = library();
        let path = lib.path().join("IMG_0001.jpg");
        write_jpeg(&path, 200);
        let media = MediaFile::probe(&path).unwrap();

        let photo = seed_photo(&repo, "", "IMG_0001");
        let seeded = seed_file(&repo, &media, lib.path(), photo.id);

        match resolve(&repo, &media, lib.path(), true).unwrap() {
            Resolution::Bound(b) => {
                assert!(b.file_exists);
                assert_eq!(b.file.id, seeded.id);
                assert!(b.photo_exists);
                assert_eq!(b.photo.id, photo.id);
                assert!(!b.file_changed);
            }
            Resolution::Duplicate => panic!("unexpected duplicate"),
        }
    }

    #[test]
    fn test_same_content_elsewhere_is_duplicate() {
        let repo = repo();
        let lib = library();
        let path = lib.path().join("IMG_0001.jpg");
        write_jpeg(&path, 200);
        let media = MediaFile::probe(&path).unwrap();

        let photo = seed_photo(&repo, "", "IMG_0001");
        seed_file(&repo, &media, lib.path(), photo.id);

        // A copy of the same bytes under a different name.
        let copy = lib.path().join("copy.jpg");
        std::fs::copy(&path, &copy).unwrap();
        let copy_media = MediaFile::probe(&copy).unwrap();

        assert!(matches!(
            resolve(&repo, &copy_media, lib.path(), true).unwrap(),
            Resolution::Duplicate
        ));
    }

    #[test]
    fn test_moved_file_reuses_row() {
        let repo = repo();
        let lib = library();
        let path = lib.path().join("IMG_0001.jpg");
        write_jpeg(&path, 200);
        let media = MediaFile::probe(&path).unwrap();

        let photo = seed_photo(&repo, "", "IMG_0001");
        let seeded = seed_file(&repo, &media, lib.path(), photo.id);

        // Move the file; the stored path no longer exists on disk.
        let moved = lib.path().join("renamed.jpg");
        std::fs::rename(&path, &moved).unwrap();
        let moved_media = MediaFile::probe(&moved).unwrap();

        match resolve(&repo, &moved_media, lib.path(), true).unwrap() {
            Resolution::Bound(b) => {
                assert!(b.file_exists);
                assert_eq!(b.file.id, seeded.id);
            }
            Resolution::Duplicate => panic!("moved file must not count as duplicate"),
        }
    }

    #[test]
    fn test_raw_groups_with_jpeg_by_stem() {
        let repo = repo();
        let lib = library();
        let photo = seed_photo(&repo, "", "IMG_0001");

        let raw_path = lib.path().join("IMG_0001.cr2");
        std::fs::write(&raw_path, b"raw bytes").unwrap();
        let media = MediaFile::probe(&raw_path).unwrap();

        match resolve(&repo, &media, lib.path(), true).unwrap() {
            Resolution::Bound(b) => {
                assert!(!b.file_exists);
                assert!(b.photo_exists);
                assert_eq!(b.photo.id, photo.id);
            }
            Resolution::Duplicate => panic!("unexpected duplicate"),
        }
    }

    #[test]
    fn test_photo_found_by_time_and_place() {
        let repo = repo();
        let lib = library();
        let taken = Utc.with_ymd_and_hms(2021, 6, 1, 10, 0, 0).unwrap();

        let mut photo = Photo::new("2021", "IMG_0042");
        photo.taken_at = Some(taken);
        photo.lat = 52.52;
        photo.lng = 13.40;
        repo.create_photo(&mut photo, &mut Details::new(0)).unwrap();

        let path = lib.path().join("different_name.cr2");
        std::fs::write(&path, b"raw bytes").unwrap();
        let media = MediaFile::probe(&path).unwrap().with_metadata(MetaData {
            taken_at: Some(taken),
            lat: 52.52,
            lng: 13.40,
            ..MetaData::default()
        });

        match resolve(&repo, &media, lib.path(), true).unwrap() {
            Resolution::Bound(b) => {
                assert!(b.photo_exists);
                assert_eq!(b.photo.id, photo.id);
            }
            Resolution::Duplicate => panic!("unexpected duplicate"),
        }
    }

    #[test]
    fn test_photo_found_by_document_id() {
        let repo = repo();
        let lib = library();

        let mut photo = Photo::new("2021", "IMG_0042");
        photo.document_id = "doc-123".to_string();
        repo.create_photo(&mut photo, &mut Details::new(0)).unwrap();

        let path = lib.path().join("other.cr2");
        std::fs::write(&path, b"raw bytes").unwrap();
        let media = MediaFile::probe(&path).unwrap().with_metadata(MetaData {
            document_id: "doc-123".to_string(),
            ..MetaData::default()
        });

        match resolve(&repo, &media, lib.path(), true).unwrap() {
            Resolution::Bound(b) => {
                assert!(b.photo_exists);
                assert_eq!(b.photo.id, photo.id);
            }
            Resolution::Duplicate => panic!("unexpected duplicate"),
        }
    }

    #[test]
    fn test_mtime_only_touch_is_unchanged() {
        let repo = repo();
        let lib = library();
        let path = lib.path().join("IMG_0001.jpg");
        write_jpeg(&path, 200);
        let media = MediaFile::probe(&path).unwrap();

        let photo = seed_photo(&repo, "", "IMG_0001");
        let mut seeded = seed_file(&repo, &media, lib.path(), photo.id);

        // Pretend the row was written with an older mtime; the hash
        // still matches, so the file counts as unchanged.
        seeded.modified = Some(media.modified() - chrono::Duration::seconds(120));
        repo.save_file(&seeded).unwrap();

        match resolve(&repo, &media, lib.path(), true).unwrap() {
            Resolution::Bound(b) => assert!(!b.file_changed),
            Resolution::Duplicate => panic!("unexpected duplicate"),
        }
    }
}
