//! The per-file index pipeline.
//!
//! One probed media file runs through identity resolution, the merge
//! branches for its format, optional classification and geocoding, and
//! finally persistence. Enrichment failures degrade to missing data;
//! store failures abort with `Failed`.

use anyhow::Result;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::classify::Labels;
use crate::entity::photo::QUALITY_PURGED;
use crate::entity::{quality, Camera, Details, File, Lens, Photo, PhotoKind, Source};
use crate::entity::{camera, place};
use crate::media::{MediaFile, MediaKind, MetaData};
use crate::sidecar::yaml;
use crate::thumb::ThumbPreset;
use crate::txt;

use super::resolve::{self, Resolution};
use super::{IndexOptions, IndexResult, IndexStatus, Indexer};

/// Live photos pair a still with a clip at most this long.
const LIVE_PHOTO_MAX_MS: i64 = 3_100;

pub(super) fn index_media_file(ind: &Indexer, m: &MediaFile, o: &IndexOptions) -> IndexResult {
    match run(ind, m, o) {
        Ok(result) => result,
        Err(e) => {
            error!(path = %m.path().display(), "index: {e:#}");
            IndexResult::failed(e)
        }
    }
}

fn run(ind: &Indexer, m: &MediaFile, o: &IndexOptions) -> Result<IndexResult> {
    let start = Instant::now();
    let repo = &ind.repo;

    let originals = ind.config.library.originals_path.clone();
    let sidecar_root = ind.config.library.sidecar_path.as_deref();
    let strip_sequence = ind.config.index.strip_sequence;

    let file_name = m.rel_name(&originals);
    let file_path = m.rel_path(&originals);
    let file_base = m.base_name(strip_sequence);

    repo.announce_indexing(&file_name, &file_base, "/", m.size());

    let binding = match resolve::resolve(repo, m, &originals, strip_sequence)? {
        Resolution::Duplicate => {
            debug!("index: {file_name} is a duplicate");
            return Ok(IndexResult::with_status(IndexStatus::Duplicate));
        }
        Resolution::Bound(b) => b,
    };

    let mut file = binding.file;
    let mut photo = binding.photo;
    let file_exists = binding.file_exists;
    let mut photo_exists = binding.photo_exists;
    let file_changed = binding.file_changed;

    if file_changed {
        debug!("index: file {file_name} was added or modified");
    }

    if !file_changed && photo_exists && o.skip_unchanged() {
        return Ok(IndexResult::with_status(IndexStatus::Skipped));
    }

    let mut details = if photo_exists {
        repo.load_details(photo.id)?
    } else {
        Details::new(0)
    };

    // No prior photo: mark it resurrectable and try a YAML restore so a
    // wiped store comes back with stable identities.
    if !photo_exists {
        photo.quality = QUALITY_PURGED;

        let mut stems = vec![m.base_name(false)];
        let stripped = m.base_name(true);
        if !stems.contains(&stripped) {
            stems.push(stripped);
        }

        if let Some(yaml_name) = yaml::find_sidecar(&originals, sidecar_root, &file_path, &stems) {
            match yaml::load(&yaml_name) {
                Ok(state) => {
                    state.apply(&mut photo, &mut details);

                    if let Some(existing) = repo.find_photo_by_uid(&photo.uid)? {
                        let mut restored_details = repo.load_details(existing.id)?;
                        photo = existing;
                        state.apply(&mut photo, &mut restored_details);
                        details = restored_details;
                        photo_exists = true;
                        info!("index: uid {} restored from {}", photo.uid, yaml_name.display());
                    } else {
                        info!("index: data restored from {}", yaml_name.display());
                    }
                }
                Err(e) => {
                    error!("index: {e:#} (restore from yaml) for {file_name}");
                }
            }
        }
    }

    photo.path = file_path.clone();
    photo.name = file_base.clone();

    // Establish the primary rendition: a JPEG, unless the photo already
    // has a primary JPEG on record.
    let mut primary_file: Option<File> = None;
    if !file.primary {
        if photo_exists {
            match repo.find_primary_jpeg(photo.id)? {
                Some(existing) => primary_file = Some(existing),
                None => file.primary = m.is_jpeg(),
            }
        } else {
            file.primary = m.is_jpeg();
        }
    }

    if !o.original_name.is_empty() {
        file.original_name = o.original_name.clone();

        if file.primary && photo.original_name.is_empty() {
            photo.original_name = crate::media::stem_of(&o.original_name, strip_sequence);
        }
    }

    if photo.is_purged() && file.primary {
        // Restore photos that have been purged automatically.
        photo.deleted_at = None;
    } else if photo.deleted_at.is_some() {
        // Don't waste time indexing deleted / archived photos.
        return Ok(IndexResult::with_status(IndexStatus::Archived));
    }

    let mut labels = Labels::default();
    let mut loc_keywords: Vec<String> = Vec::new();

    // Merge branch per format.
    match m.kind() {
        MediaKind::Jpeg => {
            match m.color_profile() {
                Ok(profile) => {
                    file.main_color = profile.main_color;
                    file.colors = profile.colors;
                    file.luminance = profile.luminance;
                    file.chroma = profile.chroma;
                    file.diff = profile.diff as i64;
                }
                Err(e) => {
                    error!("index: {e:#} for {file_name}");
                }
            }

            if m.width() > 0 && m.height() > 0 {
                file.width = m.width() as i32;
                file.height = m.height() as i32;
                file.aspect_ratio = m.aspect_ratio();
                file.portrait = m.portrait();
                photo.update_resolution(m.metadata().megapixels());
            }
        }
        MediaKind::Xmp => {
            let data = m.metadata();
            photo.set_title(&data.title, Source::Xmp);
            photo.set_description(&data.description, Source::Xmp);

            if details.no_notes() && !data.comment.is_empty() {
                details.notes = data.comment.clone();
            }
            if details.no_artist() && !data.artist.is_empty() {
                details.artist = data.artist.clone();
            }
            if details.no_copyright() && !data.copyright.is_empty() {
                details.copyright = data.copyright.clone();
            }
        }
        MediaKind::Json => {
            merge_photo_metadata(&mut photo, &mut details, &mut file, m.metadata(), Source::Json);
        }
        MediaKind::Yaml => match yaml::load(m.path()) {
            Ok(state) => {
                photo.set_title(&state.title, Source::Yaml);
                photo.set_description(&state.description, Source::Yaml);
                photo.set_taken_at(
                    state.taken_at,
                    state.taken_at_local,
                    &state.time_zone,
                    Source::Yaml,
                );
                photo.set_coordinates(state.lat, state.lng, state.altitude, Source::Yaml);

                if details.no_keywords() && !state.keywords.is_empty() {
                    details.keywords = state.keywords.clone();
                }
                if details.no_notes() && !state.notes.is_empty() {
                    details.notes = state.notes.clone();
                }
            }
            Err(e) => {
                warn!("index: {e:#} for {file_name}");
            }
        },
        MediaKind::Raw | MediaKind::Heif | MediaKind::OtherImage => {
            let data = m.metadata();
            merge_photo_metadata(&mut photo, &mut details, &mut file, data, Source::Meta);
            apply_file_dimensions(&mut file, &mut photo, data);

            if m.kind() == MediaKind::Raw && photo.kind == PhotoKind::Image {
                photo.kind = PhotoKind::Raw;
            }
        }
        MediaKind::Video => {
            let data = m.metadata();
            merge_photo_metadata(&mut photo, &mut details, &mut file, data, Source::Meta);
            apply_file_dimensions(&mut file, &mut photo, data);

            file.duration_ms = m.duration().as_millis() as i64;

            // A short clip next to a still is a live photo.
            if file.duration_ms == 0 || file.duration_ms > LIVE_PHOTO_MAX_MS {
                photo.kind = PhotoKind::Video;
            } else {
                photo.kind = PhotoKind::Live;
            }

            // Renditions without their own pixels inherit from the
            // existing primary.
            if let Some(primary) = &primary_file {
                if file.width == 0 && primary.width > 0 {
                    file.width = primary.width;
                    file.height = primary.height;
                    file.aspect_ratio = primary.aspect_ratio;
                    file.portrait = primary.portrait;
                }

                if primary.diff > 0 {
                    file.diff = primary.diff;
                    file.main_color = primary.main_color.clone();
                    file.colors = primary.colors.clone();
                    file.luminance = primary.luminance.clone();
                    file.chroma = primary.chroma;
                }
            }
        }
    }

    // The file obviously exists: clear deleted and missing markers.
    file.deleted_at = None;
    file.missing = false;
    file.error = String::new();

    // Primary renditions drive classification and the authoritative
    // metadata merge.
    if file.primary {
        if !ind.config.index.classifier_off && m.is_jpeg() {
            labels = classify_image(ind, m);

            if !photo_exists
                && ind.config.index.private_feature
                && ind.config.index.detect_nsfw
            {
                photo.private = detect_nsfw(ind, m);
            }
        }

        let data = m.metadata();
        merge_photo_metadata(&mut photo, &mut details, &mut file, data, Source::Meta);

        if photo.camera_src == Source::Auto {
            photo.camera_id = match Camera::new(&data.camera_make, &data.camera_model) {
                Some(cam) => repo.first_or_create_camera(cam)?.id,
                None => camera::UNKNOWN_ID,
            };
            photo.lens_id = match Lens::new(&data.lens_make, &data.lens_model) {
                Some(lens) => repo.first_or_create_lens(lens)?.id,
                None => camera::UNKNOWN_ID,
            };

            photo.focal_length = data.focal_length;
            photo.f_number = data.f_number;
            photo.iso = data.iso;
            photo.exposure = data.exposure.clone();
        }

        // No capture time from any source: fall back to the file mtime.
        if photo.taken_at.is_none() {
            photo.set_taken_at(Some(m.taken_at_fallback()), None, "", Source::Auto);
        }

        if ind.geocoding_enabled() && photo.has_location() {
            match ind.geocoder.lookup(photo.lat, photo.lng) {
                Ok(Some(mut location)) => {
                    if location.place.id.is_empty() {
                        location.place.id = place::cell_token(photo.lat, photo.lng);
                    }

                    match repo.first_or_create_place(location.place) {
                        Ok(resolved) => {
                            photo.place_id = resolved.id.clone();
                            loc_keywords = location.keywords;
                            loc_keywords.extend(resolved.keyword_list());
                            labels.append(location.labels);
                        }
                        Err(e) => {
                            warn!("index: {e:#} (saving place) for {file_name}");
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("index: {e:#} (geocoding) for {file_name}");
                }
            }
        }
    }

    if photo.unknown_place() {
        photo.place_id = place::UNKNOWN_PLACE_ID.to_string();
    }

    photo.update_date_fields();

    // Populate the file row.
    file.sidecar = m.is_sidecar();
    file.video = m.is_video();
    file.root = "/".to_string();
    file.name = file_name.clone();
    file.hash = m.hash().to_string();
    file.size = m.size() as i64;
    file.modified = Some(m.modified());
    file.file_type = m.kind().file_type().to_string();
    file.mime = m.mime_type().to_string();
    file.orientation = m.orientation();

    if photo_exists {
        repo.save_photo(&photo, &details)?;
    } else {
        repo.create_photo(&mut photo, &mut details)?;
    }

    repo.add_labels(photo.id, &labels)?;

    file.photo_id = photo.id;
    file.photo_uid = photo.uid.clone();

    let mut result = IndexResult::with_status(IndexStatus::Updated);
    result.photo_id = photo.id;
    result.photo_uid = photo.uid.clone();

    if file.primary {
        // Derive the keyword set; deterministic for a given input.
        let stored_labels = repo.photo_labels(photo.id)?;

        let mut words = txt::split_keywords(&details.keywords);

        if !txt::is_generated_id(&file_base) {
            words.extend(txt::filename_keywords(&file_path));
            words.extend(txt::filename_keywords(&file_base));
        }

        words.extend(loc_keywords.iter().cloned());
        words.extend(txt::filename_keywords(&file.original_name));
        if !file.main_color.is_empty() {
            words.push(file.main_color.clone());
        }
        words.extend(stored_labels.keywords());

        details.keywords = txt::join_keywords(words);

        if details.keywords.is_empty() {
            trace!("index: no keywords for {file_name}");
        } else {
            trace!("index: set keywords {} for {file_name}", details.keywords);
        }

        photo.quality = quality::score(&photo, &details, &stored_labels);

        repo.save_photo(&photo, &details)?;

        if let Err(e) = repo.sync_keyword_labels(photo.id) {
            error!("index: {e:#} for {file_name}");
        }
        if let Err(e) = repo.index_keywords(photo.id, &details.keywords) {
            error!("index: {e:#} for {file_name}");
        }
    } else {
        if photo.quality >= 0 {
            photo.quality = quality::score(&photo, &details, &repo.photo_labels(photo.id)?);
        }

        repo.save_photo(&photo, &details)?;
    }

    let elapsed_ms = start.elapsed().as_millis() as i64;

    if file_exists {
        file.updated_in_ms = elapsed_ms;
        repo.save_file(&file)?;
    } else {
        file.uid = File::new_uid();
        file.created_in_ms = elapsed_ms;
        repo.create_file(&mut file)?;
        result.status = IndexStatus::Added;
    }

    if matches!(photo.kind, PhotoKind::Video | PhotoKind::Live) && file.primary {
        if let Err(e) = repo.backfill_video_info(&file) {
            error!("index: {e:#} for {file_name}");
        }
    }

    result.file_id = file.id;
    result.file_uid = file.uid.clone();

    // Record the ingest name so later uploads of the same file resolve.
    let downloaded_as = if o.original_name.is_empty() {
        file_name.clone()
    } else {
        o.original_name.clone()
    };
    if let Err(e) = repo.set_download_file_id(&downloaded_as, file.id) {
        error!("index: {e:#} for {file_name}");
    }

    // Write the YAML sidecar when the primary rendition changed.
    if file.primary && file_changed && ind.config.index.sidecar_yaml {
        let yaml_name = yaml::yaml_file_name(&photo.path, &photo.name, &originals, sidecar_root);

        if let Err(e) = yaml::save(&photo, &details, &yaml_name) {
            error!("index: {e:#} (update yaml) for {file_name}");
        } else {
            info!("index: updated yaml file {}", yaml_name.display());
        }
    }

    Ok(result)
}

/// Merge embedded metadata into the photo and details records. Photo
/// fields go through the source-tagged setters; details fields only
/// fill when empty.
fn merge_photo_metadata(
    photo: &mut Photo,
    details: &mut Details,
    file: &mut File,
    data: &MetaData,
    src: Source,
) {
    photo.set_title(&data.title, src);
    photo.set_description(&data.description, src);
    photo.set_taken_at(data.taken_at, data.taken_at_local, &data.time_zone, src);
    photo.set_coordinates(data.lat, data.lng, data.altitude, src);

    if details.no_notes() && !data.comment.is_empty() {
        details.notes = data.comment.clone();
    }
    if details.no_subject() && !data.subject.is_empty() {
        details.subject = data.subject.clone();
    }
    if details.no_keywords() && !data.keywords.is_empty() {
        details.keywords = data.keywords.clone();
    }
    if details.no_artist() && !data.artist.is_empty() {
        details.artist = data.artist.clone();
    }
    if details.no_artist() && !data.camera_owner.is_empty() {
        details.artist = data.camera_owner.clone();
    }
    if details.no_copyright() && !data.copyright.is_empty() {
        details.copyright = data.copyright.clone();
    }

    if photo.no_camera_serial() {
        photo.camera_serial = data.camera_serial.clone();
    }

    if data.has_document_id() && photo.document_id.is_empty() {
        debug!("index: found document id {}", data.document_id);
        photo.document_id = data.document_id.clone();
    }

    if data.has_instance_id() && file.instance_id.is_empty() {
        debug!("index: found instance id {}", data.instance_id);
        file.instance_id = data.instance_id.clone();
    }
}

/// Copy pixel geometry from metadata onto the file row and raise the
/// photo resolution.
fn apply_file_dimensions(file: &mut File, photo: &mut Photo, data: &MetaData) {
    file.codec = data.codec.clone();

    if data.width > 0 && data.height > 0 {
        file.width = data.actual_width() as i32;
        file.height = data.actual_height() as i32;
        file.aspect_ratio = data.aspect_ratio();
        file.portrait = data.portrait();
        photo.update_resolution(data.megapixels());
    }
}

/// Classify a primary JPEG across the standard crops and keep the
/// confident labels.
fn classify_image(ind: &Indexer, m: &MediaFile) -> Labels {
    let Some(classifier) = &ind.classifier else {
        return Labels::default();
    };

    let start = Instant::now();

    // Square images have nothing extra in the side crops.
    let presets: &[ThumbPreset] = if m.aspect_ratio() == 1.0 {
        &[ThumbPreset::Tile224]
    } else {
        &[
            ThumbPreset::Tile224,
            ThumbPreset::Left224,
            ThumbPreset::Right224,
        ]
    };

    let mut labels = Labels::default();

    for preset in presets {
        let thumb = match ind.thumbs.thumbnail(m.path(), *preset) {
            Ok(path) => path,
            Err(e) => {
                error!("index: {e:#}");
                continue;
            }
        };

        match classifier.classify(&thumb) {
            Ok(found) => labels.append(found),
            Err(e) => {
                error!("index: {e:#}");
            }
        }
    }

    labels.sort();
    let selected = labels.select_confident();

    debug!(
        "index: image classification took {:?}",
        start.elapsed()
    );

    selected
}

/// True when the NSFW detector flags the image above the high
/// threshold. Detector failures never flag.
fn detect_nsfw(ind: &Indexer, m: &MediaFile) -> bool {
    let Some(detector) = &ind.nsfw_detector else {
        return false;
    };

    let thumb = match ind.thumbs.thumbnail(m.path(), ThumbPreset::Fit720) {
        Ok(path) => path,
        Err(e) => {
            error!("index: {e:#}");
            return false;
        }
    };

    match detector.inspect(&thumb) {
        Ok(scores) => {
            if scores.exceeds_high() {
                warn!(
                    "index: {} might contain offensive content",
                    m.path().display()
                );
                true
            } else {
                false
            }
        }
        Err(e) => {
            error!("index: {e:#}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Classifier, Label, NsfwScores};
    use crate::config::{Config, IndexConfig, LibraryConfig, ThumbnailConfig};
    use crate::db::{Database, Repo};
    use crate::entity::Place;
    use crate::events::{Event, EventBus};
    use crate::geo::{ApiKind, Geocoder, Location};
    use chrono::{TimeZone, Utc};
    use image::{Rgb, RgbImage};
    use std::path::Path;
    use std::sync::mpsc::Receiver;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    struct FakeClassifier;

    impl Classifier for FakeClassifier {
        fn classify(&self, _thumbnail: &Path) -> anyhow::Result<Labels> {
            let mut labels = Labels::default();
            labels.push(Label::new("cat", 5, 10));
            Ok(labels)
        }
    }

    struct BerlinGeocoder;

    impl Geocoder for BerlinGeocoder {
        fn lookup(&self, _lat: f64, _lng: f64) -> anyhow::Result<Option<Location>> {
            Ok(Some(Location {
                place: Place {
                    id: String::new(),
                    label: "Berlin, Germany".to_string(),
                    city: "Berlin".to_string(),
                    state: String::new(),
                    country: "de".to_string(),
                    keywords: "berlin".to_string(),
                    favorite: false,
                },
                keywords: vec!["berlin".to_string(), "germany".to_string()],
                labels: [Label::new("berlin", -1, 20).with_source("location")]
                    .into_iter()
                    .collect(),
            }))
        }
    }

    fn make_indexer(lib: &Path, classify: bool, geocode: bool) -> (Indexer, Receiver<Event>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.initialize().unwrap();
        let bus = Arc::new(EventBus::new());
        let events = bus.subscribe();
        let repo = Repo::new(db, bus);

        let config = Config {
            db_path: lib.join("index.db"),
            library: LibraryConfig {
                originals_path: lib.to_path_buf(),
                sidecar_path: None,
                media_extensions: Vec::new(),
            },
            index: IndexConfig {
                sidecar_yaml: true,
                strip_sequence: true,
                classifier_off: !classify,
                detect_nsfw: false,
                private_feature: true,
                geocoder: if geocode { ApiKind::Places } else { ApiKind::None },
                workers: 0,
            },
            thumbnails: ThumbnailConfig {
                path: lib.join(".thumbs"),
            },
        };

        let mut indexer = Indexer::new(config, repo);
        if classify {
            indexer = indexer.with_classifier(Arc::new(FakeClassifier));
        }
        if geocode {
            indexer = indexer.with_geocoder(Arc::new(BerlinGeocoder));
        }

        (indexer, events)
    }

    fn write_jpeg(path: &Path, shade: u8) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        RgbImage::from_pixel(64, 48, Rgb([shade, 30, 30]))
            .save(path)
            .unwrap();
    }

    fn berlin_meta() -> MetaData {
        MetaData {
            taken_at: Some(Utc.with_ymd_and_hms(2021, 6, 1, 10, 0, 0).unwrap()),
            taken_at_local: Some(
                Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap().naive_utc(),
            ),
            time_zone: "+02:00".to_string(),
            lat: 52.52,
            lng: 13.40,
            altitude: 34,
            width: 3000,
            height: 2000,
            camera_make: "Canon".to_string(),
            camera_model: "EOS 80D".to_string(),
            lens_model: "EF 50mm".to_string(),
            focal_length: 50.0,
            f_number: 1.8,
            iso: 100,
            exposure: "1/250".to_string(),
            ..MetaData::default()
        }
    }

    fn topics(events: &Receiver<Event>) -> Vec<String> {
        events.try_iter().map(|e| e.topic).collect()
    }

    #[test]
    fn test_first_ingest_of_jpeg_with_metadata() {
        let lib = tempdir().unwrap();
        let (indexer, events) = make_indexer(lib.path(), true, true);

        let path = lib.path().join("2021/berlin/IMG_0001.jpg");
        write_jpeg(&path, 220);
        let media = MediaFile::probe(&path).unwrap().with_metadata(berlin_meta());

        let result = indexer.index(&media, &IndexOptions::default());
        assert_eq!(result.status, IndexStatus::Added);
        assert!(result.success());

        let photo = indexer
            .repo()
            .find_photo_by_id(result.photo_id)
            .unwrap()
            .unwrap();
        assert_eq!(photo.kind, PhotoKind::Image);
        assert_eq!(photo.resolution, 6);
        assert_eq!(
            photo.taken_at,
            Some(Utc.with_ymd_and_hms(2021, 6, 1, 10, 0, 0).unwrap())
        );
        assert_eq!((photo.year, photo.month, photo.day), (2021, 6, 1));
        assert!(photo.camera_id > 1);
        assert_ne!(photo.place_id, "zz");
        assert!(photo.quality >= 4);
        assert!(photo.deleted_at.is_none());

        let file = indexer
            .repo()
            .find_file_by_name("2021/berlin/IMG_0001.jpg")
            .unwrap()
            .unwrap();
        assert!(file.primary);
        assert_eq!(file.width, 3000);
        assert_eq!(file.main_color, "red");
        assert_eq!(file.photo_id, photo.id);

        let details = indexer.repo().load_details(photo.id).unwrap();
        assert!(details.keywords.contains("berlin"));
        assert!(details.keywords.contains("red"));
        assert!(details.keywords.contains("cat"));

        let seen = topics(&events);
        assert!(seen.contains(&"index.indexing".to_string()));
        assert!(seen.contains(&"count.photos".to_string()));
        assert!(seen.contains(&"count.files".to_string()));

        // The YAML sidecar was written next to the original.
        assert!(lib.path().join("2021/berlin/IMG_0001.yml").exists());
    }

    #[test]
    fn test_raw_joins_existing_jpeg_photo() {
        let lib = tempdir().unwrap();
        let (indexer, _events) = make_indexer(lib.path(), false, false);

        let jpeg = lib.path().join("IMG_0002.jpg");
        write_jpeg(&jpeg, 200);
        let first = indexer.index(
            &MediaFile::probe(&jpeg).unwrap(),
            &IndexOptions::default(),
        );
        assert_eq!(first.status, IndexStatus::Added);

        let raw = lib.path().join("IMG_0002.cr2");
        std::fs::write(&raw, b"not really raw bytes").unwrap();
        let second = indexer.index(
            &MediaFile::probe(&raw).unwrap(),
            &IndexOptions::default(),
        );
        assert_eq!(second.status, IndexStatus::Added);

        // Same photo, two files, JPEG stays primary.
        assert_eq!(first.photo_id, second.photo_id);
        assert_eq!(indexer.repo().count_files().unwrap(), 2);

        let photo = indexer
            .repo()
            .find_photo_by_id(first.photo_id)
            .unwrap()
            .unwrap();
        assert_eq!(photo.kind, PhotoKind::Raw);

        let files = indexer.repo().files_of_photo(photo.id).unwrap();
        let primaries: Vec<_> = files.iter().filter(|f| f.primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].file_type, "jpg");
    }

    #[test]
    fn test_duplicate_content_is_rejected_without_writes() {
        let lib = tempdir().unwrap();
        let (indexer, events) = make_indexer(lib.path(), false, false);

        let jpeg = lib.path().join("IMG_0003.jpg");
        write_jpeg(&jpeg, 180);
        indexer.index(&MediaFile::probe(&jpeg).unwrap(), &IndexOptions::default());

        let copy = lib.path().join("album/IMG_9999.jpg");
        std::fs::create_dir_all(copy.parent().unwrap()).unwrap();
        std::fs::copy(&jpeg, &copy).unwrap();

        let _ = topics(&events); // drain

        let result = indexer.index(&MediaFile::probe(&copy).unwrap(), &IndexOptions::default());
        assert_eq!(result.status, IndexStatus::Duplicate);
        assert!(result.error.is_none());

        assert_eq!(indexer.repo().count_photos().unwrap(), 1);
        assert_eq!(indexer.repo().count_files().unwrap(), 1);
        assert_eq!(topics(&events), vec!["index.indexing"]);
    }

    #[test]
    fn test_unchanged_file_is_skipped_and_modified_file_updates_in_place() {
        let lib = tempdir().unwrap();
        let (indexer, events) = make_indexer(lib.path(), false, false);

        let jpeg = lib.path().join("IMG_0004.jpg");
        write_jpeg(&jpeg, 160);
        let first = indexer.index(&MediaFile::probe(&jpeg).unwrap(), &IndexOptions::default());
        assert_eq!(first.status, IndexStatus::Added);

        let _ = topics(&events);

        // Unchanged re-index short-circuits without writes.
        let again = indexer.index(&MediaFile::probe(&jpeg).unwrap(), &IndexOptions::default());
        assert_eq!(again.status, IndexStatus::Skipped);
        assert_eq!(topics(&events), vec!["index.indexing"]);

        // Re-encoded content under the same name updates the row. The
        // new encode has a different size, so the change is detected
        // regardless of mtime granularity.
        RgbImage::from_pixel(128, 96, Rgb([40, 30, 30]))
            .save(&jpeg)
            .unwrap();
        let modified = indexer.index(&MediaFile::probe(&jpeg).unwrap(), &IndexOptions::default());
        assert_eq!(modified.status, IndexStatus::Updated);
        assert_eq!(modified.file_id, first.file_id);
        assert_eq!(indexer.repo().count_files().unwrap(), 1);
    }

    #[test]
    fn test_rescan_option_reindexes_unchanged_files() {
        let lib = tempdir().unwrap();
        let (indexer, _events) = make_indexer(lib.path(), false, false);

        let jpeg = lib.path().join("IMG_0005.jpg");
        write_jpeg(&jpeg, 150);
        indexer.index(&MediaFile::probe(&jpeg).unwrap(), &IndexOptions::default());

        let rescan = IndexOptions {
            rescan: true,
            ..IndexOptions::default()
        };
        let result = indexer.index(&MediaFile::probe(&jpeg).unwrap(), &rescan);
        assert_eq!(result.status, IndexStatus::Updated);
    }

    #[test]
    fn test_keywords_are_deterministic() {
        let lib = tempdir().unwrap();
        let (indexer, _events) = make_indexer(lib.path(), true, true);

        let jpeg = lib.path().join("summer/beach_sunset.jpg");
        write_jpeg(&jpeg, 210);
        let media = MediaFile::probe(&jpeg).unwrap().with_metadata(berlin_meta());
        let first = indexer.index(&media, &IndexOptions::default());

        let before = indexer.repo().load_details(first.photo_id).unwrap().keywords;
        assert!(before.contains("beach"));
        assert!(before.contains("sunset"));

        let rescan = IndexOptions {
            rescan: true,
            ..IndexOptions::default()
        };
        let media = MediaFile::probe(&jpeg).unwrap().with_metadata(berlin_meta());
        indexer.index(&media, &rescan);

        let after = indexer.repo().load_details(first.photo_id).unwrap().keywords;
        assert_eq!(before, after);
    }

    #[test]
    fn test_short_clip_next_to_jpeg_makes_live_photo() {
        let lib = tempdir().unwrap();
        let (indexer, _events) = make_indexer(lib.path(), false, false);

        let jpeg = lib.path().join("IMG_0006.jpg");
        write_jpeg(&jpeg, 190);
        let still = indexer.index(&MediaFile::probe(&jpeg).unwrap(), &IndexOptions::default());

        let mov = lib.path().join("IMG_0006.mov");
        std::fs::write(&mov, b"clip bytes").unwrap();
        let media = MediaFile::probe(&mov).unwrap().with_metadata(MetaData {
            duration: Duration::from_millis(2_500),
            codec: "hevc".to_string(),
            ..MetaData::default()
        });
        let clip = indexer.index(&media, &IndexOptions::default());

        assert_eq!(clip.photo_id, still.photo_id);

        let photo = indexer
            .repo()
            .find_photo_by_id(still.photo_id)
            .unwrap()
            .unwrap();
        assert_eq!(photo.kind, PhotoKind::Live);

        // The clip inherits pixel geometry from the primary JPEG.
        let file = indexer
            .repo()
            .find_file_by_name("IMG_0006.mov")
            .unwrap()
            .unwrap();
        assert!(file.video);
        assert!(!file.primary);
        assert_eq!(file.width, 64);
        assert_eq!(file.main_color, "red");
    }

    #[test]
    fn test_long_clip_is_a_video() {
        let lib = tempdir().unwrap();
        let (indexer, _events) = make_indexer(lib.path(), false, false);

        let mov = lib.path().join("IMG_0007.mov");
        std::fs::write(&mov, b"clip bytes").unwrap();
        let media = MediaFile::probe(&mov).unwrap().with_metadata(MetaData {
            duration: Duration::from_secs(5),
            ..MetaData::default()
        });
        let result = indexer.index(&media, &IndexOptions::default());

        let photo = indexer
            .repo()
            .find_photo_by_id(result.photo_id)
            .unwrap()
            .unwrap();
        assert_eq!(photo.kind, PhotoKind::Video);
    }

    #[test]
    fn test_purged_photo_is_resurrected_by_primary_file() {
        let lib = tempdir().unwrap();
        let (indexer, _events) = make_indexer(lib.path(), false, false);

        let jpeg = lib.path().join("IMG_0008.jpg");
        write_jpeg(&jpeg, 170);
        let first = indexer.index(&MediaFile::probe(&jpeg).unwrap(), &IndexOptions::default());

        // Purge the photo the way the cleanup job would.
        let mut photo = indexer
            .repo()
            .find_photo_by_id(first.photo_id)
            .unwrap()
            .unwrap();
        let details = indexer.repo().load_details(photo.id).unwrap();
        photo.quality = QUALITY_PURGED;
        photo.deleted_at = Some(Utc::now());
        indexer.repo().save_photo(&photo, &details).unwrap();

        let rescan = IndexOptions {
            rescan: true,
            ..IndexOptions::default()
        };
        let result = indexer.index(&MediaFile::probe(&jpeg).unwrap(), &rescan);
        assert_eq!(result.status, IndexStatus::Updated);

        let restored = indexer
            .repo()
            .find_photo_by_id(first.photo_id)
            .unwrap()
            .unwrap();
        assert!(restored.deleted_at.is_none());
        assert!(restored.quality >= 0);
        assert_eq!(restored.uid, photo.uid);
    }

    #[test]
    fn test_archived_photo_is_not_reindexed() {
        let lib = tempdir().unwrap();
        let (indexer, _events) = make_indexer(lib.path(), false, false);

        let jpeg = lib.path().join("IMG_0009.jpg");
        write_jpeg(&jpeg, 120);
        let first = indexer.index(&MediaFile::probe(&jpeg).unwrap(), &IndexOptions::default());

        let mut photo = indexer
            .repo()
            .find_photo_by_id(first.photo_id)
            .unwrap()
            .unwrap();
        let details = indexer.repo().load_details(photo.id).unwrap();
        photo.deleted_at = Some(Utc::now());
        indexer.repo().save_photo(&photo, &details).unwrap();

        let rescan = IndexOptions {
            rescan: true,
            ..IndexOptions::default()
        };
        let result = indexer.index(&MediaFile::probe(&jpeg).unwrap(), &rescan);
        assert_eq!(result.status, IndexStatus::Archived);
    }

    #[test]
    fn test_yaml_sidecar_restores_identity_after_store_wipe() {
        let lib = tempdir().unwrap();

        let jpeg = lib.path().join("2021/IMG_0010.jpg");
        write_jpeg(&jpeg, 140);

        let original_uid = {
            let (indexer, _events) = make_indexer(lib.path(), false, false);
            let media = MediaFile::probe(&jpeg).unwrap().with_metadata(berlin_meta());
            let result = indexer.index(&media, &IndexOptions::default());
            result.photo_uid
        };
        assert!(lib.path().join("2021/IMG_0010.yml").exists());

        // A fresh store knows nothing; the sidecar brings the uid and
        // the user-visible fields back.
        let (indexer, _events) = make_indexer(lib.path(), false, false);
        let media = MediaFile::probe(&jpeg).unwrap().with_metadata(MetaData::default());
        let result = indexer.index(&media, &IndexOptions::default());

        assert_eq!(result.status, IndexStatus::Added);
        assert_eq!(result.photo_uid, original_uid);

        let photo = indexer
            .repo()
            .find_photo_by_uid(&original_uid)
            .unwrap()
            .unwrap();
        assert_eq!(photo.lat, 52.52);
        assert_eq!(photo.taken_src, Source::Meta);
    }

    #[test]
    fn test_xmp_sidecar_fills_empty_details_only() {
        let lib = tempdir().unwrap();
        let (indexer, _events) = make_indexer(lib.path(), false, false);

        let jpeg = lib.path().join("IMG_0011.jpg");
        write_jpeg(&jpeg, 130);
        let first = indexer.index(&MediaFile::probe(&jpeg).unwrap(), &IndexOptions::default());

        let xmp = lib.path().join("IMG_0011.xmp");
        std::fs::write(
            &xmp,
            "<x:xmpmeta><rdf:RDF><rdf:Description>\
             <dc:title><rdf:Alt><rdf:li>Harbor at Dusk</rdf:li></rdf:Alt></dc:title>\
             <dc:creator><rdf:Seq><rdf:li>Jane Doe</rdf:li></rdf:Seq></dc:creator>\
             </rdf:Description></rdf:RDF></x:xmpmeta>",
        )
        .unwrap();

        let result = indexer.index(&MediaFile::probe(&xmp).unwrap(), &IndexOptions::default());
        assert_eq!(result.photo_id, first.photo_id);

        let photo = indexer
            .repo()
            .find_photo_by_id(first.photo_id)
            .unwrap()
            .unwrap();
        assert_eq!(photo.title, "Harbor at Dusk");
        assert_eq!(photo.title_src, Source::Xmp);

        let details = indexer.repo().load_details(first.photo_id).unwrap();
        assert_eq!(details.artist, "Jane Doe");

        let sidecar = indexer
            .repo()
            .find_file_by_name("IMG_0011.xmp")
            .unwrap()
            .unwrap();
        assert!(sidecar.sidecar);
        assert!(!sidecar.primary);
    }

    #[test]
    fn test_mtime_fallback_when_no_capture_time() {
        let lib = tempdir().unwrap();
        let (indexer, _events) = make_indexer(lib.path(), false, false);

        let jpeg = lib.path().join("IMG_0012.jpg");
        write_jpeg(&jpeg, 110);
        let media = MediaFile::probe(&jpeg).unwrap();
        let result = indexer.index(&media, &IndexOptions::default());

        let photo = indexer
            .repo()
            .find_photo_by_id(result.photo_id)
            .unwrap()
            .unwrap();
        assert!(photo.taken_at.is_some());
        assert!(photo.taken_at_local.is_some());
        assert_eq!(photo.taken_src, Source::Auto);
    }

    #[test]
    fn test_original_name_is_recorded() {
        let lib = tempdir().unwrap();
        let (indexer, _events) = make_indexer(lib.path(), false, false);

        let jpeg = lib.path().join("upload_tmp_1234.jpg");
        write_jpeg(&jpeg, 100);
        let options = IndexOptions {
            rescan: false,
            original_name: "Holiday in Rome.jpg".to_string(),
        };
        let result = indexer.index(&MediaFile::probe(&jpeg).unwrap(), &options);

        let photo = indexer
            .repo()
            .find_photo_by_id(result.photo_id)
            .unwrap()
            .unwrap();
        assert_eq!(photo.original_name, "Holiday in Rome");

        let details = indexer.repo().load_details(result.photo_id).unwrap();
        assert!(details.keywords.contains("holiday"));
        assert!(details.keywords.contains("rome"));
    }

    #[test]
    fn test_nsfw_detection_marks_photo_private() {
        struct FlaggingDetector;

        impl crate::classify::NsfwDetector for FlaggingDetector {
            fn inspect(&self, _thumbnail: &Path) -> anyhow::Result<NsfwScores> {
                Ok(NsfwScores {
                    porn: 0.95,
                    ..NsfwScores::default()
                })
            }
        }

        let lib = tempdir().unwrap();
        let (indexer, _events) = make_indexer(lib.path(), true, false);
        let mut config = indexer.config().clone();
        config.index.detect_nsfw = true;
        let indexer = Indexer::new(config, indexer.repo().clone())
            .with_classifier(Arc::new(FakeClassifier))
            .with_nsfw_detector(Arc::new(FlaggingDetector));

        let jpeg = lib.path().join("IMG_0013.jpg");
        write_jpeg(&jpeg, 90);
        let result = indexer.index(&MediaFile::probe(&jpeg).unwrap(), &IndexOptions::default());

        let photo = indexer
            .repo()
            .find_photo_by_id(result.photo_id)
            .unwrap()
            .unwrap();
        assert!(photo.private);
    }
}
