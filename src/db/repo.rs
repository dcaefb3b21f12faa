//! Persistence adapter for the index pipeline.
//!
//! All reads and writes the indexer performs go through here, and this
//! is the only place domain events are published from.

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde_json::json;
use std::sync::Arc;

use crate::classify::{Label, Labels};
use crate::entity::{slugify, Camera, Details, File, Lens, Photo, PhotoKind, Place, Source};
use crate::events::EventBus;

use super::Database;

const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn store_utc(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(|d| d.format(TS_FORMAT).to_string())
}

fn load_utc(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| NaiveDateTime::parse_from_str(&s, TS_FORMAT).ok())
        .map(|n| n.and_utc())
}

fn store_naive(dt: Option<NaiveDateTime>) -> Option<String> {
    dt.map(|d| d.format(TS_FORMAT).to_string())
}

fn load_naive(s: Option<String>) -> Option<NaiveDateTime> {
    s.and_then(|s| NaiveDateTime::parse_from_str(&s, TS_FORMAT).ok())
}

const PHOTO_COLS: &str = "id, photo_uid, photo_path, photo_name, original_name, \
    photo_title, title_src, photo_description, description_src, \
    taken_at, taken_at_local, taken_src, time_zone, \
    photo_year, photo_month, photo_day, \
    photo_lat, photo_lng, photo_altitude, location_src, place_id, \
    camera_id, lens_id, camera_src, camera_serial, \
    focal_length, f_number, iso, exposure, \
    photo_type, photo_resolution, photo_private, photo_quality, document_id, \
    deleted_at";

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        uid: row.get(1)?,
        path: row.get(2)?,
        name: row.get(3)?,
        original_name: row.get(4)?,
        title: row.get(5)?,
        title_src: Source::parse(&row.get::<_, String>(6)?),
        description: row.get(7)?,
        description_src: Source::parse(&row.get::<_, String>(8)?),
        taken_at: load_utc(row.get(9)?),
        taken_at_local: load_naive(row.get(10)?),
        taken_src: Source::parse(&row.get::<_, String>(11)?),
        time_zone: row.get(12)?,
        year: row.get(13)?,
        month: row.get(14)?,
        day: row.get(15)?,
        lat: row.get(16)?,
        lng: row.get(17)?,
        altitude: row.get(18)?,
        location_src: Source::parse(&row.get::<_, String>(19)?),
        place_id: row.get(20)?,
        camera_id: row.get(21)?,
        lens_id: row.get(22)?,
        camera_src: Source::parse(&row.get::<_, String>(23)?),
        camera_serial: row.get(24)?,
        focal_length: row.get::<_, f64>(25)? as f32,
        f_number: row.get::<_, f64>(26)? as f32,
        iso: row.get(27)?,
        exposure: row.get(28)?,
        kind: PhotoKind::parse(&row.get::<_, String>(29)?),
        resolution: row.get(30)?,
        private: row.get(31)?,
        quality: row.get(32)?,
        document_id: row.get(33)?,
        deleted_at: load_utc(row.get(34)?),
    })
}

const FILE_COLS: &str = "id, file_uid, photo_id, photo_uid, \
    file_root, file_name, original_name, \
    file_hash, file_size, file_modified, \
    file_type, file_mime, file_codec, file_orientation, \
    file_width, file_height, file_aspect_ratio, file_portrait, file_duration_ms, \
    file_main_color, file_colors, file_luminance, file_chroma, file_diff, \
    file_primary, file_sidecar, file_video, file_missing, file_error, \
    instance_id, created_in_ms, updated_in_ms, deleted_at";

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<File> {
    Ok(File {
        id: row.get(0)?,
        uid: row.get(1)?,
        photo_id: row.get(2)?,
        photo_uid: row.get(3)?,
        root: row.get(4)?,
        name: row.get(5)?,
        original_name: row.get(6)?,
        hash: row.get(7)?,
        size: row.get(8)?,
        modified: load_utc(row.get(9)?),
        file_type: row.get(10)?,
        mime: row.get(11)?,
        codec: row.get(12)?,
        orientation: row.get(13)?,
        width: row.get(14)?,
        height: row.get(15)?,
        aspect_ratio: row.get::<_, f64>(16)? as f32,
        portrait: row.get(17)?,
        duration_ms: row.get(18)?,
        main_color: row.get(19)?,
        colors: row.get(20)?,
        luminance: row.get(21)?,
        chroma: row.get::<_, i64>(22)? as i16,
        diff: row.get(23)?,
        primary: row.get(24)?,
        sidecar: row.get(25)?,
        video: row.get(26)?,
        missing: row.get(27)?,
        error: row.get(28)?,
        instance_id: row.get(29)?,
        created_in_ms: row.get(30)?,
        updated_in_ms: row.get(31)?,
        deleted_at: load_utc(row.get(32)?),
    })
}

/// Store adapter shared by the indexing workers.
#[derive(Clone)]
pub struct Repo {
    db: Arc<Database>,
    bus: Arc<EventBus>,
}

impl Repo {
    pub fn new(db: Arc<Database>, bus: Arc<EventBus>) -> Repo {
        Repo { db, bus }
    }

    /// Announce that a file is entering the pipeline.
    pub fn announce_indexing(&self, file_name: &str, base_name: &str, root: &str, size: u64) {
        self.bus.publish(
            "index.indexing",
            json!({
                "fileName": file_name,
                "baseName": base_name,
                "fileRoot": root,
                "fileSize": size,
            }),
        );
    }

    // === File lookups ===

    pub fn find_file_by_name(&self, name: &str) -> Result<Option<File>> {
        let conn = self.db.lock();
        let sql = format!("SELECT {FILE_COLS} FROM files WHERE file_name = ?");
        Ok(conn
            .query_row(&sql, [name], file_from_row)
            .optional()?)
    }

    /// Hash lookup only considers live rows; a soft-deleted rendition
    /// must not block re-ingesting the same content.
    pub fn find_file_by_hash(&self, hash: &str) -> Result<Option<File>> {
        let conn = self.db.lock();
        let sql =
            format!("SELECT {FILE_COLS} FROM files WHERE file_hash = ? AND deleted_at IS NULL");
        Ok(conn.query_row(&sql, [hash], file_from_row).optional()?)
    }

    pub fn find_file_by_instance_id(&self, instance_id: &str) -> Result<Option<File>> {
        let conn = self.db.lock();
        let sql = format!("SELECT {FILE_COLS} FROM files WHERE instance_id = ?");
        Ok(conn
            .query_row(&sql, [instance_id], file_from_row)
            .optional()?)
    }

    pub fn find_primary_jpeg(&self, photo_id: i64) -> Result<Option<File>> {
        let conn = self.db.lock();
        let sql = format!(
            "SELECT {FILE_COLS} FROM files \
             WHERE photo_id = ? AND file_primary = 1 AND file_type = 'jpg'"
        );
        Ok(conn
            .query_row(&sql, [photo_id], file_from_row)
            .optional()?)
    }

    #[allow(dead_code)]
    pub fn files_of_photo(&self, photo_id: i64) -> Result<Vec<File>> {
        let conn = self.db.lock();
        let sql = format!("SELECT {FILE_COLS} FROM files WHERE photo_id = ? ORDER BY id");
        let mut stmt = conn.prepare(&sql)?;
        let files = stmt
            .query_map([photo_id], file_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    // === Photo lookups ===

    pub fn find_photo_by_id(&self, id: i64) -> Result<Option<Photo>> {
        let conn = self.db.lock();
        let sql = format!("SELECT {PHOTO_COLS} FROM photos WHERE id = ?");
        Ok(conn.query_row(&sql, [id], photo_from_row).optional()?)
    }

    pub fn find_photo_by_uid(&self, uid: &str) -> Result<Option<Photo>> {
        let conn = self.db.lock();
        let sql = format!("SELECT {PHOTO_COLS} FROM photos WHERE photo_uid = ?");
        Ok(conn.query_row(&sql, [uid], photo_from_row).optional()?)
    }

    pub fn find_photo_by_path_name(&self, path: &str, name: &str) -> Result<Option<Photo>> {
        let conn = self.db.lock();
        let sql = format!("SELECT {PHOTO_COLS} FROM photos WHERE photo_path = ? AND photo_name = ?");
        Ok(conn
            .query_row(&sql, [path, name], photo_from_row)
            .optional()?)
    }

    pub fn find_photo_by_coords_taken(
        &self,
        lat: f64,
        lng: f64,
        taken_at: DateTime<Utc>,
    ) -> Result<Option<Photo>> {
        let conn = self.db.lock();
        let sql = format!(
            "SELECT {PHOTO_COLS} FROM photos \
             WHERE photo_lat = ? AND photo_lng = ? AND taken_at = ?"
        );
        Ok(conn
            .query_row(
                &sql,
                params![lat, lng, store_utc(Some(taken_at))],
                photo_from_row,
            )
            .optional()?)
    }

    pub fn find_photo_by_document_id(&self, document_id: &str) -> Result<Option<Photo>> {
        let conn = self.db.lock();
        let sql = format!("SELECT {PHOTO_COLS} FROM photos WHERE document_id = ?");
        Ok(conn
            .query_row(&sql, [document_id], photo_from_row)
            .optional()?)
    }

    // === Photo writes ===

    pub fn create_photo(&self, photo: &mut Photo, details: &mut Details) -> Result<()> {
        {
            let conn = self.db.lock();
            conn.execute(
                "INSERT INTO photos (photo_uid, photo_path, photo_name, original_name, \
                 photo_title, title_src, photo_description, description_src, \
                 taken_at, taken_at_local, taken_src, time_zone, \
                 photo_year, photo_month, photo_day, \
                 photo_lat, photo_lng, photo_altitude, location_src, place_id, \
                 camera_id, lens_id, camera_src, camera_serial, \
                 focal_length, f_number, iso, exposure, \
                 photo_type, photo_resolution, photo_private, photo_quality, document_id, \
                 deleted_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, \
                 ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    photo.uid,
                    photo.path,
                    photo.name,
                    photo.original_name,
                    photo.title,
                    photo.title_src.as_str(),
                    photo.description,
                    photo.description_src.as_str(),
                    store_utc(photo.taken_at),
                    store_naive(photo.taken_at_local),
                    photo.taken_src.as_str(),
                    photo.time_zone,
                    photo.year,
                    photo.month,
                    photo.day,
                    photo.lat,
                    photo.lng,
                    photo.altitude,
                    photo.location_src.as_str(),
                    photo.place_id,
                    photo.camera_id,
                    photo.lens_id,
                    photo.camera_src.as_str(),
                    photo.camera_serial,
                    photo.focal_length as f64,
                    photo.f_number as f64,
                    photo.iso,
                    photo.exposure,
                    photo.kind.as_str(),
                    photo.resolution,
                    photo.private,
                    photo.quality,
                    photo.document_id,
                    store_utc(photo.deleted_at),
                ],
            )?;
            photo.id = conn.last_insert_rowid();

            details.photo_id = photo.id;
            conn.execute(
                "INSERT INTO details (photo_id, keywords, notes, subject, artist, copyright) \
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    details.photo_id,
                    details.keywords,
                    details.notes,
                    details.subject,
                    details.artist,
                    details.copyright,
                ],
            )?;
        }

        self.bus.publish("count.photos", json!({"count": 1}));
        if photo.private {
            self.bus.publish("count.private", json!({"count": 1}));
        }
        if photo.kind == PhotoKind::Video {
            self.bus.publish("count.videos", json!({"count": 1}));
        }
        self.bus.publish(
            "entities.created",
            json!({"entity": "photos", "uid": photo.uid}),
        );

        Ok(())
    }

    pub fn save_photo(&self, photo: &Photo, details: &Details) -> Result<()> {
        let conn = self.db.lock();
        conn.execute(
            "UPDATE photos SET photo_path = ?, photo_name = ?, original_name = ?, \
             photo_title = ?, title_src = ?, photo_description = ?, description_src = ?, \
             taken_at = ?, taken_at_local = ?, taken_src = ?, time_zone = ?, \
             photo_year = ?, photo_month = ?, photo_day = ?, \
             photo_lat = ?, photo_lng = ?, photo_altitude = ?, location_src = ?, place_id = ?, \
             camera_id = ?, lens_id = ?, camera_src = ?, camera_serial = ?, \
             focal_length = ?, f_number = ?, iso = ?, exposure = ?, \
             photo_type = ?, photo_resolution = ?, photo_private = ?, photo_quality = ?, \
             document_id = ?, deleted_at = ?, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?",
            params![
                photo.path,
                photo.name,
                photo.original_name,
                photo.title,
                photo.title_src.as_str(),
                photo.description,
                photo.description_src.as_str(),
                store_utc(photo.taken_at),
                store_naive(photo.taken_at_local),
                photo.taken_src.as_str(),
                photo.time_zone,
                photo.year,
                photo.month,
                photo.day,
                photo.lat,
                photo.lng,
                photo.altitude,
                photo.location_src.as_str(),
                photo.place_id,
                photo.camera_id,
                photo.lens_id,
                photo.camera_src.as_str(),
                photo.camera_serial,
                photo.focal_length as f64,
                photo.f_number as f64,
                photo.iso,
                photo.exposure,
                photo.kind.as_str(),
                photo.resolution,
                photo.private,
                photo.quality,
                photo.document_id,
                store_utc(photo.deleted_at),
                photo.id,
            ],
        )?;

        conn.execute(
            "INSERT INTO details (photo_id, keywords, notes, subject, artist, copyright) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(photo_id) DO UPDATE SET \
             keywords = excluded.keywords, notes = excluded.notes, \
             subject = excluded.subject, artist = excluded.artist, \
             copyright = excluded.copyright",
            params![
                photo.id,
                details.keywords,
                details.notes,
                details.subject,
                details.artist,
                details.copyright,
            ],
        )?;

        Ok(())
    }

    pub fn load_details(&self, photo_id: i64) -> Result<Details> {
        let conn = self.db.lock();
        let details = conn
            .query_row(
                "SELECT photo_id, keywords, notes, subject, artist, copyright \
                 FROM details WHERE photo_id = ?",
                [photo_id],
                |row| {
                    Ok(Details {
                        photo_id: row.get(0)?,
                        keywords: row.get(1)?,
                        notes: row.get(2)?,
                        subject: row.get(3)?,
                        artist: row.get(4)?,
                        copyright: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(details.unwrap_or_else(|| Details::new(photo_id)))
    }

    // === File writes ===

    pub fn create_file(&self, file: &mut File) -> Result<()> {
        {
            let conn = self.db.lock();
            conn.execute(
                "INSERT INTO files (file_uid, photo_id, photo_uid, \
                 file_root, file_name, original_name, \
                 file_hash, file_size, file_modified, \
                 file_type, file_mime, file_codec, file_orientation, \
                 file_width, file_height, file_aspect_ratio, file_portrait, file_duration_ms, \
                 file_main_color, file_colors, file_luminance, file_chroma, file_diff, \
                 file_primary, file_sidecar, file_video, file_missing, file_error, \
                 instance_id, created_in_ms, updated_in_ms, deleted_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, \
                 ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    file.uid,
                    file.photo_id,
                    file.photo_uid,
                    file.root,
                    file.name,
                    file.original_name,
                    file.hash,
                    file.size,
                    store_utc(file.modified),
                    file.file_type,
                    file.mime,
                    file.codec,
                    file.orientation,
                    file.width,
                    file.height,
                    file.aspect_ratio as f64,
                    file.portrait,
                    file.duration_ms,
                    file.main_color,
                    file.colors,
                    file.luminance,
                    file.chroma,
                    file.diff,
                    file.primary,
                    file.sidecar,
                    file.video,
                    file.missing,
                    file.error,
                    file.instance_id,
                    file.created_in_ms,
                    file.updated_in_ms,
                    store_utc(file.deleted_at),
                ],
            )?;
            file.id = conn.last_insert_rowid();
        }

        self.bus.publish("count.files", json!({"count": 1}));
        Ok(())
    }

    pub fn save_file(&self, file: &File) -> Result<()> {
        let conn = self.db.lock();
        conn.execute(
            "UPDATE files SET photo_id = ?, photo_uid = ?, \
             file_root = ?, file_name = ?, original_name = ?, \
             file_hash = ?, file_size = ?, file_modified = ?, \
             file_type = ?, file_mime = ?, file_codec = ?, file_orientation = ?, \
             file_width = ?, file_height = ?, file_aspect_ratio = ?, file_portrait = ?, \
             file_duration_ms = ?, \
             file_main_color = ?, file_colors = ?, file_luminance = ?, file_chroma = ?, \
             file_diff = ?, \
             file_primary = ?, file_sidecar = ?, file_video = ?, file_missing = ?, \
             file_error = ?, instance_id = ?, created_in_ms = ?, updated_in_ms = ?, \
             deleted_at = ? \
             WHERE id = ?",
            params![
                file.photo_id,
                file.photo_uid,
                file.root,
                file.name,
                file.original_name,
                file.hash,
                file.size,
                store_utc(file.modified),
                file.file_type,
                file.mime,
                file.codec,
                file.orientation,
                file.width,
                file.height,
                file.aspect_ratio as f64,
                file.portrait,
                file.duration_ms,
                file.main_color,
                file.colors,
                file.luminance,
                file.chroma,
                file.diff,
                file.primary,
                file.sidecar,
                file.video,
                file.missing,
                file.error,
                file.instance_id,
                file.created_in_ms,
                file.updated_in_ms,
                store_utc(file.deleted_at),
                file.id,
            ],
        )?;
        Ok(())
    }

    /// Copy video-derived info from a primary video rendition onto
    /// sibling renditions that have none of their own.
    pub fn backfill_video_info(&self, file: &File) -> Result<()> {
        let conn = self.db.lock();
        conn.execute(
            "UPDATE files SET file_codec = ?, file_duration_ms = ? \
             WHERE photo_id = ? AND id != ? AND file_duration_ms = 0 AND file_sidecar = 0",
            params![file.codec, file.duration_ms, file.photo_id, file.id],
        )?;
        Ok(())
    }

    // === Reference entities ===

    pub fn first_or_create_camera(&self, camera: Camera) -> Result<Camera> {
        let conn = self.db.lock();

        if let Some(found) = conn
            .query_row(
                "SELECT id, camera_slug, camera_make, camera_model FROM cameras WHERE camera_slug = ?",
                [&camera.slug],
                |row| {
                    Ok(Camera {
                        id: row.get(0)?,
                        slug: row.get(1)?,
                        make: row.get(2)?,
                        model: row.get(3)?,
                    })
                },
            )
            .optional()?
        {
            return Ok(found);
        }

        conn.execute(
            "INSERT INTO cameras (camera_slug, camera_make, camera_model) VALUES (?, ?, ?)",
            params![camera.slug, camera.make, camera.model],
        )?;

        Ok(Camera {
            id: conn.last_insert_rowid(),
            ..camera
        })
    }

    pub fn first_or_create_lens(&self, lens: Lens) -> Result<Lens> {
        let conn = self.db.lock();

        if let Some(found) = conn
            .query_row(
                "SELECT id, lens_slug, lens_make, lens_model FROM lenses WHERE lens_slug = ?",
                [&lens.slug],
                |row| {
                    Ok(Lens {
                        id: row.get(0)?,
                        slug: row.get(1)?,
                        make: row.get(2)?,
                        model: row.get(3)?,
                    })
                },
            )
            .optional()?
        {
            return Ok(found);
        }

        conn.execute(
            "INSERT INTO lenses (lens_slug, lens_make, lens_model) VALUES (?, ?, ?)",
            params![lens.slug, lens.make, lens.model],
        )?;

        Ok(Lens {
            id: conn.last_insert_rowid(),
            ..lens
        })
    }

    pub fn first_or_create_place(&self, place: Place) -> Result<Place> {
        let conn = self.db.lock();

        if let Some(found) = conn
            .query_row(
                "SELECT id, place_label, place_city, place_state, place_country, \
                 place_keywords, place_favorite FROM places WHERE id = ?",
                [&place.id],
                |row| {
                    Ok(Place {
                        id: row.get(0)?,
                        label: row.get(1)?,
                        city: row.get(2)?,
                        state: row.get(3)?,
                        country: row.get(4)?,
                        keywords: row.get(5)?,
                        favorite: row.get(6)?,
                    })
                },
            )
            .optional()?
        {
            return Ok(found);
        }

        conn.execute(
            "INSERT INTO places (id, place_label, place_city, place_state, place_country, \
             place_keywords, place_favorite) VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                place.id,
                place.label,
                place.city,
                place.state,
                place.country,
                place.keywords,
                place.favorite,
            ],
        )?;

        Ok(place)
    }

    // === Labels and keywords ===

    /// Attach labels to a photo. Label rows are created on first sight;
    /// repeat sightings keep the lowest uncertainty seen.
    pub fn add_labels(&self, photo_id: i64, labels: &Labels) -> Result<()> {
        let conn = self.db.lock();

        for label in labels.iter() {
            let slug = slugify(&label.name);
            if slug.is_empty() {
                continue;
            }

            conn.execute(
                "INSERT OR IGNORE INTO labels (label_slug, label_name, label_priority) \
                 VALUES (?, ?, ?)",
                params![slug, label.name, label.priority],
            )?;
            let label_id: i64 = conn.query_row(
                "SELECT id FROM labels WHERE label_slug = ?",
                [&slug],
                |row| row.get(0),
            )?;

            conn.execute(
                "INSERT INTO photo_labels (photo_id, label_id, uncertainty, source) \
                 VALUES (?, ?, ?, ?) \
                 ON CONFLICT(photo_id, label_id) DO UPDATE SET \
                 uncertainty = MIN(uncertainty, excluded.uncertainty)",
                params![photo_id, label_id, label.uncertainty, label.source],
            )?;
        }

        Ok(())
    }

    /// Labels currently attached to a photo, for scoring and keywords.
    pub fn photo_labels(&self, photo_id: i64) -> Result<Labels> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT l.label_name, l.label_priority, pl.uncertainty, pl.source \
             FROM photo_labels pl JOIN labels l ON l.id = pl.label_id \
             WHERE pl.photo_id = ? \
             ORDER BY l.label_priority, pl.uncertainty",
        )?;

        let labels = stmt
            .query_map([photo_id], |row| {
                Ok(
                    Label::new(&row.get::<_, String>(0)?, row.get(1)?, row.get(2)?)
                        .with_source(&row.get::<_, String>(3)?),
                )
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(labels.into_iter().collect())
    }

    /// Make sure every label attached to the photo is represented in the
    /// keyword index.
    pub fn sync_keyword_labels(&self, photo_id: i64) -> Result<()> {
        let names: Vec<String> = {
            let conn = self.db.lock();
            let mut stmt = conn.prepare(
                "SELECT l.label_name FROM photo_labels pl \
                 JOIN labels l ON l.id = pl.label_id WHERE pl.photo_id = ?",
            )?;
            let names = stmt
                .query_map([photo_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            names
        };

        let words: Vec<String> = names
            .iter()
            .flat_map(|n| crate::txt::keywords(n))
            .collect();
        self.link_keywords(photo_id, &crate::txt::unique_words(words))
    }

    /// Rebuild the keyword index entries for a photo from its details.
    pub fn index_keywords(&self, photo_id: i64, keywords: &str) -> Result<()> {
        self.link_keywords(photo_id, &crate::txt::split_keywords(keywords))
    }

    fn link_keywords(&self, photo_id: i64, words: &[String]) -> Result<()> {
        let conn = self.db.lock();

        for word in words {
            conn.execute("INSERT OR IGNORE INTO keywords (keyword) VALUES (?)", [word])?;
            let keyword_id: i64 =
                conn.query_row("SELECT id FROM keywords WHERE keyword = ?", [word], |row| {
                    row.get(0)
                })?;
            conn.execute(
                "INSERT OR IGNORE INTO photo_keywords (photo_id, keyword_id) VALUES (?, ?)",
                params![photo_id, keyword_id],
            )?;
        }

        Ok(())
    }

    /// Record the name a file was ingested under.
    pub fn set_download_file_id(&self, name: &str, file_id: i64) -> Result<()> {
        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO downloads (file_name, file_id) VALUES (?, ?) \
             ON CONFLICT(file_name) DO UPDATE SET file_id = excluded.file_id",
            params![name, file_id],
        )?;
        Ok(())
    }

    // === Totals ===

    pub fn count_photos(&self) -> Result<i64> {
        let conn = self.db.lock();
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM photos WHERE deleted_at IS NULL",
            [],
            |row| row.get(0),
        )?)
    }

    pub fn count_files(&self) -> Result<i64> {
        let conn = self.db.lock();
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM files WHERE deleted_at IS NULL",
            [],
            |row| row.get(0),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> Repo {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.initialize().unwrap();
        Repo::new(db, Arc::new(EventBus::new()))
    }

    #[test]
    fn test_photo_round_trip() {
        let repo = repo();
        let mut photo = Photo::new("2021/06", "IMG_0001");
        photo.set_title("Brandenburg Gate", Source::Meta);
        photo.set_coordinates(52.52, 13.40, 34, Source::Meta);
        let mut details = Details::new(0);
        details.keywords = "berlin, gate".to_string();

        repo.create_photo(&mut photo, &mut details).unwrap();
        assert!(photo.id > 0);
        assert_eq!(details.photo_id, photo.id);

        let loaded = repo.find_photo_by_id(photo.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Brandenburg Gate");
        assert_eq!(loaded.title_src, Source::Meta);
        assert_eq!(loaded.lat, 52.52);
        assert_eq!(loaded.uid, photo.uid);

        let by_path = repo
            .find_photo_by_path_name("2021/06", "IMG_0001")
            .unwrap();
        assert!(by_path.is_some());

        let loaded_details = repo.load_details(photo.id).unwrap();
        assert_eq!(loaded_details.keywords, "berlin, gate");
    }

    #[test]
    fn test_file_round_trip_and_hash_lookup() {
        let repo = repo();
        let mut file = File {
            uid: File::new_uid(),
            photo_id: 1,
            name: "2021/06/IMG_0001.jpg".to_string(),
            hash: "cafe".to_string(),
            size: 1000,
            file_type: "jpg".to_string(),
            primary: true,
            ..File::default()
        };

        repo.create_file(&mut file).unwrap();
        assert!(file.id > 0);

        let by_name = repo
            .find_file_by_name("2021/06/IMG_0001.jpg")
            .unwrap()
            .unwrap();
        assert_eq!(by_name.hash, "cafe");
        assert!(by_name.primary);

        let by_hash = repo.find_file_by_hash("cafe").unwrap();
        assert!(by_hash.is_some());

        // Soft-deleted rows stop matching by hash.
        let mut gone = by_name;
        gone.deleted_at = Some(Utc::now());
        repo.save_file(&gone).unwrap();
        assert!(repo.find_file_by_hash("cafe").unwrap().is_none());
    }

    #[test]
    fn test_first_or_create_camera_is_idempotent() {
        let repo = repo();
        let a = repo
            .first_or_create_camera(Camera::new("Canon", "EOS 80D").unwrap())
            .unwrap();
        let b = repo
            .first_or_create_camera(Camera::new("Canon", "EOS 80D").unwrap())
            .unwrap();
        assert_eq!(a.id, b.id);
        assert!(a.id > 1);
    }

    #[test]
    fn test_add_labels_keeps_lowest_uncertainty() {
        let repo = repo();
        let mut labels = Labels::default();
        labels.push(Label::new("cat", 0, 40));
        repo.add_labels(7, &labels).unwrap();

        let mut again = Labels::default();
        again.push(Label::new("cat", 0, 10));
        again.push(Label::new("animal", 0, 80));
        repo.add_labels(7, &again).unwrap();

        let stored = repo.photo_labels(7).unwrap();
        assert_eq!(stored.len(), 2);
        let cat = stored.iter().find(|l| l.name == "cat").unwrap();
        assert_eq!(cat.uncertainty, 10);
    }

    #[test]
    fn test_index_keywords_deduplicates() {
        let repo = repo();
        repo.index_keywords(3, "berlin, gate, berlin").unwrap();
        repo.index_keywords(3, "berlin").unwrap();

        let conn = repo.db.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM photo_keywords WHERE photo_id = 3",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_create_photo_publishes_counts() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.initialize().unwrap();
        let bus = Arc::new(EventBus::new());
        let rx = bus.subscribe();
        let repo = Repo::new(db, bus);

        let mut photo = Photo::new("", "clip");
        photo.kind = PhotoKind::Video;
        repo.create_photo(&mut photo, &mut Details::new(0)).unwrap();

        let topics: Vec<String> = rx.try_iter().map(|e| e.topic).collect();
        assert_eq!(topics, vec!["count.photos", "count.videos", "entities.created"]);
    }

    #[test]
    fn test_set_download_file_id_upserts() {
        let repo = repo();
        repo.set_download_file_id("upload.jpg", 1).unwrap();
        repo.set_download_file_id("upload.jpg", 2).unwrap();

        let conn = repo.db.lock();
        let id: i64 = conn
            .query_row(
                "SELECT file_id FROM downloads WHERE file_name = 'upload.jpg'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(id, 2);
    }
}
