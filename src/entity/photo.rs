//! The photo record: one logical capture event, possibly backed by
//! several file renditions.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::source::Source;

/// Quality value marking a purged photo that may be resurrected when its
/// primary file reappears.
pub const QUALITY_PURGED: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PhotoKind {
    #[default]
    Image,
    Raw,
    Video,
    Live,
}

impl PhotoKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PhotoKind::Image => "image",
            PhotoKind::Raw => "raw",
            PhotoKind::Video => "video",
            PhotoKind::Live => "live",
        }
    }

    pub fn parse(s: &str) -> PhotoKind {
        match s {
            "raw" => PhotoKind::Raw,
            "video" => PhotoKind::Video,
            "live" => PhotoKind::Live,
            _ => PhotoKind::Image,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Photo {
    pub id: i64,
    pub uid: String,

    /// Directory within the library.
    pub path: String,
    /// Base name shared by all renditions.
    pub name: String,
    /// Name the primary file was ingested under, if different.
    pub original_name: String,

    pub title: String,
    pub title_src: Source,
    pub description: String,
    pub description_src: Source,

    pub taken_at: Option<DateTime<Utc>>,
    pub taken_at_local: Option<NaiveDateTime>,
    pub taken_src: Source,
    pub time_zone: String,
    pub year: i32,
    pub month: i32,
    pub day: i32,

    pub lat: f64,
    pub lng: f64,
    pub altitude: i32,
    pub location_src: Source,
    pub place_id: String,

    pub camera_id: i64,
    pub lens_id: i64,
    pub camera_src: Source,
    pub camera_serial: String,
    pub focal_length: f32,
    pub f_number: f32,
    pub iso: i32,
    pub exposure: String,

    pub kind: PhotoKind,
    pub resolution: i32,
    pub private: bool,
    pub quality: i32,

    /// Global capture identifier embedded by the camera or an editor.
    pub document_id: String,

    pub deleted_at: Option<DateTime<Utc>>,
}

impl Photo {
    pub fn new(path: &str, name: &str) -> Photo {
        Photo {
            uid: super::new_uid('p'),
            path: path.to_string(),
            name: name.to_string(),
            camera_id: super::camera::UNKNOWN_ID,
            lens_id: super::camera::UNKNOWN_ID,
            ..Photo::default()
        }
    }

    pub fn set_title(&mut self, title: &str, src: Source) {
        let title = title.trim();
        if title.is_empty() || !src.overrides(self.title_src) {
            return;
        }
        self.title = title.to_string();
        self.title_src = src;
    }

    pub fn set_description(&mut self, description: &str, src: Source) {
        let description = description.trim();
        if description.is_empty() || !src.overrides(self.description_src) {
            return;
        }
        self.description = description.to_string();
        self.description_src = src;
    }

    /// Merge a capture time. The UTC instant is authoritative; the local
    /// stamp falls back to the UTC wall time when missing, so both are
    /// always set together.
    pub fn set_taken_at(
        &mut self,
        taken_at: Option<DateTime<Utc>>,
        taken_at_local: Option<NaiveDateTime>,
        time_zone: &str,
        src: Source,
    ) {
        let Some(taken_at) = taken_at else { return };
        if !src.overrides(self.taken_src) {
            return;
        }

        self.taken_at = Some(taken_at);
        self.taken_at_local = Some(taken_at_local.unwrap_or_else(|| taken_at.naive_utc()));
        if !time_zone.is_empty() {
            self.time_zone = time_zone.to_string();
        }
        self.taken_src = src;
    }

    pub fn set_coordinates(&mut self, lat: f64, lng: f64, altitude: i32, src: Source) {
        if lat == 0.0 && lng == 0.0 {
            return;
        }
        if !src.overrides(self.location_src) {
            return;
        }

        self.lat = lat;
        self.lng = lng;
        self.altitude = altitude;
        self.location_src = src;
    }

    /// Recompute the derived date columns from the capture time.
    pub fn update_date_fields(&mut self) {
        let local = self
            .taken_at_local
            .or_else(|| self.taken_at.map(|t| t.naive_utc()));

        match local {
            Some(d) => {
                self.year = d.year();
                self.month = d.month() as i32;
                self.day = d.day() as i32;
            }
            None => {
                self.year = 0;
                self.month = 0;
                self.day = 0;
            }
        }
    }

    pub fn has_title(&self) -> bool {
        !self.title.is_empty()
    }

    pub fn has_location(&self) -> bool {
        self.lat != 0.0 || self.lng != 0.0
    }

    pub fn unknown_place(&self) -> bool {
        self.place_id.is_empty()
    }

    pub fn no_camera_serial(&self) -> bool {
        self.camera_serial.is_empty()
    }

    pub fn is_purged(&self) -> bool {
        self.quality == QUALITY_PURGED
    }

    /// Raise the resolution to a rendition's megapixel count; renditions
    /// never lower it.
    pub fn update_resolution(&mut self, megapixels: i32) {
        if megapixels > self.resolution {
            self.resolution = megapixels;
        }
    }
}
