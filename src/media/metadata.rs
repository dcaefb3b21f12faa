//! Normalized metadata extracted from media files and sidecars.
//!
//! EXIF is read directly from the file; JSON sidecars (as exported by the
//! big photo services) fill fields EXIF does not carry. XMP sidecars get a
//! minimal text extraction covering the descriptive fields.

use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// Merged metadata for one media file. Zero values mean "not present":
/// empty strings, `None` timestamps and 0.0 coordinates are all unset.
#[derive(Debug, Clone, Default)]
pub struct MetaData {
    pub title: String,
    pub description: String,
    pub comment: String,
    pub subject: String,
    pub keywords: String,
    pub artist: String,
    pub copyright: String,

    pub camera_make: String,
    pub camera_model: String,
    pub camera_owner: String,
    pub camera_serial: String,
    pub lens_make: String,
    pub lens_model: String,

    pub focal_length: f32,
    pub f_number: f32,
    pub iso: i32,
    pub exposure: String,

    pub taken_at: Option<DateTime<Utc>>,
    pub taken_at_local: Option<NaiveDateTime>,
    pub time_zone: String,

    pub lat: f64,
    pub lng: f64,
    pub altitude: i32,

    pub orientation: i32,
    pub width: u32,
    pub height: u32,
    pub duration: Duration,
    pub codec: String,

    /// Global capture identifier recorded by the camera or an editor.
    pub document_id: String,
    /// Identifier of this particular rendition.
    pub instance_id: String,
}

impl MetaData {
    pub fn has_time_and_place(&self) -> bool {
        self.taken_at.is_some() && (self.lat != 0.0 || self.lng != 0.0)
    }

    pub fn has_document_id(&self) -> bool {
        !self.document_id.is_empty()
    }

    pub fn has_instance_id(&self) -> bool {
        !self.instance_id.is_empty()
    }

    /// Width after applying the EXIF orientation.
    pub fn actual_width(&self) -> u32 {
        if self.orientation_swaps_sides() {
            self.height
        } else {
            self.width
        }
    }

    /// Height after applying the EXIF orientation.
    pub fn actual_height(&self) -> u32 {
        if self.orientation_swaps_sides() {
            self.width
        } else {
            self.height
        }
    }

    fn orientation_swaps_sides(&self) -> bool {
        matches!(self.orientation, 5..=8)
    }

    pub fn aspect_ratio(&self) -> f32 {
        let (w, h) = (self.actual_width(), self.actual_height());
        if w == 0 || h == 0 {
            return 0.0;
        }
        let ratio = w as f64 / h as f64;
        (ratio * 100.0).round() as f32 / 100.0
    }

    pub fn portrait(&self) -> bool {
        let (w, h) = (self.actual_width(), self.actual_height());
        w > 0 && w < h
    }

    pub fn megapixels(&self) -> i32 {
        ((self.width as f64 * self.height as f64) / 1_000_000.0).round() as i32
    }

    /// Fill empty fields from another extraction. Values already present
    /// are kept, so callers layer sources from most to least trusted.
    pub fn absorb(&mut self, other: MetaData) {
        fn fill(dst: &mut String, src: String) {
            if dst.is_empty() && !src.is_empty() {
                *dst = src;
            }
        }

        fill(&mut self.title, other.title);
        fill(&mut self.description, other.description);
        fill(&mut self.comment, other.comment);
        fill(&mut self.subject, other.subject);
        fill(&mut self.keywords, other.keywords);
        fill(&mut self.artist, other.artist);
        fill(&mut self.copyright, other.copyright);
        fill(&mut self.camera_make, other.camera_make);
        fill(&mut self.camera_model, other.camera_model);
        fill(&mut self.camera_owner, other.camera_owner);
        fill(&mut self.camera_serial, other.camera_serial);
        fill(&mut self.lens_make, other.lens_make);
        fill(&mut self.lens_model, other.lens_model);
        fill(&mut self.exposure, other.exposure);
        fill(&mut self.time_zone, other.time_zone);
        fill(&mut self.codec, other.codec);
        fill(&mut self.document_id, other.document_id);
        fill(&mut self.instance_id, other.instance_id);

        if self.focal_length == 0.0 {
            self.focal_length = other.focal_length;
        }
        if self.f_number == 0.0 {
            self.f_number = other.f_number;
        }
        if self.iso == 0 {
            self.iso = other.iso;
        }
        if self.taken_at.is_none() {
            self.taken_at = other.taken_at;
        }
        if self.taken_at_local.is_none() {
            self.taken_at_local = other.taken_at_local;
        }
        if self.lat == 0.0 && self.lng == 0.0 && (other.lat != 0.0 || other.lng != 0.0) {
            self.lat = other.lat;
            self.lng = other.lng;
        }
        if self.altitude == 0 {
            self.altitude = other.altitude;
        }
        if self.orientation == 0 {
            self.orientation = other.orientation;
        }
        if self.width == 0 {
            self.width = other.width;
            self.height = other.height;
        }
        if self.duration.is_zero() {
            self.duration = other.duration;
        }
    }
}

fn exif_text(exif: &exif::Exif, tag: exif::Tag) -> String {
    exif.get_field(tag, exif::In::PRIMARY)
        .map(|f| {
            f.display_value()
                .to_string()
                .trim_matches('"')
                .trim()
                .to_string()
        })
        .unwrap_or_default()
}

fn exif_rational(exif: &exif::Exif, tag: exif::Tag) -> f64 {
    if let Some(field) = exif.get_field(tag, exif::In::PRIMARY) {
        if let exif::Value::Rational(ref v) = field.value {
            if let Some(r) = v.first() {
                if r.denom != 0 {
                    return r.num as f64 / r.denom as f64;
                }
            }
        }
    }
    0.0
}

fn exif_uint(exif: &exif::Exif, tag: exif::Tag) -> u32 {
    exif.get_field(tag, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(0)
}

fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

fn exif_coordinate(exif: &exif::Exif, value_tag: exif::Tag, ref_tag: exif::Tag) -> f64 {
    let field = match exif.get_field(value_tag, exif::In::PRIMARY) {
        Some(f) => f,
        None => return 0.0,
    };

    let decimal = match field.value {
        exif::Value::Rational(ref v) if v.len() >= 3 => dms_to_decimal(
            v[0].to_f64(),
            v[1].to_f64(),
            v[2].to_f64(),
        ),
        _ => return 0.0,
    };

    let reference = exif_text(exif, ref_tag);
    if reference.contains('S') || reference.contains('W') {
        -decimal
    } else {
        decimal
    }
}

/// Parse an EXIF datetime like `2021:06:01 10:00:00`, with the optional
/// offset tag (`+02:00`) turning it into an absolute instant.
fn parse_taken_at(datetime: &str, offset: &str) -> (Option<DateTime<Utc>>, Option<NaiveDateTime>, String) {
    let local = match NaiveDateTime::parse_from_str(datetime.trim(), "%Y:%m:%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(datetime.trim(), "%Y-%m-%dT%H:%M:%S"))
    {
        Ok(dt) => dt,
        Err(_) => return (None, None, String::new()),
    };

    if let Ok(zone) = offset.trim().parse::<FixedOffset>() {
        if let Some(instant) = local.and_local_timezone(zone).single() {
            return (
                Some(instant.with_timezone(&Utc)),
                Some(local),
                offset.trim().to_string(),
            );
        }
    }

    // No usable zone: treat the local stamp as UTC.
    (Some(local.and_utc()), Some(local), String::new())
}

/// Read EXIF metadata from an image file.
pub fn from_exif(path: &Path) -> Result<MetaData> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader)?;

    let mut data = MetaData {
        title: exif_text(&exif, exif::Tag::ImageDescription),
        artist: exif_text(&exif, exif::Tag::Artist),
        copyright: exif_text(&exif, exif::Tag::Copyright),
        camera_make: exif_text(&exif, exif::Tag::Make),
        camera_model: exif_text(&exif, exif::Tag::Model),
        camera_owner: exif_text(&exif, exif::Tag::CameraOwnerName),
        camera_serial: exif_text(&exif, exif::Tag::BodySerialNumber),
        lens_make: exif_text(&exif, exif::Tag::LensMake),
        lens_model: exif_text(&exif, exif::Tag::LensModel),
        focal_length: exif_rational(&exif, exif::Tag::FocalLength) as f32,
        f_number: exif_rational(&exif, exif::Tag::FNumber) as f32,
        iso: exif_uint(&exif, exif::Tag::PhotographicSensitivity) as i32,
        exposure: exif_text(&exif, exif::Tag::ExposureTime),
        orientation: exif_uint(&exif, exif::Tag::Orientation) as i32,
        width: exif_uint(&exif, exif::Tag::PixelXDimension),
        height: exif_uint(&exif, exif::Tag::PixelYDimension),
        document_id: exif_text(&exif, exif::Tag::ImageUniqueID),
        lat: exif_coordinate(&exif, exif::Tag::GPSLatitude, exif::Tag::GPSLatitudeRef),
        lng: exif_coordinate(&exif, exif::Tag::GPSLongitude, exif::Tag::GPSLongitudeRef),
        altitude: exif_rational(&exif, exif::Tag::GPSAltitude).round() as i32,
        ..MetaData::default()
    };

    let datetime = exif_text(&exif, exif::Tag::DateTimeOriginal);
    let offset = exif_text(&exif, exif::Tag::OffsetTimeOriginal);
    let (taken_at, taken_at_local, zone) = parse_taken_at(&datetime, &offset);
    data.taken_at = taken_at;
    data.taken_at_local = taken_at_local;
    data.time_zone = zone;

    Ok(data)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonSidecar {
    title: String,
    description: String,
    #[serde(rename = "photoTakenTime")]
    photo_taken_time: JsonTimestamp,
    #[serde(rename = "geoData")]
    geo_data: JsonGeo,
    #[serde(rename = "cameraMake")]
    camera_make: String,
    #[serde(rename = "cameraModel")]
    camera_model: String,
    duration: f64,
    codec: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonTimestamp {
    timestamp: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonGeo {
    latitude: f64,
    longitude: f64,
    altitude: f64,
}

/// Read a JSON sidecar as exported by photo services.
pub fn from_json(path: &Path) -> Result<MetaData> {
    let content = std::fs::read_to_string(path)?;
    let sidecar: JsonSidecar = serde_json::from_str(&content)?;

    let mut data = MetaData {
        title: sidecar.title,
        description: sidecar.description,
        camera_make: sidecar.camera_make,
        camera_model: sidecar.camera_model,
        lat: sidecar.geo_data.latitude,
        lng: sidecar.geo_data.longitude,
        altitude: sidecar.geo_data.altitude.round() as i32,
        codec: sidecar.codec,
        ..MetaData::default()
    };

    if sidecar.duration > 0.0 {
        data.duration = Duration::from_secs_f64(sidecar.duration);
    }

    if let Ok(epoch) = sidecar.photo_taken_time.timestamp.parse::<i64>() {
        if let Some(taken) = DateTime::<Utc>::from_timestamp(epoch, 0) {
            data.taken_at = Some(taken);
            data.taken_at_local = Some(taken.naive_utc());
        }
    }

    Ok(data)
}

/// Extract the text content of an XML element, skipping nested markup.
fn xmp_tag(content: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let Some(start) = content.find(&open) else {
        return String::new();
    };
    let rest = &content[start..];
    let Some(gt) = rest.find('>') else {
        return String::new();
    };
    let Some(end) = rest.find(&close) else {
        return String::new();
    };
    if end <= gt {
        return String::new();
    }

    let mut text = String::new();
    let mut in_tag = false;
    for c in rest[gt + 1..end].chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.trim().to_string()
}

/// Read descriptive fields from an XMP sidecar. Only the fields the
/// indexer merges are extracted; a full RDF parse is not attempted.
pub fn from_xmp(path: &Path) -> Result<MetaData> {
    let content = std::fs::read_to_string(path)?;

    Ok(MetaData {
        title: xmp_tag(&content, "dc:title"),
        description: xmp_tag(&content, "dc:description"),
        comment: xmp_tag(&content, "exif:UserComment"),
        artist: xmp_tag(&content, "dc:creator"),
        copyright: xmp_tag(&content, "dc:rights"),
        instance_id: xmp_tag(&content, "xmpMM:InstanceID"),
        document_id: xmp_tag(&content, "xmpMM:DocumentID"),
        ..MetaData::default()
    })
}
