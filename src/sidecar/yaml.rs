//! YAML sidecar files for disaster recovery.
//!
//! The sidecar carries the user-visible state of a photo so a wiped
//! store can be rebuilt from the file tree alone. Serialization is
//! deterministic and round-trip stable; database ids and timing fields
//! are deliberately left out.

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::entity::{Details, Photo, PhotoKind, Source};

use super::HIDDEN_DIR;

fn is_false(b: &bool) -> bool {
    !b
}

fn is_zero_f64(v: &f64) -> bool {
    *v == 0.0
}

fn is_zero_i32(v: &i32) -> bool {
    *v == 0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoYaml {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(rename = "type")]
    pub kind: PhotoKind,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    pub title_src: Source,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub description_src: Source,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_at_local: Option<NaiveDateTime>,
    pub taken_src: Source,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub time_zone: String,

    #[serde(skip_serializing_if = "is_zero_f64")]
    pub lat: f64,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub lng: f64,
    #[serde(skip_serializing_if = "is_zero_i32")]
    pub altitude: i32,
    pub location_src: Source,

    #[serde(skip_serializing_if = "is_false")]
    pub private: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub document_id: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub keywords: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subject: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub artist: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub copyright: String,
}

impl PhotoYaml {
    pub fn from_photo(photo: &Photo, details: &Details) -> PhotoYaml {
        PhotoYaml {
            uid: photo.uid.clone(),
            kind: photo.kind,
            title: photo.title.clone(),
            title_src: photo.title_src,
            description: photo.description.clone(),
            description_src: photo.description_src,
            taken_at: photo.taken_at,
            taken_at_local: photo.taken_at_local,
            taken_src: photo.taken_src,
            time_zone: photo.time_zone.clone(),
            lat: photo.lat,
            lng: photo.lng,
            altitude: photo.altitude,
            location_src: photo.location_src,
            private: photo.private,
            document_id: photo.document_id.clone(),
            keywords: details.keywords.clone(),
            notes: details.notes.clone(),
            subject: details.subject.clone(),
            artist: details.artist.clone(),
            copyright: details.copyright.clone(),
        }
    }

    /// Hydrate a photo and its details from the sidecar state.
    pub fn apply(&self, photo: &mut Photo, details: &mut Details) {
        if !self.uid.is_empty() {
            photo.uid = self.uid.clone();
        }
        photo.kind = self.kind;
        photo.title = self.title.clone();
        photo.title_src = self.title_src;
        photo.description = self.description.clone();
        photo.description_src = self.description_src;
        photo.taken_at = self.taken_at;
        photo.taken_at_local = self.taken_at_local;
        photo.taken_src = self.taken_src;
        photo.time_zone = self.time_zone.clone();
        photo.lat = self.lat;
        photo.lng = self.lng;
        photo.altitude = self.altitude;
        photo.location_src = self.location_src;
        photo.private = self.private;
        photo.document_id = self.document_id.clone();

        details.keywords = self.keywords.clone();
        details.notes = self.notes.clone();
        details.subject = self.subject.clone();
        details.artist = self.artist.clone();
        details.copyright = self.copyright.clone();
    }
}

/// Write the sidecar next to where `yaml_file_name` points, creating
/// parent directories as needed.
pub fn save(photo: &Photo, details: &Details, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let state = PhotoYaml::from_photo(photo, details);
    let content = serde_yaml::to_string(&state)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load(path: &Path) -> Result<PhotoYaml> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Where a photo's sidecar lives: mirrored under the sidecar root when
/// one is configured, adjacent to the originals otherwise.
pub fn yaml_file_name(
    photo_path: &str,
    photo_name: &str,
    originals: &Path,
    sidecar_root: Option<&Path>,
) -> PathBuf {
    let base = sidecar_root.unwrap_or(originals);
    base.join(photo_path).join(format!("{photo_name}.yml"))
}

/// Search for an existing sidecar for any of the stem candidates, in
/// lookup priority order: the sidecar root mirror, the hidden directory
/// next to the original, then adjacent to it.
pub fn find_sidecar(
    originals: &Path,
    sidecar_root: Option<&Path>,
    rel_dir: &str,
    stems: &[String],
) -> Option<PathBuf> {
    let local = originals.join(rel_dir);

    let mut dirs = Vec::new();
    if let Some(root) = sidecar_root {
        dirs.push(root.join(rel_dir));
    }
    dirs.push(local.join(HIDDEN_DIR));
    dirs.push(local);

    for dir in &dirs {
        for stem in stems {
            for ext in ["yml", "yaml"] {
                let candidate = dir.join(format!("{stem}.{ext}"));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
    }

    None
}
