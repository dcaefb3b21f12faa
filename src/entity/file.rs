//! The file record: one physical rendition of a photo.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default)]
pub struct File {
    pub id: i64,
    pub uid: String,
    pub photo_id: i64,
    pub photo_uid: String,

    /// Library root the file lives under.
    pub root: String,
    /// Path within the root, including the file name.
    pub name: String,
    /// Name the file was ingested under, if different.
    pub original_name: String,

    pub hash: String,
    pub size: i64,
    pub modified: Option<DateTime<Utc>>,

    pub file_type: String,
    pub mime: String,
    pub codec: String,
    pub orientation: i32,

    pub width: i32,
    pub height: i32,
    pub aspect_ratio: f32,
    pub portrait: bool,
    pub duration_ms: i64,

    pub main_color: String,
    pub colors: String,
    pub luminance: String,
    pub chroma: i16,
    pub diff: i64,

    /// The rendition used for thumbnails and classification.
    pub primary: bool,
    pub sidecar: bool,
    pub video: bool,
    pub missing: bool,
    pub error: String,

    /// Rendition identifier embedded in the file metadata.
    pub instance_id: String,

    pub deleted_at: Option<DateTime<Utc>>,

    /// Pipeline timing in milliseconds, recorded on create/update.
    pub created_in_ms: i64,
    pub updated_in_ms: i64,
}

impl File {
    pub fn new_uid() -> String {
        super::new_uid('f')
    }

    /// True when the on-disk state differs from this record. The hash is
    /// only compared when the caller already computed one.
    pub fn changed(&self, size: i64, modified: DateTime<Utc>, hash: &str) -> bool {
        if self.size != size {
            return true;
        }

        // Second precision; filesystems round differently.
        if let Some(prev) = self.modified {
            if (prev.timestamp() - modified.timestamp()).abs() > 1 {
                return true;
            }
        } else {
            return true;
        }

        !hash.is_empty() && self.hash != hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> File {
        File {
            size: 1000,
            modified: Some(Utc.with_ymd_and_hms(2021, 6, 1, 10, 0, 0).unwrap()),
            hash: "abc".to_string(),
            ..File::default()
        }
    }

    #[test]
    fn test_changed_by_size() {
        let f = record();
        assert!(f.changed(999, f.modified.unwrap(), ""));
        assert!(!f.changed(1000, f.modified.unwrap(), ""));
    }

    #[test]
    fn test_changed_by_mtime_with_tolerance() {
        let f = record();
        let close = Utc.with_ymd_and_hms(2021, 6, 1, 10, 0, 1).unwrap();
        let far = Utc.with_ymd_and_hms(2021, 6, 1, 10, 5, 0).unwrap();
        assert!(!f.changed(1000, close, ""));
        assert!(f.changed(1000, far, ""));
    }

    #[test]
    fn test_changed_by_hash() {
        let f = record();
        assert!(f.changed(1000, f.modified.unwrap(), "def"));
        assert!(!f.changed(1000, f.modified.unwrap(), "abc"));
    }
}
