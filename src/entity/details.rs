//! Free-text extension of the photo record.

/// One-to-one companion of [`super::Photo`] carrying the longer text
/// fields. The emptiness predicates drive fill-only merging: sidecar and
/// embedded metadata never overwrite text a user or an earlier source
/// already provided.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Details {
    pub photo_id: i64,
    pub keywords: String,
    pub notes: String,
    pub subject: String,
    pub artist: String,
    pub copyright: String,
}

impl Details {
    pub fn new(photo_id: i64) -> Details {
        Details {
            photo_id,
            ..Details::default()
        }
    }

    pub fn no_keywords(&self) -> bool {
        self.keywords.trim().is_empty()
    }

    pub fn no_notes(&self) -> bool {
        self.notes.trim().is_empty()
    }

    pub fn no_subject(&self) -> bool {
        self.subject.trim().is_empty()
    }

    pub fn no_artist(&self) -> bool {
        self.artist.trim().is_empty()
    }

    pub fn no_copyright(&self) -> bool {
        self.copyright.trim().is_empty()
    }
}
