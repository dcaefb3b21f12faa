//! Persistent record types for the photo library.
//!
//! Records reference each other by identifier only; relations are
//! followed through lookups in the store, never through pointers.

pub mod camera;
pub mod details;
pub mod file;
pub mod label;
pub mod photo;
pub mod place;
pub mod quality;
pub mod source;

pub use camera::{Camera, Lens};
pub use details::Details;
pub use file::File;
pub use label::slugify;
pub use photo::{Photo, PhotoKind};
pub use place::Place;
pub use source::Source;

use uuid::Uuid;

/// Generate an opaque entity token with a type prefix, e.g. `p3f9c...`
/// for photos and `f41d2...` for files.
pub fn new_uid(prefix: char) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}{}", &id[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uid_shape() {
        let uid = new_uid('p');
        assert_eq!(uid.len(), 17);
        assert!(uid.starts_with('p'));
        assert_ne!(new_uid('p'), new_uid('p'));
    }
}
