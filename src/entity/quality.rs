//! Quality scoring for merged photo records.

use crate::classify::Labels;

use super::details::Details;
use super::photo::Photo;
use super::source::Source;

/// Confidence a classifier label needs for the quality bonus.
const CONFIDENT_LABEL: i32 = 85;

/// Score a merged photo. Combines resolution, metadata completeness and
/// classifier confidence into a small non-negative integer; the purge
/// sentinel (-1) is never produced here.
pub fn score(photo: &Photo, details: &Details, labels: &Labels) -> i32 {
    let mut score = 0;

    if photo.resolution >= 2 {
        score += 1;
    }

    // A capture time read from metadata beats an mtime guess.
    if photo.taken_at.is_some() && photo.taken_src > Source::Auto {
        score += 1;
    }

    if photo.has_location() {
        score += 1;
    }

    if photo.has_title() || !details.no_keywords() {
        score += 1;
    }

    if labels.iter().any(|l| 100 - l.uncertainty >= CONFIDENT_LABEL) {
        score += 1;
    }

    score
}
