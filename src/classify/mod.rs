//! Image classification and NSFW detection seams.
//!
//! The indexer only depends on the traits here; the actual models run
//! behind them and may live in another process entirely.

use anyhow::Result;
use std::path::Path;

/// A classification result for one image crop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    /// Lower sorts first; negative priorities are background categories.
    pub priority: i32,
    /// 0..100, lower is more certain.
    pub uncertainty: i32,
    /// What produced the label: "image" for the classifier, "location"
    /// for geocoded places.
    pub source: String,
}

impl Label {
    pub fn new(name: &str, priority: i32, uncertainty: i32) -> Label {
        Label {
            name: name.trim().to_lowercase(),
            priority,
            uncertainty: uncertainty.clamp(0, 100),
            source: "image".to_string(),
        }
    }

    pub fn with_source(mut self, source: &str) -> Label {
        self.source = source.to_string();
        self
    }

    pub fn confidence(&self) -> i32 {
        100 - self.uncertainty
    }
}

/// An accumulated label list, ordered for selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels(Vec<Label>);

impl Labels {
    pub fn push(&mut self, label: Label) {
        self.0.push(label);
    }

    pub fn append(&mut self, other: Labels) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.0.iter()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sort by (priority, uncertainty) so the most useful labels lead.
    pub fn sort(&mut self) {
        self.0.sort_by(|a, b| {
            (a.priority, a.uncertainty, &a.name).cmp(&(b.priority, b.uncertainty, &b.name))
        });
    }

    /// Keep labels whose confidence exceeds a third of the best observed
    /// confidence. Must be called on a sorted list; the first label
    /// anchors the threshold.
    pub fn select_confident(self) -> Labels {
        let mut anchor = 0;
        let mut selected = Vec::new();

        for label in self.0 {
            if anchor == 0 {
                anchor = label.confidence();
            }
            if label.confidence() > anchor / 3 {
                selected.push(label);
            }
        }

        Labels(selected)
    }

    /// Keyword candidates from the label names.
    pub fn keywords(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|l| crate::txt::keywords(&l.name))
            .collect()
    }
}

impl IntoIterator for Labels {
    type Item = Label;
    type IntoIter = std::vec::IntoIter<Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Label> for Labels {
    fn from_iter<T: IntoIterator<Item = Label>>(iter: T) -> Labels {
        Labels(iter.into_iter().collect())
    }
}

/// Classifies a thumbnail into labels.
pub trait Classifier: Send + Sync {
    fn classify(&self, thumbnail: &Path) -> Result<Labels>;
}

/// NSFW likelihood above which a photo is flagged private.
pub const NSFW_THRESHOLD_HIGH: f32 = 0.85;

/// Per-category output of the NSFW detector.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NsfwScores {
    pub drawing: f32,
    pub hentai: f32,
    pub neutral: f32,
    pub porn: f32,
    pub sexy: f32,
}

impl NsfwScores {
    /// True when any offensive category crosses the high threshold.
    pub fn exceeds_high(&self) -> bool {
        self.hentai > NSFW_THRESHOLD_HIGH
            || self.porn > NSFW_THRESHOLD_HIGH
            || self.sexy > NSFW_THRESHOLD_HIGH
    }
}

/// Inspects a thumbnail for content that should be marked private.
pub trait NsfwDetector: Send + Sync {
    fn inspect(&self, thumbnail: &Path) -> Result<NsfwScores>;
}
