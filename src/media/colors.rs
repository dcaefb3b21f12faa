//! Color fingerprint for images.
//!
//! The fingerprint is computed on a 3x3 downsample: a palette of color
//! indexes, a luminance vector, the dominant color name, average chroma,
//! and a compact luminance diff used to compare renditions.

use anyhow::Result;
use image::DynamicImage;
use std::path::Path;

/// Named palette the fingerprint maps pixels onto. Index order is stable
/// since the palette digits are persisted.
const COLOR_NAMES: &[&str] = &[
    "black", "grey", "brown", "gold", "white", "purple", "blue", "cyan",
    "teal", "green", "lime", "yellow", "magenta", "orange", "red", "pink",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorProfile {
    /// Name of the dominant palette color.
    pub main_color: String,
    /// One hex digit per sample pixel, row major.
    pub colors: String,
    /// One hex luminance nibble per sample pixel.
    pub luminance: String,
    /// Average saturation, 0..100.
    pub chroma: i16,
    /// Compact luminance signature for rendition comparison.
    pub diff: u32,
}

fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if (max - min).abs() < f64::EPSILON {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if (max - r).abs() < f64::EPSILON {
        ((g - b) / d).rem_euclid(6.0)
    } else if (max - g).abs() < f64::EPSILON {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h * 60.0, s, l)
}

/// Map a pixel to a palette index.
fn palette_index(r: u8, g: u8, b: u8) -> usize {
    let (h, s, l) = rgb_to_hsl(r, g, b);

    if s < 0.12 {
        return if l < 0.18 {
            0 // black
        } else if l > 0.82 {
            4 // white
        } else {
            1 // grey
        };
    }

    match h {
        h if !(15.0..345.0).contains(&h) => 14, // red
        h if h < 45.0 => {
            if l < 0.4 {
                2 // brown
            } else {
                13 // orange
            }
        }
        h if h < 60.0 => 3,  // gold
        h if h < 75.0 => 11, // yellow
        h if h < 105.0 => 10, // lime
        h if h < 150.0 => 9, // green
        h if h < 180.0 => 8, // teal
        h if h < 210.0 => 7, // cyan
        h if h < 260.0 => 6, // blue
        h if h < 290.0 => 5, // purple
        h if h < 320.0 => 12, // magenta
        _ => 15,             // pink
    }
}

/// Fingerprint an already decoded image.
pub fn profile(img: &DynamicImage) -> ColorProfile {
    let sample = img.thumbnail_exact(3, 3).to_rgb8();

    let mut counts = [0usize; 16];
    let mut colors = String::with_capacity(9);
    let mut luminance = String::with_capacity(9);
    let mut nibbles = [0u8; 9];
    let mut chroma_sum = 0.0;

    for (i, pixel) in sample.pixels().enumerate() {
        let [r, g, b] = pixel.0;
        let idx = palette_index(r, g, b);
        counts[idx] += 1;
        colors.push(char::from_digit(idx as u32, 16).unwrap_or('0'));

        let (_, s, l) = rgb_to_hsl(r, g, b);
        let nibble = (l * 15.0).round() as u8;
        nibbles[i.min(8)] = nibble;
        luminance.push(char::from_digit(nibble as u32, 16).unwrap_or('0'));
        chroma_sum += s;
    }

    // Prefer a colorful main color; fall back to the most frequent
    // neutral when the image has no saturation at all.
    let colorful = counts
        .iter()
        .enumerate()
        .filter(|(i, _)| ![0, 1, 4].contains(i))
        .max_by_key(|(_, c)| **c)
        .filter(|(_, c)| **c > 0);
    let main = match colorful {
        Some((i, _)) => i,
        None => {
            counts
                .iter()
                .enumerate()
                .max_by_key(|(_, c)| **c)
                .map(|(i, _)| i)
                .unwrap_or(1)
        }
    };

    // Fold the luminance vector against the center sample.
    let center = nibbles[4];
    let mut diff: u32 = 1;
    for (i, n) in nibbles.iter().enumerate() {
        if i == 4 {
            continue;
        }
        diff = (diff << 1) | u32::from(*n > center);
    }
    diff = (diff << 4) | u32::from(center);

    ColorProfile {
        main_color: COLOR_NAMES[main].to_string(),
        colors,
        luminance,
        chroma: ((chroma_sum / 9.0) * 100.0).round() as i16,
        diff,
    }
}

/// Decode an image file and fingerprint it.
pub fn from_path(path: &Path) -> Result<ColorProfile> {
    let img = image::open(path)?;
    Ok(profile(&img))
}
