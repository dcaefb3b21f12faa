//! Place reference entity keyed by a quantized location cell token.

/// Token of the unknown-place sentinel seeded by the schema.
pub const UNKNOWN_PLACE_ID: &str = "zz";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Place {
    /// Cell token derived from the coordinates.
    pub id: String,
    /// Human-readable label, e.g. "Berlin, Germany".
    pub label: String,
    pub city: String,
    pub state: String,
    pub country: String,
    /// Comma-separated location keywords supplied by the geocoder.
    pub keywords: String,
    pub favorite: bool,
}

impl Place {
    pub fn keyword_list(&self) -> Vec<String> {
        crate::txt::split_keywords(&self.keywords)
    }
}

/// Quantize coordinates to a stable cell token. Neighboring captures
/// within roughly ten meters share a cell and therefore a place row.
pub fn cell_token(lat: f64, lng: f64) -> String {
    if lat == 0.0 && lng == 0.0 {
        return UNKNOWN_PLACE_ID.to_string();
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return UNKNOWN_PLACE_ID.to_string();
    }

    let lat_q = ((lat + 90.0) * 10_000.0).round() as u64;
    let lng_q = ((lng + 180.0) * 10_000.0).round() as u64;
    format!("s{lat_q:06x}{lng_q:06x}")
}
