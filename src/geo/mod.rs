//! Reverse geocoding seam.
//!
//! The indexer asks a [`Geocoder`] to turn coordinates into a place
//! record plus keyword and label enrichment. Network clients implement
//! the trait; failures degrade to a missing location.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::classify::Labels;
use crate::entity::Place;

/// Which geocoding backend to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApiKind {
    /// No reverse geocoding.
    #[default]
    None,
    /// The bundled places service.
    Places,
    /// OpenStreetMap Nominatim.
    Osm,
}

/// A resolved location for a coordinate pair.
#[derive(Debug, Clone, Default)]
pub struct Location {
    pub place: Place,
    /// Keyword candidates (city, state, country, landmarks).
    pub keywords: Vec<String>,
    /// Labels to attach to the photo, tagged with the location source.
    pub labels: Labels,
}

pub trait Geocoder: Send + Sync {
    /// Resolve coordinates to a location; `None` when the backend has
    /// no answer for the cell.
    fn lookup(&self, lat: f64, lng: f64) -> Result<Option<Location>>;
}

/// Geocoder used when the API kind is `None`.
pub struct NopGeocoder;

impl Geocoder for NopGeocoder {
    fn lookup(&self, _lat: f64, _lng: f64) -> Result<Option<Location>> {
        Ok(None)
    }
}
