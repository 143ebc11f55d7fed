use serde::{Deserialize, Serialize};
use tungstenite::http::HeaderMap;

use crate::config::GeoSettings;

/// A `(latitude, longitude)` pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

impl Position {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    fn rounded(self, decimals: u32) -> Self {
        let factor = 10f64.powi(decimals.min(12) as i32);
        Self {
            lat: (self.lat * factor).round() / factor,
            lng: (self.lng * factor).round() / factor,
        }
    }
}

/// Raw location hints captured at connection time.
///
/// Values are kept as the strings received; parsing happens in
/// [`PositionResolver::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginMetadata {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

impl OriginMetadata {
    /// Reads the configured latitude/longitude headers. Headers that are
    /// absent or not valid UTF-8 are left as `None`.
    pub fn from_headers(headers: &HeaderMap, settings: &GeoSettings) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.trim().to_string())
        };

        Self {
            latitude: read(&settings.latitude_header),
            longitude: read(&settings.longitude_header),
        }
    }
}

/// Turns [`OriginMetadata`] into a [`Position`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionResolver {
    fallback: Position,
    precision: u32,
}

impl PositionResolver {
    pub fn new(fallback: Position, precision: u32) -> Self {
        Self {
            fallback,
            precision,
        }
    }

    pub fn from_settings(settings: &GeoSettings) -> Self {
        Self::new(
            Position::new(settings.fallback_lat, settings.fallback_lng),
            settings.precision,
        )
    }

    pub fn fallback(&self) -> Position {
        self.fallback
    }

    /// Resolves the metadata to a coarse position.
    ///
    /// Both coordinates must parse and lie within range, otherwise the
    /// fallback is returned as a whole.
    pub fn resolve(&self, origin: &OriginMetadata) -> Position {
        let parse = |raw: &Option<String>| raw.as_deref().and_then(|v| v.parse::<f64>().ok());

        match (parse(&origin.latitude), parse(&origin.longitude)) {
            (Some(lat), Some(lng)) => {
                let position = Position::new(lat, lng);
                if position.is_valid() {
                    position.rounded(self.precision)
                } else {
                    self.fallback
                }
            }
            _ => self.fallback,
        }
    }
}

impl Default for PositionResolver {
    /// Falls back to `0,0` and keeps two decimal places.
    fn default() -> Self {
        Self::new(Position::new(0.0, 0.0), 2)
    }
}
