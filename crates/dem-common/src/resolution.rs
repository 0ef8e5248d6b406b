//! The closed set of supported elevation resolutions.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{GeoError, GeoResult};

/// Ground meters spanned by one degree of latitude (and by one degree of
/// longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Ground meters spanned by one degree of longitude at the given latitude.
///
/// The source grid is equirectangular, so east-west ground distance shrinks
/// with cos(latitude) while the angular step stays fixed.
pub fn meters_per_degree_lon(lat_deg: f64) -> f64 {
    METERS_PER_DEGREE * lat_deg.to_radians().cos()
}

/// Supported dataset resolutions.
///
/// The set is closed: 10/30/90 m plus coarser overview resolutions. Each
/// maps to a fixed angular pixel size so tile grids stay integer-aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// ~10 m (1/3 arc-second).
    M10,
    /// ~30 m (1 arc-second).
    M30,
    /// ~90 m (3 arc-second).
    M90,
    /// ~250 m (7.5 arc-second).
    M250,
    /// ~500 m (15 arc-second).
    M500,
    /// ~1 km (30 arc-second).
    M1000,
}

impl Resolution {
    /// All supported resolutions, finest first.
    pub const ALL: [Resolution; 6] = [
        Resolution::M10,
        Resolution::M30,
        Resolution::M90,
        Resolution::M250,
        Resolution::M500,
        Resolution::M1000,
    ];

    /// Stable tag used in filenames, cache subtrees, and provenance.
    pub fn tag(&self) -> &'static str {
        match self {
            Resolution::M10 => "10m",
            Resolution::M30 => "30m",
            Resolution::M90 => "90m",
            Resolution::M250 => "250m",
            Resolution::M500 => "500m",
            Resolution::M1000 => "1km",
        }
    }

    /// Parse a resolution tag (case-insensitive).
    pub fn from_tag(s: &str) -> GeoResult<Self> {
        match s.to_lowercase().as_str() {
            "10m" => Ok(Resolution::M10),
            "30m" => Ok(Resolution::M30),
            "90m" => Ok(Resolution::M90),
            "250m" => Ok(Resolution::M250),
            "500m" => Ok(Resolution::M500),
            "1km" => Ok(Resolution::M1000),
            other => Err(GeoError::UnknownResolution(other.to_string())),
        }
    }

    /// Pixels per degree along each axis.
    pub fn pixels_per_degree(&self) -> u32 {
        match self {
            Resolution::M10 => 10_800,
            Resolution::M30 => 3_600,
            Resolution::M90 => 1_200,
            Resolution::M250 => 480,
            Resolution::M500 => 240,
            Resolution::M1000 => 120,
        }
    }

    /// Angular pixel size in degrees.
    pub fn degrees_per_pixel(&self) -> f64 {
        1.0 / self.pixels_per_degree() as f64
    }

    /// Nominal ground resolution in meters (at the equator).
    pub fn nominal_meters(&self) -> f64 {
        self.degrees_per_pixel() * METERS_PER_DEGREE
    }

    /// Accepted ground-resolution band in meters for cache validation.
    ///
    /// The band spans 0.5x to 5/3x of nominal, so the 30 m tag accepts
    /// roughly 15-50 m per pixel. The low end covers east-west pixel sizes
    /// up to 60 degrees of latitude, the high end catches tiles stored at
    /// the wrong resolution.
    pub fn ground_resolution_band(&self) -> (f64, f64) {
        let nominal = self.nominal_meters();
        (nominal * 0.5, nominal * 5.0 / 3.0)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl Serialize for Resolution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for Resolution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Resolution::from_tag(&tag).map_err(D::Error::custom)
    }
}
