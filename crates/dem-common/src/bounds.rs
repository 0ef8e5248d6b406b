//! Geographic bounding box type and operations.

use serde::{Deserialize, Serialize};

use crate::error::{GeoError, GeoResult};

/// A geographic bounding box in WGS84 degrees.
///
/// All bounds in this workspace use this coordinate reference. Invariants:
/// `west < east` and `south < north`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    /// Create a bounding box, rejecting degenerate or inverted extents.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> GeoResult<Self> {
        let bounds = Self {
            west,
            south,
            east,
            north,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Check the ordering invariants and coordinate range.
    pub fn validate(&self) -> GeoResult<()> {
        if !self.west.is_finite()
            || !self.south.is_finite()
            || !self.east.is_finite()
            || !self.north.is_finite()
        {
            return Err(GeoError::InvalidBounds(format!(
                "non-finite coordinate in {:?}",
                self
            )));
        }
        if self.west >= self.east {
            return Err(GeoError::InvalidBounds(format!(
                "west {} must be < east {}",
                self.west, self.east
            )));
        }
        if self.south >= self.north {
            return Err(GeoError::InvalidBounds(format!(
                "south {} must be < north {}",
                self.south, self.north
            )));
        }
        if self.west < -180.0 || self.east > 180.0 || self.south < -90.0 || self.north > 90.0 {
            return Err(GeoError::InvalidBounds(format!(
                "coordinates out of WGS84 range in {:?}",
                self
            )));
        }
        Ok(())
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Center point as `(lon, lat)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.west + self.east) / 2.0,
            (self.south + self.north) / 2.0,
        )
    }

    /// Center latitude in degrees.
    pub fn center_lat(&self) -> f64 {
        (self.south + self.north) / 2.0
    }

    /// Check if this box intersects another (shared edges do not count).
    pub fn intersects(&self, other: &GeoBounds) -> bool {
        self.west < other.east
            && self.east > other.west
            && self.south < other.north
            && self.north > other.south
    }

    /// Compute the intersection of two boxes, if any.
    pub fn intersection(&self, other: &GeoBounds) -> Option<GeoBounds> {
        if !self.intersects(other) {
            return None;
        }

        Some(GeoBounds {
            west: self.west.max(other.west),
            south: self.south.max(other.south),
            east: self.east.min(other.east),
            north: self.north.min(other.north),
        })
    }

    /// Check if a point is contained within this box (edges inclusive).
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lon >= self.west && lon <= self.east && lat >= self.south && lat <= self.north
    }

    /// Check if another box lies entirely within this one.
    pub fn contains(&self, other: &GeoBounds) -> bool {
        other.west >= self.west
            && other.east <= self.east
            && other.south >= self.south
            && other.north <= self.north
    }
}

impl std::fmt::Display for GeoBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.west, self.south, self.east, self.north
        )
    }
}
