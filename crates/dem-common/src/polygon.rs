//! Boundary polygons for region clipping.

use serde::{Deserialize, Serialize};

use crate::bounds::GeoBounds;
use crate::error::{GeoError, GeoResult};

/// A polygon in geographic coordinates, given as one or more rings of
/// `(lon, lat)` vertices. The first ring is the exterior; additional rings
/// are holes. Containment uses even-odd ray casting, so ring winding does
/// not matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    rings: Vec<Vec<(f64, f64)>>,
}

impl Polygon {
    /// Create a polygon from rings; each ring needs at least three
    /// vertices.
    pub fn new(rings: Vec<Vec<(f64, f64)>>) -> GeoResult<Self> {
        if rings.is_empty() {
            return Err(GeoError::InvalidPolygon("no rings".to_string()));
        }
        for (i, ring) in rings.iter().enumerate() {
            if ring.len() < 3 {
                return Err(GeoError::InvalidPolygon(format!(
                    "ring {} has {} vertices, need at least 3",
                    i,
                    ring.len()
                )));
            }
        }
        Ok(Self { rings })
    }

    /// A rectangular polygon matching the given bounds.
    pub fn rectangle(bounds: &GeoBounds) -> Self {
        Self {
            rings: vec![vec![
                (bounds.west, bounds.south),
                (bounds.east, bounds.south),
                (bounds.east, bounds.north),
                (bounds.west, bounds.north),
            ]],
        }
    }

    /// The rings of this polygon.
    pub fn rings(&self) -> &[Vec<(f64, f64)>] {
        &self.rings
    }

    /// Even-odd point-in-polygon test over all rings.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let mut inside = false;
        for ring in &self.rings {
            let n = ring.len();
            let mut j = n - 1;
            for i in 0..n {
                let (xi, yi) = ring[i];
                let (xj, yj) = ring[j];
                if ((yi > lat) != (yj > lat))
                    && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi
                {
                    inside = !inside;
                }
                j = i;
            }
        }
        inside
    }

    /// The bounding box of all vertices.
    pub fn bounding(&self) -> GeoResult<GeoBounds> {
        let mut west = f64::INFINITY;
        let mut south = f64::INFINITY;
        let mut east = f64::NEG_INFINITY;
        let mut north = f64::NEG_INFINITY;

        for ring in &self.rings {
            for &(lon, lat) in ring {
                west = west.min(lon);
                south = south.min(lat);
                east = east.max(lon);
                north = north.max(lat);
            }
        }

        GeoBounds::new(west, south, east, north)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Polygon {
        Polygon::new(vec![vec![(0.0, 0.0), (10.0, 0.0), (5.0, 10.0)]]).unwrap()
    }

    #[test]
    fn test_new_rejects_degenerate() {
        assert!(Polygon::new(vec![]).is_err());
        assert!(Polygon::new(vec![vec![(0.0, 0.0), (1.0, 1.0)]]).is_err());
    }

    #[test]
    fn test_contains() {
        let tri = triangle();
        assert!(tri.contains(5.0, 3.0));
        assert!(!tri.contains(0.5, 9.0));
        assert!(!tri.contains(-1.0, 0.5));
    }

    #[test]
    fn test_hole() {
        let donut = Polygon::new(vec![
            vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)],
        ])
        .unwrap();

        assert!(donut.contains(2.0, 2.0));
        assert!(!donut.contains(5.0, 5.0));
    }

    #[test]
    fn test_rectangle_matches_bounds() {
        let b = GeoBounds::new(-105.0, 40.0, -103.0, 41.0).unwrap();
        let rect = Polygon::rectangle(&b);
        assert!(rect.contains(-104.0, 40.5));
        assert!(!rect.contains(-102.0, 40.5));
        assert_eq!(rect.bounding().unwrap(), b);
    }
}
