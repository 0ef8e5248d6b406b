//! The 1-degree tile grid: cells and bounds-to-cell coverage.

use serde::{Deserialize, Serialize};

use crate::bounds::GeoBounds;

/// Minimum width and height in degrees for an edge fragment to be worth
/// keeping. Thinner slivers compress poorly and multiply cache entries
/// without adding reusable value, so they are excluded from coverage and
/// never cached.
pub const MIN_FRAGMENT_DEG: f64 = 0.5;

const ALIGN_EPSILON: f64 = 1e-9;

/// A 1x1 degree grid cell, identified by the integer degrees of its
/// southwest corner. Cell `(lat, lon)` covers
/// `[lon, lon+1) x [lat, lat+1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub lat: i32,
    pub lon: i32,
}

impl GridCell {
    /// The cell containing the given point.
    pub fn containing(lon: f64, lat: f64) -> Self {
        Self {
            lat: lat.floor() as i32,
            lon: lon.floor() as i32,
        }
    }

    /// Full bounds of this cell.
    pub fn bounds(&self) -> GeoBounds {
        GeoBounds {
            west: self.lon as f64,
            south: self.lat as f64,
            east: (self.lon + 1) as f64,
            north: (self.lat + 1) as f64,
        }
    }

    /// Whether the cell lies entirely within WGS84 range.
    pub fn in_range(&self) -> bool {
        self.lat >= -90 && self.lat < 90 && self.lon >= -180 && self.lon < 180
    }
}

impl std::fmt::Display for GridCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lat_prefix = if self.lat >= 0 { 'N' } else { 'S' };
        let lon_prefix = if self.lon >= 0 { 'E' } else { 'W' };
        write!(
            f,
            "{}{:02}_{}{:03}",
            lat_prefix,
            self.lat.abs(),
            lon_prefix,
            self.lon.abs()
        )
    }
}

/// One cell of a coverage result: the cell, its clip to the requested
/// bounds, and whether that clip is a partial fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellCoverage {
    pub cell: GridCell,
    pub clipped: GeoBounds,
    pub is_partial: bool,
}

/// Enumerate the grid cells covering `bounds`, with their clips.
///
/// West/south are floored and east/north ceiled to integer degrees, then
/// every unit cell in between is visited in row-major order (south to
/// north, west to east). Cells whose clip to `bounds` is thinner than
/// [`MIN_FRAGMENT_DEG`] in either dimension are excluded.
pub fn coverage(bounds: &GeoBounds) -> Vec<CellCoverage> {
    let lat_lo = bounds.south.floor() as i32;
    let lat_hi = bounds.north.ceil() as i32;
    let lon_lo = bounds.west.floor() as i32;
    let lon_hi = bounds.east.ceil() as i32;

    let mut cells = Vec::new();
    for lat in lat_lo..lat_hi {
        for lon in lon_lo..lon_hi {
            let cell = GridCell { lat, lon };
            if !cell.in_range() {
                continue;
            }

            let clipped = match cell.bounds().intersection(bounds) {
                Some(clipped) => clipped,
                None => continue,
            };
            if clipped.width() < MIN_FRAGMENT_DEG || clipped.height() < MIN_FRAGMENT_DEG {
                continue;
            }

            let is_partial = clipped.width() < 1.0 - ALIGN_EPSILON
                || clipped.height() < 1.0 - ALIGN_EPSILON;
            cells.push(CellCoverage {
                cell,
                clipped,
                is_partial,
            });
        }
    }
    cells
}

/// The ordered set of grid cells covering `bounds`.
///
/// Same enumeration and sliver policy as [`coverage`].
pub fn cells_covering(bounds: &GeoBounds) -> Vec<GridCell> {
    coverage(bounds).into_iter().map(|c| c.cell).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(w: f64, s: f64, e: f64, n: f64) -> GeoBounds {
        GeoBounds::new(w, s, e, n).unwrap()
    }

    #[test]
    fn test_containing() {
        assert_eq!(
            GridCell::containing(-104.5, 40.5),
            GridCell { lat: 40, lon: -105 }
        );
        assert_eq!(
            GridCell::containing(-0.1, -0.1),
            GridCell { lat: -1, lon: -1 }
        );
        assert_eq!(GridCell::containing(0.0, 0.0), GridCell { lat: 0, lon: 0 });
    }

    #[test]
    fn test_cell_bounds() {
        let cell = GridCell { lat: 40, lon: -105 };
        assert_eq!(cell.bounds(), bounds(-105.0, 40.0, -104.0, 41.0));
    }

    #[test]
    fn test_example_scenario() {
        // (-105.0, 40.0, -103.0, 41.0) covers exactly two cells.
        let cells = cells_covering(&bounds(-105.0, 40.0, -103.0, 41.0));
        assert_eq!(
            cells,
            vec![
                GridCell { lat: 40, lon: -105 },
                GridCell { lat: 40, lon: -104 },
            ]
        );
    }

    #[test]
    fn test_sliver_discard() {
        // The third column clips to 0.2 degrees wide and is dropped.
        let cells = cells_covering(&bounds(-105.0, 40.0, -103.8, 41.0));
        assert_eq!(
            cells,
            vec![
                GridCell { lat: 40, lon: -105 },
                GridCell { lat: 40, lon: -104 },
            ]
        );

        // At exactly half a degree the fragment is kept.
        let cells = cells_covering(&bounds(-105.0, 40.0, -103.5, 41.0));
        assert_eq!(cells.len(), 3);
        assert!(cells.contains(&GridCell { lat: 40, lon: -104 }));
    }

    #[test]
    fn test_partial_flag() {
        let cov = coverage(&bounds(-105.0, 40.0, -103.5, 41.0));
        assert!(!cov[0].is_partial);
        assert!(!cov[1].is_partial);
        assert!(cov[2].is_partial);
        assert_eq!(cov[2].clipped, bounds(-104.0, 40.0, -103.5, 41.0));
    }

    #[test]
    fn test_coverage_contains_bounds() {
        // Union of kept cells contains the requested bounds wherever no
        // sliver was dropped.
        let request = bounds(9.25, 45.5, 12.75, 48.5);
        let cov = coverage(&request);
        for c in &cov {
            assert!(c.cell.bounds().intersects(&request));
            assert!(c.clipped.width() >= MIN_FRAGMENT_DEG);
            assert!(c.clipped.height() >= MIN_FRAGMENT_DEG);
        }
        // 4 columns x 4 rows, the half-degree edge rows kept.
        assert_eq!(cov.len(), 16);
    }

    #[test]
    fn test_display() {
        assert_eq!(GridCell { lat: 40, lon: -105 }.to_string(), "N40_W105");
        assert_eq!(GridCell { lat: -12, lon: 77 }.to_string(), "S12_E077");
        assert_eq!(GridCell { lat: 0, lon: 0 }.to_string(), "N00_E000");
    }

    #[test]
    fn test_out_of_range_cells_skipped() {
        // A request touching the pole enumerates only in-range rows.
        let cells = cells_covering(&bounds(0.0, 89.0, 1.0, 90.0));
        assert_eq!(cells, vec![GridCell { lat: 89, lon: 0 }]);
    }
}
