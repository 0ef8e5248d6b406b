//! Cache-entry validation.
//!
//! A tile read back from disk is only served as a hit once it passes every
//! check here; any failure downgrades the read to a miss so the tile gets
//! re-derived on the next fill.

use dem_common::{meters_per_degree_lon, GridCell, METERS_PER_DEGREE, MIN_FRAGMENT_DEG};

use crate::error::ValidationError;
use crate::tile::{Tile, EXPECTED_CRS};

/// Tolerance in degrees when matching bounds against the 1-degree grid.
pub const BOUNDS_EPSILON: f64 = 0.01;

/// Minimum plausible file size for a full tile. A near-zero-byte full tile
/// indicates a torn or corrupt write.
pub const MIN_FULL_TILE_BYTES: u64 = 1024;

/// Run all cache-entry checks against a tile.
///
/// `file_size` is the on-disk container size when known (the in-memory
/// store has none).
pub fn validate_tile(tile: &Tile, file_size: Option<u64>) -> Result<(), ValidationError> {
    if tile.crs != EXPECTED_CRS {
        return Err(ValidationError::WrongCrs {
            found: tile.crs.clone(),
        });
    }

    if tile.samples.len() != tile.width * tile.height {
        return Err(ValidationError::SampleCountMismatch {
            expected: tile.width * tile.height,
            actual: tile.samples.len(),
            width: tile.width,
            height: tile.height,
        });
    }

    check_alignment(tile)?;
    check_ground_resolution(tile)?;

    if let Some(size) = file_size {
        if !tile.is_partial() && size < MIN_FULL_TILE_BYTES {
            return Err(ValidationError::FileTooSmall {
                size,
                min: MIN_FULL_TILE_BYTES,
            });
        }
    }

    Ok(())
}

/// Bounds must match the cell grid, or be a partial fragment at least
/// half a degree in both dimensions inside the parent cell.
fn check_alignment(tile: &Tile) -> Result<(), ValidationError> {
    let cell_bounds = tile.cell.bounds();
    let b = tile.bounds;

    let misaligned = || ValidationError::Misaligned {
        cell: tile.cell.to_string(),
        found: b.to_string(),
    };

    let full = (b.west - cell_bounds.west).abs() <= BOUNDS_EPSILON
        && (b.south - cell_bounds.south).abs() <= BOUNDS_EPSILON
        && (b.east - cell_bounds.east).abs() <= BOUNDS_EPSILON
        && (b.north - cell_bounds.north).abs() <= BOUNDS_EPSILON;
    if full {
        return Ok(());
    }

    // Partial fragment: inside the parent cell, and no thinner than the
    // cacheability floor in either dimension.
    let inside = b.west >= cell_bounds.west - BOUNDS_EPSILON
        && b.south >= cell_bounds.south - BOUNDS_EPSILON
        && b.east <= cell_bounds.east + BOUNDS_EPSILON
        && b.north <= cell_bounds.north + BOUNDS_EPSILON;
    if !inside {
        return Err(misaligned());
    }
    if b.width() < MIN_FRAGMENT_DEG - BOUNDS_EPSILON
        || b.height() < MIN_FRAGMENT_DEG - BOUNDS_EPSILON
    {
        return Err(misaligned());
    }

    Ok(())
}

/// Per-axis ground resolution at the tile's center latitude must fall in
/// the band for its resolution tag. The east-west axis is converted with
/// cos(latitude), so a 30 m tile at 60N is still accepted.
fn check_ground_resolution(tile: &Tile) -> Result<(), ValidationError> {
    let (lo, hi) = tile.resolution.ground_resolution_band();
    let lat = tile.bounds.center_lat();

    let meters_y = tile.dy() * METERS_PER_DEGREE;
    let meters_x = tile.dx() * meters_per_degree_lon(lat);

    for meters in [meters_y, meters_x] {
        if meters < lo || meters > hi {
            return Err(ValidationError::GroundResolution {
                tag: tile.resolution.tag(),
                meters,
                lo,
                hi,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dem_common::{GeoBounds, Resolution};

    fn full_tile() -> Tile {
        let cell = GridCell { lat: 40, lon: -105 };
        let px = Resolution::M90.pixels_per_degree() as usize;
        Tile::new(
            cell,
            cell.bounds(),
            "srtm",
            Resolution::M90,
            px,
            px,
            1,
            vec![100.0; px * px],
        )
    }

    #[test]
    fn test_full_tile_passes() {
        assert!(validate_tile(&full_tile(), Some(1 << 20)).is_ok());
    }

    #[test]
    fn test_wrong_crs_rejected() {
        let mut tile = full_tile();
        tile.crs = "EPSG:3857".to_string();
        assert!(matches!(
            validate_tile(&tile, None),
            Err(ValidationError::WrongCrs { .. })
        ));
    }

    #[test]
    fn test_half_degree_claiming_full_cell_rejected() {
        // A tile whose bounds are 0.5 x 0.5 degrees is not a full tile and,
        // offset from the cell corner checks, must be reported invalid when
        // it does not sit inside its claimed cell.
        let mut tile = full_tile();
        tile.bounds = GeoBounds::new(-105.0, 40.0, -104.5, 40.5).unwrap();
        tile.width /= 2;
        tile.height /= 2;
        tile.samples = vec![100.0; tile.width * tile.height];
        // Valid partial shape: accepted.
        assert!(validate_tile(&tile, Some(1 << 20)).is_ok());

        // Same shape claimed by a different cell: rejected.
        tile.cell = GridCell { lat: 41, lon: -105 };
        assert!(matches!(
            validate_tile(&tile, None),
            Err(ValidationError::Misaligned { .. })
        ));
    }

    #[test]
    fn test_sliver_fragment_rejected() {
        let mut tile = full_tile();
        tile.bounds = GeoBounds::new(-105.0, 40.0, -104.7, 41.0).unwrap();
        tile.width = (0.3 * Resolution::M90.pixels_per_degree() as f64) as usize;
        tile.samples = vec![100.0; tile.width * tile.height];
        assert!(matches!(
            validate_tile(&tile, None),
            Err(ValidationError::Misaligned { .. })
        ));
    }

    #[test]
    fn test_wrong_pixel_density_rejected() {
        // 90 m worth of pixels tagged as a 30 m tile lands outside the band.
        let mut tile = full_tile();
        tile.resolution = Resolution::M30;
        assert!(matches!(
            validate_tile(&tile, None),
            Err(ValidationError::GroundResolution { .. })
        ));
    }

    #[test]
    fn test_high_latitude_lon_axis_accepted() {
        let cell = GridCell { lat: 59, lon: 10 };
        let px = Resolution::M30.pixels_per_degree() as usize;
        let tile = Tile::new(
            cell,
            cell.bounds(),
            "srtm",
            Resolution::M30,
            px,
            px,
            1,
            vec![0.0; px * px],
        );
        assert!(validate_tile(&tile, None).is_ok());
    }

    #[test]
    fn test_tiny_full_tile_file_rejected() {
        let tile = full_tile();
        assert!(matches!(
            validate_tile(&tile, Some(100)),
            Err(ValidationError::FileTooSmall { .. })
        ));
    }

    #[test]
    fn test_sample_count_mismatch_rejected() {
        let mut tile = full_tile();
        tile.samples.truncate(10);
        assert!(matches!(
            validate_tile(&tile, None),
            Err(ValidationError::SampleCountMismatch { .. })
        ));
    }
}
