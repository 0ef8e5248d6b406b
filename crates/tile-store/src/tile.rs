//! The tile value: one cached raster for one grid cell.

use dem_common::{GeoBounds, GridCell, Raster, Resolution, Stage, TileName};

/// The only coordinate reference this cache stores or serves.
pub const EXPECTED_CRS: &str = "EPSG:4326";

/// One cached elevation raster covering a grid cell, or a partial fragment
/// of one (at least half a degree in both dimensions).
///
/// Tiles are immutable once written; a re-derivation writes a fresh file
/// that supersedes the old one, never a patch in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    /// The covering grid cell.
    pub cell: GridCell,
    /// Exact bounds: the full cell, or a sub-rectangle of it.
    pub bounds: GeoBounds,
    /// Dataset tag, e.g. "srtm".
    pub dataset: String,
    pub resolution: Resolution,
    pub width: usize,
    pub height: usize,
    /// Coordinate reference tag as stored in the file header.
    pub crs: String,
    /// Processing version the tile was derived under.
    pub processing_version: u32,
    /// Row-major samples, row 0 at the north edge, NaN for nodata.
    pub samples: Vec<f32>,
}

impl Tile {
    /// Create a tile in the expected coordinate reference.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cell: GridCell,
        bounds: GeoBounds,
        dataset: impl Into<String>,
        resolution: Resolution,
        width: usize,
        height: usize,
        processing_version: u32,
        samples: Vec<f32>,
    ) -> Self {
        Self {
            cell,
            bounds,
            dataset: dataset.into(),
            resolution,
            width,
            height,
            crs: EXPECTED_CRS.to_string(),
            processing_version,
            samples,
        }
    }

    /// Canonical name of this tile.
    pub fn name(&self) -> TileName {
        TileName::new(self.cell, self.resolution)
    }

    /// Whether the tile covers less than its full cell.
    pub fn is_partial(&self) -> bool {
        let full = self.cell.bounds();
        (self.bounds.west - full.west).abs() > 1e-9
            || (self.bounds.south - full.south).abs() > 1e-9
            || (self.bounds.east - full.east).abs() > 1e-9
            || (self.bounds.north - full.north).abs() > 1e-9
    }

    /// Angular pixel width in degrees.
    pub fn dx(&self) -> f64 {
        self.bounds.width() / self.width as f64
    }

    /// Angular pixel height in degrees.
    pub fn dy(&self) -> f64 {
        self.bounds.height() / self.height as f64
    }

    /// View this tile as a raw-stage raster for assembly.
    pub fn to_raster(&self) -> Raster {
        Raster {
            data: self.samples.clone(),
            width: self.width,
            height: self.height,
            bounds: self.bounds,
            stage: Stage::Raw,
            processing_version: self.processing_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell() -> GridCell {
        GridCell { lat: 40, lon: -105 }
    }

    #[test]
    fn test_full_tile_is_not_partial() {
        let tile = Tile::new(
            cell(),
            cell().bounds(),
            "srtm",
            Resolution::M30,
            4,
            4,
            1,
            vec![0.0; 16],
        );
        assert!(!tile.is_partial());
        assert_eq!(tile.name().to_string(), "N40_W105_30m.dem");
    }

    #[test]
    fn test_partial_tile() {
        let bounds = GeoBounds::new(-105.0, 40.0, -104.5, 41.0).unwrap();
        let tile = Tile::new(cell(), bounds, "srtm", Resolution::M30, 2, 4, 1, vec![0.0; 8]);
        assert!(tile.is_partial());
        assert!((tile.dx() - 0.25).abs() < 1e-12);
        assert!((tile.dy() - 0.25).abs() < 1e-12);
    }
}
