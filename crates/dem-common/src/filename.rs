//! Canonical tile filenames.
//!
//! A tile file is named for the southwest integer corner of its grid cell
//! plus the resolution tag: `{N|S}{lat:02}_{E|W}{lon:03}_{res}.dem`, e.g.
//! `N40_W105_30m.dem`. Hemisphere letters and zero padding keep cache
//! listings sortable and collision-free, and `parse` exactly inverts
//! `to_string` for every valid name.

use crate::bounds::GeoBounds;
use crate::error::{GeoError, GeoResult};
use crate::grid::GridCell;
use crate::resolution::Resolution;

/// File extension for on-disk tiles.
pub const TILE_EXTENSION: &str = "dem";

/// A canonical tile name: grid cell plus resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileName {
    pub cell: GridCell,
    pub resolution: Resolution,
}

impl TileName {
    pub fn new(cell: GridCell, resolution: Resolution) -> Self {
        Self { cell, resolution }
    }

    /// The tile name for the cell holding the southwest corner of `bounds`.
    pub fn for_bounds(bounds: &GeoBounds, resolution: Resolution) -> Self {
        Self {
            cell: GridCell::containing(bounds.west, bounds.south),
            resolution,
        }
    }

    /// Parse a canonical tile filename, with or without a leading path or
    /// the `.dem` extension.
    pub fn parse(name: &str) -> GeoResult<Self> {
        let base = name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(name);
        let base = base.strip_suffix(".dem").unwrap_or(base);

        let invalid = || GeoError::InvalidFilename(name.to_string());

        let mut parts = base.split('_');
        let lat_part = parts.next().ok_or_else(invalid)?;
        let lon_part = parts.next().ok_or_else(invalid)?;
        let res_part = parts.next().ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        let lat_sign = match lat_part.chars().next() {
            Some('N') | Some('n') => 1,
            Some('S') | Some('s') => -1,
            _ => return Err(invalid()),
        };
        let lat: i32 = lat_part[1..].parse().map_err(|_| invalid())?;
        if lat_part.len() != 3 {
            return Err(invalid());
        }

        let lon_sign = match lon_part.chars().next() {
            Some('E') | Some('e') => 1,
            Some('W') | Some('w') => -1,
            _ => return Err(invalid()),
        };
        let lon: i32 = lon_part[1..].parse().map_err(|_| invalid())?;
        if lon_part.len() != 4 {
            return Err(invalid());
        }

        let resolution = Resolution::from_tag(res_part).map_err(|_| invalid())?;

        let cell = GridCell {
            lat: lat * lat_sign,
            lon: lon * lon_sign,
        };
        if !cell.in_range() {
            return Err(invalid());
        }

        Ok(Self { cell, resolution })
    }
}

impl std::fmt::Display for TileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_{}.{}",
            self.cell,
            self.resolution.tag(),
            TILE_EXTENSION
        )
    }
}
