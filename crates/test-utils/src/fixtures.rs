//! Common test fixtures for terrain-tiles tests.

use dem_common::{GeoBounds, GridCell, Resolution};
use tile_store::Tile;

use crate::generators::constant_grid;

/// A full-cell tile at the resolution's native pixel density, filled with
/// a constant elevation.
pub fn full_tile(
    lat: i32,
    lon: i32,
    resolution: Resolution,
    processing_version: u32,
    value: f32,
) -> Tile {
    let cell = GridCell { lat, lon };
    let px = resolution.pixels_per_degree() as usize;
    Tile::new(
        cell,
        cell.bounds(),
        "srtm",
        resolution,
        px,
        px,
        processing_version,
        constant_grid(px, px, value),
    )
}

/// A partial tile covering the western `fraction` of its cell.
pub fn partial_tile(
    lat: i32,
    lon: i32,
    resolution: Resolution,
    fraction: f64,
    value: f32,
) -> Tile {
    let cell = GridCell { lat, lon };
    let full = cell.bounds();
    let bounds = GeoBounds {
        west: full.west,
        south: full.south,
        east: full.west + fraction,
        north: full.north,
    };

    let ppd = resolution.pixels_per_degree() as f64;
    let width = ((bounds.width() * ppd).round() as usize).max(1);
    let height = resolution.pixels_per_degree() as usize;
    Tile::new(
        cell,
        bounds,
        "srtm",
        resolution,
        width,
        height,
        1,
        constant_grid(width, height, value),
    )
}
