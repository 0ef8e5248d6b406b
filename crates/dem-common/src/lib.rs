//! Common geographic types shared across the terrain-tiles workspace.

pub mod adjacency;
pub mod bounds;
pub mod error;
pub mod filename;
pub mod grid;
pub mod polygon;
pub mod raster;
pub mod resolution;

pub use adjacency::{Direction, NeighborTable};
pub use bounds::GeoBounds;
pub use error::{GeoError, GeoResult};
pub use filename::{TileName, TILE_EXTENSION};
pub use grid::{cells_covering, coverage, CellCoverage, GridCell, MIN_FRAGMENT_DEG};
pub use polygon::Polygon;
pub use raster::{Raster, RasterStats, Stage};
pub use resolution::{meters_per_degree_lon, Resolution, METERS_PER_DEGREE};
