//! Grid-aligned elevation tile cache.
//!
//! Tiles are the atomic cache unit: one file per 1-degree grid cell (or a
//! documented partial fragment), keyed by canonical filename under one
//! subtree per dataset/resolution. Reuse across overlapping regions is
//! structural; no index maps regions to tiles.
//!
//! Every read is validated before being served as a hit, and every write
//! goes through a temp-file-plus-rename so a crash mid-write never leaves
//! a torn file visible to readers.

pub mod cache;
pub mod codec;
pub mod error;
pub mod fs;
pub mod store;
pub mod tile;
pub mod validate;

pub use cache::{CacheStats, CachedTileStore};
pub use error::{StoreError, StoreResult, ValidationError};
pub use fs::FsTileStore;
pub use store::{MemoryTileStore, TileStore};
pub use tile::{Tile, EXPECTED_CRS};
pub use validate::{validate_tile, BOUNDS_EPSILON, MIN_FULL_TILE_BYTES};
