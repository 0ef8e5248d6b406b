//! The tile store interface and the in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use dem_common::{GridCell, Resolution, TileName};

use crate::error::StoreResult;
use crate::tile::Tile;
use crate::validate::validate_tile;

/// Storage for cached tiles, injected into the pipeline.
///
/// The on-disk cache directory is the only shared mutable resource in the
/// system, so it hides behind this interface rather than a module-level
/// singleton; tests substitute [`MemoryTileStore`].
#[async_trait]
pub trait TileStore: Send + Sync {
    /// Fetch a validated tile, or None on a miss. A stored tile failing
    /// validation is reported as a miss, never served.
    async fn get(
        &self,
        cell: GridCell,
        dataset: &str,
        resolution: Resolution,
    ) -> StoreResult<Option<Tile>>;

    /// Store a tile. Rejects tiles that would fail validation on read.
    async fn put(&self, tile: Tile) -> StoreResult<()>;

    /// Remove a tile so the next access re-derives it. Returns whether a
    /// tile was present.
    async fn invalidate(
        &self,
        cell: GridCell,
        dataset: &str,
        resolution: Resolution,
    ) -> StoreResult<bool>;

    /// Canonical names of all tiles for a dataset/resolution, sorted.
    async fn list(&self, dataset: &str, resolution: Resolution) -> StoreResult<Vec<TileName>>;
}

type Key = (GridCell, String, Resolution);

/// In-memory tile store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryTileStore {
    tiles: RwLock<HashMap<Key, Tile>>,
}

impl MemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tiles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tiles.read().await.is_empty()
    }
}

#[async_trait]
impl TileStore for MemoryTileStore {
    async fn get(
        &self,
        cell: GridCell,
        dataset: &str,
        resolution: Resolution,
    ) -> StoreResult<Option<Tile>> {
        let tiles = self.tiles.read().await;
        let tile = match tiles.get(&(cell, dataset.to_string(), resolution)) {
            Some(tile) => tile,
            None => return Ok(None),
        };

        if let Err(reason) = validate_tile(tile, None) {
            warn!(cell = %cell, %reason, "stored tile failed validation, reporting miss");
            return Ok(None);
        }
        Ok(Some(tile.clone()))
    }

    async fn put(&self, tile: Tile) -> StoreResult<()> {
        validate_tile(&tile, None)?;
        let key = (tile.cell, tile.dataset.clone(), tile.resolution);
        self.tiles.write().await.insert(key, tile);
        Ok(())
    }

    async fn invalidate(
        &self,
        cell: GridCell,
        dataset: &str,
        resolution: Resolution,
    ) -> StoreResult<bool> {
        let removed = self
            .tiles
            .write()
            .await
            .remove(&(cell, dataset.to_string(), resolution));
        Ok(removed.is_some())
    }

    async fn list(&self, dataset: &str, resolution: Resolution) -> StoreResult<Vec<TileName>> {
        let tiles = self.tiles.read().await;
        let mut names: Vec<TileName> = tiles
            .keys()
            .filter(|(_, d, r)| d == dataset && *r == resolution)
            .map(|(cell, _, r)| TileName::new(*cell, *r))
            .collect();
        names.sort_by_key(|n| n.to_string());
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dem_common::GeoBounds;

    fn tile(lat: i32, lon: i32) -> Tile {
        let cell = GridCell { lat, lon };
        let px = Resolution::M1000.pixels_per_degree() as usize;
        Tile::new(
            cell,
            cell.bounds(),
            "srtm",
            Resolution::M1000,
            px,
            px,
            1,
            vec![500.0; px * px],
        )
    }

    #[tokio::test]
    async fn test_put_get_invalidate() {
        let store = MemoryTileStore::new();
        let cell = GridCell { lat: 40, lon: -105 };

        assert!(store.get(cell, "srtm", Resolution::M1000).await.unwrap().is_none());

        store.put(tile(40, -105)).await.unwrap();
        let hit = store.get(cell, "srtm", Resolution::M1000).await.unwrap();
        assert_eq!(hit.unwrap().cell, cell);

        assert!(store.invalidate(cell, "srtm", Resolution::M1000).await.unwrap());
        assert!(!store.invalidate(cell, "srtm", Resolution::M1000).await.unwrap());
        assert!(store.get(cell, "srtm", Resolution::M1000).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_rejects_invalid() {
        let store = MemoryTileStore::new();
        let mut bad = tile(40, -105);
        bad.bounds = GeoBounds::new(-105.0, 40.0, -104.7, 40.3).unwrap();
        assert!(store.put(bad).await.is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_list_sorted_per_dataset() {
        let store = MemoryTileStore::new();
        store.put(tile(40, -104)).await.unwrap();
        store.put(tile(40, -105)).await.unwrap();
        store.put(tile(41, -105)).await.unwrap();

        let names = store.list("srtm", Resolution::M1000).await.unwrap();
        let rendered: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["N40_W104_1km.dem", "N40_W105_1km.dem", "N41_W105_1km.dem"]
        );

        assert!(store.list("aster", Resolution::M1000).await.unwrap().is_empty());
    }
}
