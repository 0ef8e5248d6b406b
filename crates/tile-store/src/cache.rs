//! In-memory LRU read-through layer over a tile store.
//!
//! Decoding and validating a tile from disk is cheap but not free, and
//! overlapping regions revisit the same cells constantly. This layer keeps
//! recently used decoded tiles in memory in front of any backing store.

use std::num::NonZeroUsize;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;

use dem_common::{GridCell, Resolution, TileName};

use crate::error::StoreResult;
use crate::store::TileStore;
use crate::tile::Tile;

type Key = (GridCell, String, Resolution);

/// Hit/miss accounting for the in-memory layer.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Hit rate in the 0.0 - 1.0 range.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU read-through cache wrapping another [`TileStore`].
pub struct CachedTileStore<S> {
    inner: S,
    cache: RwLock<LruCache<Key, Tile>>,
    stats: RwLock<CacheStats>,
}

impl<S: TileStore> CachedTileStore<S> {
    /// Wrap a store with an LRU of at most `capacity` decoded tiles.
    pub fn new(inner: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            inner,
            cache: RwLock::new(LruCache::new(capacity)),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Current hit/miss statistics.
    pub async fn stats(&self) -> CacheStats {
        let mut stats = self.stats.read().await.clone();
        stats.entries = self.cache.read().await.len();
        stats
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: TileStore> TileStore for CachedTileStore<S> {
    async fn get(
        &self,
        cell: GridCell,
        dataset: &str,
        resolution: Resolution,
    ) -> StoreResult<Option<Tile>> {
        let key = (cell, dataset.to_string(), resolution);

        if let Some(tile) = self.cache.write().await.get(&key) {
            self.stats.write().await.hits += 1;
            return Ok(Some(tile.clone()));
        }
        self.stats.write().await.misses += 1;

        let tile = self.inner.get(cell, dataset, resolution).await?;
        if let Some(ref tile) = tile {
            self.cache.write().await.put(key, tile.clone());
        }
        Ok(tile)
    }

    async fn put(&self, tile: Tile) -> StoreResult<()> {
        let key = (tile.cell, tile.dataset.clone(), tile.resolution);
        self.inner.put(tile.clone()).await?;
        self.cache.write().await.put(key, tile);
        Ok(())
    }

    async fn invalidate(
        &self,
        cell: GridCell,
        dataset: &str,
        resolution: Resolution,
    ) -> StoreResult<bool> {
        self.cache
            .write()
            .await
            .pop(&(cell, dataset.to_string(), resolution));
        self.inner.invalidate(cell, dataset, resolution).await
    }

    async fn list(&self, dataset: &str, resolution: Resolution) -> StoreResult<Vec<TileName>> {
        self.inner.list(dataset, resolution).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTileStore;

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
            vec![250.0; px * px],
        )
    }

    #[tokio::test]
    async fn test_hit_miss_accounting() {
        let store = CachedTileStore::new(MemoryTileStore::new(), 4);
        let cell = GridCell { lat: 40, lon: -105 };

        assert!(store.get(cell, "srtm", Resolution::M1000).await.unwrap().is_none());
        store.put(tile(40, -105)).await.unwrap();
        assert!(store.get(cell, "srtm", Resolution::M1000).await.unwrap().is_some());
        assert!(store.get(cell, "srtm", Resolution::M1000).await.unwrap().is_some());

        let stats = store.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert!(stats.hit_rate() > 0.6);
    }

    #[tokio::test]
    async fn test_eviction_falls_back_to_inner() {
        let store = CachedTileStore::new(MemoryTileStore::new(), 1);
        store.put(tile(40, -105)).await.unwrap();
        store.put(tile(40, -104)).await.unwrap();

        // The first tile was evicted from the LRU but survives in the
        // backing store.
        let hit = store
            .get(GridCell { lat: 40, lon: -105 }, "srtm", Resolution::M1000)
            .await
            .unwrap();
        assert!(hit.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_clears_both_layers() {
        let store = CachedTileStore::new(MemoryTileStore::new(), 4);
        let cell = GridCell { lat: 40, lon: -105 };
        store.put(tile(40, -105)).await.unwrap();

        assert!(store.invalidate(cell, "srtm", Resolution::M1000).await.unwrap());
        assert!(store.get(cell, "srtm", Resolution::M1000).await.unwrap().is_none());
    }
}
