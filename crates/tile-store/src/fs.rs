//! Filesystem-backed tile store.
//!
//! Layout: one subtree per dataset/resolution, tiles keyed by canonical
//! filename:
//!
//! ```text
//! root/
//!   srtm_30m/
//!     N40_W105_30m.dem
//!     N40_W104_30m.dem
//!   srtm_90m/
//!     ...
//! ```
//!
//! Writes go to a `.partial` sibling and are renamed into place after the
//! full write succeeds, so readers never observe a torn file. Concurrent
//! writers racing on the same cell resolve through the rename; the last
//! one wins with identical content.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use walkdir::WalkDir;

use dem_common::{GridCell, Resolution, TileName, TILE_EXTENSION};

use crate::codec;
use crate::error::StoreResult;
use crate::store::TileStore;
use crate::tile::Tile;
use crate::validate::validate_tile;

/// On-disk tile store rooted at a cache directory.
pub struct FsTileStore {
    root: PathBuf,
}

impl FsTileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn subtree(&self, dataset: &str, resolution: Resolution) -> PathBuf {
        self.root.join(format!("{dataset}_{}", resolution.tag()))
    }

    /// Full path of the tile file for a cell.
    pub fn path_for(&self, cell: GridCell, dataset: &str, resolution: Resolution) -> PathBuf {
        self.subtree(dataset, resolution)
            .join(TileName::new(cell, resolution).to_string())
    }

    /// Remove every tile written under an older processing version.
    ///
    /// Returns the number of tiles removed. Files that fail header decode
    /// are removed as well; they could never be served.
    pub async fn purge_below_version(&self, min_version: u32) -> StoreResult<usize> {
        let mut removed = 0usize;
        for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(TILE_EXTENSION)
            {
                continue;
            }

            let stale = match tokio::fs::read(path).await {
                Ok(bytes) => match codec::decode_header(&bytes) {
                    Ok(header) => header.processing_version < min_version,
                    Err(reason) => {
                        warn!(path = %path.display(), %reason, "unreadable tile header, purging");
                        true
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read tile, skipping");
                    continue;
                }
            };

            if stale {
                tokio::fs::remove_file(path).await?;
                removed += 1;
            }
        }
        debug!(removed, min_version, "purged stale tiles");
        Ok(removed)
    }
}

#[async_trait]
impl TileStore for FsTileStore {
    async fn get(
        &self,
        cell: GridCell,
        dataset: &str,
        resolution: Resolution,
    ) -> StoreResult<Option<Tile>> {
        let path = self.path_for(cell, dataset, resolution);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file_size = bytes.len() as u64;

        let tile = match codec::decode(&bytes) {
            Ok(tile) => tile,
            Err(reason) => {
                warn!(path = %path.display(), %reason, "corrupt tile, reporting miss");
                return Ok(None);
            }
        };

        // The file must describe the cell it is named for.
        if tile.cell != cell || tile.dataset != dataset || tile.resolution != resolution {
            warn!(
                path = %path.display(),
                header_cell = %tile.cell,
                "tile header disagrees with its filename, reporting miss"
            );
            return Ok(None);
        }

        if let Err(reason) = validate_tile(&tile, Some(file_size)) {
            warn!(path = %path.display(), %reason, "tile failed validation, reporting miss");
            return Ok(None);
        }

        Ok(Some(tile))
    }

    async fn put(&self, tile: Tile) -> StoreResult<()> {
        validate_tile(&tile, None)?;

        let final_path = self.path_for(tile.cell, &tile.dataset, tile.resolution);
        if let Some(parent) = final_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = codec::encode(&tile)?;
        let temp_path = final_path.with_extension(format!("{TILE_EXTENSION}.partial"));
        tokio::fs::write(&temp_path, &bytes).await?;
        tokio::fs::rename(&temp_path, &final_path).await?;

        debug!(
            path = %final_path.display(),
            bytes = bytes.len(),
            partial = tile.is_partial(),
            "wrote tile"
        );
        Ok(())
    }

    async fn invalidate(
        &self,
        cell: GridCell,
        dataset: &str,
        resolution: Resolution,
    ) -> StoreResult<bool> {
        let path = self.path_for(cell, dataset, resolution);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, dataset: &str, resolution: Resolution) -> StoreResult<Vec<TileName>> {
        let subtree = self.subtree(dataset, resolution);
        if !subtree.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&subtree)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy();
            if let Ok(name) = TileName::parse(&file_name) {
                names.push(name);
            }
        }
        names.sort_by_key(|n| n.to_string());
        Ok(names)
    }
}
