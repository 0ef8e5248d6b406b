//! Download planning: chunked fetches that fill cache gaps.
//!
//! A region's missing cells are grouped into provider requests no larger
//! than the per-resolution chunk limit, fetched with bounded concurrency
//! and retried with exponential backoff. Fetched chunks are split back
//! into 1-degree cell tiles and written to the store independently, so
//! overlapping regions reuse every cell. Cells that stay unfetchable are
//! reported as gaps, never as errors: the assembler tolerates holes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use dem_common::{GeoBounds, GridCell, Resolution, MIN_FRAGMENT_DEG};
use tile_store::{Tile, TileStore};

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::provider::{ElevationProvider, FetchError, FetchedRaster};

/// Maximum chunk request span in degrees for a resolution.
///
/// Reflects provider API limits and response-size practicality: finer
/// resolution means more bytes per degree, so smaller requests.
pub fn max_chunk_degrees(resolution: Resolution) -> f64 {
    match resolution {
        Resolution::M10 => 1.0,
        Resolution::M30 => 2.0,
        Resolution::M90 => 5.0,
        Resolution::M250 => 10.0,
        Resolution::M500 => 15.0,
        Resolution::M1000 => 30.0,
    }
}

/// Split a request into provider-compliant chunk bounds.
///
/// Bounds are first snapped outward to integer degrees so chunk edges
/// coincide with the tile grid; every chunk then holds whole cells.
pub fn plan_chunks(bounds: &GeoBounds, resolution: Resolution) -> Vec<GeoBounds> {
    let span = max_chunk_degrees(resolution);
    let west0 = bounds.west.floor();
    let south0 = bounds.south.floor();
    let east0 = bounds.east.ceil();
    let north0 = bounds.north.ceil();

    let mut chunks = Vec::new();
    let mut south = south0;
    while south < north0 {
        let north = (south + span).min(north0);
        let mut west = west0;
        while west < east0 {
            let east = (west + span).min(east0);
            chunks.push(GeoBounds {
                west,
                south,
                east,
                north,
            });
            west = east;
        }
        south = north;
    }
    chunks
}

/// Cooperative cancellation for a region run.
///
/// Cancelling stops the planner from issuing new chunk downloads;
/// in-flight fetches run to completion and their tiles are still written,
/// preserving their cache value for future requests.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of one gap-filling pass.
#[derive(Debug, Clone, Default)]
pub struct GapReport {
    /// Cells fetched and written this pass.
    pub fetched: Vec<GridCell>,
    /// Cells still unavailable after retries (or skipped by cancellation).
    pub missing: Vec<GridCell>,
}

impl GapReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

#[derive(Debug, Default)]
struct ChunkOutcome {
    fetched: Vec<GridCell>,
    missing: Vec<GridCell>,
}

impl ChunkOutcome {
    fn absorb(&mut self, other: ChunkOutcome) {
        self.fetched.extend(other.fetched);
        self.missing.extend(other.missing);
    }
}

/// Plans and executes chunk downloads for missing cells.
pub struct DownloadPlanner<P> {
    provider: Arc<P>,
    config: PipelineConfig,
}

impl<P: ElevationProvider> DownloadPlanner<P> {
    pub fn new(provider: Arc<P>, config: PipelineConfig) -> Self {
        Self { provider, config }
    }

    /// Fetch and cache tiles for every missing cell.
    ///
    /// Chunk failures are isolated: a failed multi-cell chunk falls back
    /// to per-cell requests so one bad cell cannot take its neighbors
    /// down with it. Store failures are real errors and propagate.
    #[instrument(skip_all, fields(dataset = %dataset, resolution = %resolution, missing = missing.len()))]
    pub async fn fill_gaps(
        &self,
        store: &dyn TileStore,
        dataset: &str,
        resolution: Resolution,
        missing: &[GridCell],
        cancel: &CancelToken,
    ) -> PipelineResult<GapReport> {
        if missing.is_empty() {
            return Ok(GapReport::default());
        }

        let envelope = envelope_of(missing);
        let work: Vec<(GeoBounds, Vec<GridCell>)> = plan_chunks(&envelope, resolution)
            .into_iter()
            .filter_map(|chunk| {
                let cells: Vec<GridCell> = missing
                    .iter()
                    .copied()
                    .filter(|cell| {
                        let b = cell.bounds();
                        chunk.contains_point(b.center().0, b.center().1)
                    })
                    .collect();
                (!cells.is_empty()).then_some((chunk, cells))
            })
            .collect();

        debug!(chunks = work.len(), "planned chunk downloads");

        let outcomes: Vec<PipelineResult<ChunkOutcome>> = stream::iter(
            work.into_iter().map(|(chunk, cells)| {
                self.fetch_chunk(store, dataset, resolution, chunk, cells, cancel)
            }),
        )
        .buffer_unordered(self.config.concurrent_downloads)
        .collect()
        .await;

        let mut report = GapReport::default();
        for outcome in outcomes {
            let outcome = outcome?;
            report.fetched.extend(outcome.fetched);
            report.missing.extend(outcome.missing);
        }
        report.fetched.sort();
        report.missing.sort();

        info!(
            fetched = report.fetched.len(),
            missing = report.missing.len(),
            "gap fill finished"
        );
        Ok(report)
    }

    async fn fetch_chunk(
        &self,
        store: &dyn TileStore,
        dataset: &str,
        resolution: Resolution,
        chunk: GeoBounds,
        cells: Vec<GridCell>,
        cancel: &CancelToken,
    ) -> PipelineResult<ChunkOutcome> {
        if cancel.is_cancelled() {
            debug!(chunk = %chunk, "run cancelled, skipping chunk");
            return Ok(ChunkOutcome {
                fetched: Vec::new(),
                missing: cells,
            });
        }

        match self.fetch_with_retry(chunk, dataset, resolution).await {
            Ok(raster) => {
                self.split_and_store(store, dataset, resolution, &raster, &cells)
                    .await
            }
            Err(error) if cells.len() > 1 => {
                // The chunk as a whole is unfetchable; narrow the blast
                // radius by asking for each cell on its own.
                warn!(chunk = %chunk, %error, "chunk download failed, refetching per cell");
                let mut outcome = ChunkOutcome::default();
                for cell in cells {
                    if cancel.is_cancelled() {
                        outcome.missing.push(cell);
                        continue;
                    }
                    match self
                        .fetch_with_retry(cell.bounds(), dataset, resolution)
                        .await
                    {
                        Ok(raster) => {
                            let sub = self
                                .split_and_store(store, dataset, resolution, &raster, &[cell])
                                .await?;
                            outcome.absorb(sub);
                        }
                        Err(error) => {
                            warn!(cell = %cell, %error, "cell download failed permanently");
                            outcome.missing.push(cell);
                        }
                    }
                }
                Ok(outcome)
            }
            Err(error) => {
                warn!(chunk = %chunk, %error, "chunk download failed permanently");
                Ok(ChunkOutcome {
                    fetched: Vec::new(),
                    missing: cells,
                })
            }
        }
    }

    async fn fetch_with_retry(
        &self,
        bounds: GeoBounds,
        dataset: &str,
        resolution: Resolution,
    ) -> Result<FetchedRaster, FetchError> {
        let mut attempt = 0u32;
        let mut delay = self.config.initial_retry_delay;

        loop {
            match self.provider.fetch(bounds, dataset, resolution).await {
                Ok(raster) => return Ok(raster),
                Err(error) => {
                    attempt += 1;
                    if !error.is_retryable() || attempt > self.config.max_retries {
                        return Err(error);
                    }
                    warn!(
                        bounds = %bounds,
                        %error,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.config.max_retry_delay);
                }
            }
        }
    }

    /// Split a fetched chunk into per-cell tiles and write each one.
    ///
    /// A cell clipped below the fragment floor by the provider's coverage
    /// edge is discarded, not cached.
    async fn split_and_store(
        &self,
        store: &dyn TileStore,
        dataset: &str,
        resolution: Resolution,
        raster: &FetchedRaster,
        cells: &[GridCell],
    ) -> PipelineResult<ChunkOutcome> {
        let mut outcome = ChunkOutcome::default();

        for &cell in cells {
            let target = match cell.bounds().intersection(&raster.bounds) {
                Some(target) => target,
                None => {
                    debug!(cell = %cell, "fetched raster does not reach this cell");
                    outcome.missing.push(cell);
                    continue;
                }
            };
            if target.width() < MIN_FRAGMENT_DEG || target.height() < MIN_FRAGMENT_DEG {
                debug!(cell = %cell, target = %target, "fragment below floor, discarding");
                outcome.missing.push(cell);
                continue;
            }

            match extract_tile(
                raster,
                cell,
                target,
                dataset,
                resolution,
                self.config.processing_version,
            ) {
                Some(tile) => {
                    store.put(tile).await?;
                    outcome.fetched.push(cell);
                }
                None => outcome.missing.push(cell),
            }
        }
        Ok(outcome)
    }
}

/// Smallest bounds containing every cell.
fn envelope_of(cells: &[GridCell]) -> GeoBounds {
    let mut west = i32::MAX;
    let mut south = i32::MAX;
    let mut east = i32::MIN;
    let mut north = i32::MIN;
    for cell in cells {
        west = west.min(cell.lon);
        south = south.min(cell.lat);
        east = east.max(cell.lon + 1);
        north = north.max(cell.lat + 1);
    }
    GeoBounds {
        west: west as f64,
        south: south as f64,
        east: east as f64,
        north: north as f64,
    }
}

/// Cut one cell's window out of a fetched chunk raster.
fn extract_tile(
    raster: &FetchedRaster,
    cell: GridCell,
    target: GeoBounds,
    dataset: &str,
    resolution: Resolution,
    processing_version: u32,
) -> Option<Tile> {
    let ppd = resolution.pixels_per_degree() as f64;
    let width = (target.width() * ppd).round() as usize;
    let height = (target.height() * ppd).round() as usize;
    if width == 0 || height == 0 {
        return None;
    }

    let col0 = ((target.west - raster.bounds.west) / raster.dx()).round() as isize;
    let row0 = ((raster.bounds.north - target.north) / raster.dy()).round() as isize;

    let mut samples = vec![f32::NAN; width * height];
    for row in 0..height {
        let src_row = row0 + row as isize;
        if src_row < 0 || src_row as usize >= raster.height {
            continue;
        }
        for col in 0..width {
            let src_col = col0 + col as isize;
            if src_col < 0 || src_col as usize >= raster.width {
                continue;
            }
            samples[row * width + col] =
                raster.samples[src_row as usize * raster.width + src_col as usize];
        }
    }

    Some(Tile::new(
        cell,
        target,
        dataset,
        resolution,
        width,
        height,
        processing_version,
        samples,
    ))
}
