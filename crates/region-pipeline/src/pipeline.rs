//! Pipeline orchestration: one region request in, one export artifact out.

use std::sync::Arc;

use tracing::{info, instrument};

use dem_common::{coverage, GeoBounds, GridCell, Polygon, Resolution, Stage};
use tile_store::TileStore;

use crate::assembler::{clip, mosaic};
use crate::boundary::BoundarySource;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, QualityWarning};
use crate::export::ExportArtifact;
use crate::planner::{CancelToken, DownloadPlanner};
use crate::provider::ElevationProvider;
use crate::resample::resample;

/// One region to assemble and export.
#[derive(Debug, Clone)]
pub struct RegionRequest {
    pub name: String,
    pub bounds: GeoBounds,
    pub dataset: String,
    pub resolution: Resolution,
    /// Boundary to mask against; None exports the bounding box as-is.
    pub boundary: Option<Polygon>,
}

impl RegionRequest {
    pub fn new(
        name: impl Into<String>,
        bounds: GeoBounds,
        dataset: impl Into<String>,
        resolution: Resolution,
    ) -> Self {
        Self {
            name: name.into(),
            bounds,
            dataset: dataset.into(),
            resolution,
            boundary: None,
        }
    }

    pub fn with_boundary(mut self, boundary: Polygon) -> Self {
        self.boundary = Some(boundary);
        self
    }
}

/// A finished export with its quality report.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub artifact: ExportArtifact,
    /// Cells whose pixels are nodata because their fetch failed for good.
    pub gaps: Vec<GridCell>,
    pub warnings: Vec<QualityWarning>,
}

impl ExportOutcome {
    /// Whether the export covered every cell without quality findings.
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty() && self.warnings.is_empty()
    }
}

/// The region assembly pipeline.
///
/// Holds the injected tile store and elevation provider; each `run` is a
/// pure transform over them plus the request. Intermediate rasters are
/// owned by the run and dropped at its end.
pub struct RegionPipeline<S, P> {
    store: Arc<S>,
    planner: DownloadPlanner<P>,
    config: PipelineConfig,
}

impl<S: TileStore, P: ElevationProvider> RegionPipeline<S, P> {
    pub fn new(store: Arc<S>, provider: Arc<P>, config: PipelineConfig) -> Self {
        let planner = DownloadPlanner::new(provider, config.clone());
        Self {
            store,
            planner,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline for a request.
    pub async fn run(&self, request: &RegionRequest) -> PipelineResult<ExportOutcome> {
        self.run_with_cancel(request, &CancelToken::new()).await
    }

    /// Resolve the boundary for a named region, then run.
    pub async fn run_named(
        &self,
        name: &str,
        bounds: GeoBounds,
        dataset: &str,
        resolution: Resolution,
        boundaries: &dyn BoundarySource,
    ) -> PipelineResult<ExportOutcome> {
        let polygon = boundaries
            .resolve(name)
            .await
            .map_err(|reason| PipelineError::Boundary {
                region: name.to_string(),
                reason,
            })?;

        let mut request = RegionRequest::new(name, bounds, dataset, resolution);
        if let Some(polygon) = polygon {
            request = request.with_boundary(polygon);
        }
        self.run(&request).await
    }

    /// Run the full pipeline with cooperative cancellation.
    ///
    /// Cancellation stops new chunk downloads; completed tiles stay
    /// cached for future requests.
    #[instrument(skip_all, fields(region = %request.name, dataset = %request.dataset))]
    pub async fn run_with_cancel(
        &self,
        request: &RegionRequest,
        cancel: &CancelToken,
    ) -> PipelineResult<ExportOutcome> {
        request.bounds.validate()?;
        let cover = coverage(&request.bounds);
        if cover.is_empty() {
            return Err(PipelineError::NoCells {
                region: request.name.clone(),
            });
        }

        // Cache pass: validated hits now, everything else to the planner.
        let mut tiles = Vec::new();
        let mut missing = Vec::new();
        for cov in &cover {
            match self
                .store
                .get(cov.cell, &request.dataset, request.resolution)
                .await?
            {
                Some(tile) => tiles.push(tile),
                None => missing.push(cov.cell),
            }
        }
        info!(
            cells = cover.len(),
            cached = tiles.len(),
            missing = missing.len(),
            "cache pass complete"
        );

        let mut gaps: Vec<GridCell> = Vec::new();
        if !missing.is_empty() {
            let report = self
                .planner
                .fill_gaps(
                    self.store.as_ref(),
                    &request.dataset,
                    request.resolution,
                    &missing,
                    cancel,
                )
                .await?;

            for &cell in &report.fetched {
                match self
                    .store
                    .get(cell, &request.dataset, request.resolution)
                    .await?
                {
                    Some(tile) => tiles.push(tile),
                    // A freshly written tile that does not read back as a
                    // hit counts as a gap rather than a crash.
                    None => gaps.push(cell),
                }
            }
            gaps.extend(report.missing);
            gaps.sort();
            gaps.dedup();
        }

        let raw = mosaic(
            &tiles,
            request.bounds,
            request.resolution,
            self.config.processing_version,
        );

        let mut warnings = Vec::new();
        let clipped = match &request.boundary {
            Some(polygon) => {
                let outcome = clip(&raw, polygon, &request.name)?;
                warnings.extend(outcome.warnings);
                outcome.raster
            }
            None => {
                // Bounding box as-is: no mask, no crop, so the artifact
                // shape matches the requested bounds even around gaps.
                let mut passthrough = raw;
                passthrough.stage = Stage::Clipped;
                passthrough
            }
        };

        let resampled = resample(&clipped, self.config.target_max_pixels, &request.name)?;
        warnings.extend(resampled.warnings);

        if !gaps.is_empty() {
            warnings.push(QualityWarning::MissingCells {
                cells: gaps.clone(),
            });
        }

        let gap_names: Vec<String> = gaps.iter().map(|c| c.to_string()).collect();
        let artifact = ExportArtifact::new(
            &resampled.raster,
            request.name.as_str(),
            resampled.stats,
            &request.dataset,
            request.resolution.tag(),
            gap_names,
            &warnings,
        );

        info!(
            width = artifact.width,
            height = artifact.height,
            gaps = gaps.len(),
            warnings = warnings.len(),
            "region export complete"
        );

        Ok(ExportOutcome {
            artifact,
            gaps,
            warnings,
        })
    }
}
