//! Region assembly pipeline for elevation rasters.
//!
//! Turns a named geographic region into a display-ready, aspect-corrected
//! elevation grid, reusing a grid-aligned tile cache between runs:
//!
//! ```text
//! RegionRequest
//!      │
//!      ▼
//! cells_covering(bounds)          1-degree grid snap
//!      │
//!      ├─► TileStore::get         validated cache hits
//!      │
//!      ├─► DownloadPlanner        chunked fetches fill the misses,
//!      │                          per-cell failures become gaps
//!      ▼
//! mosaic ─► clip ─► resample ─► export
//!  (Raw)   (Clipped) (Processed)  (JSON + gzip artifact)
//! ```
//!
//! Every stage is a pure transform over explicit inputs; the injected tile
//! store is the only shared mutable state.

pub mod assembler;
pub mod boundary;
pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod planner;
pub mod provider;
pub mod resample;

pub use assembler::{clip, mosaic, ClipOutcome};
pub use boundary::{BoundarySource, StaticBoundarySource};
pub use config::{PipelineConfig, PROCESSING_VERSION};
pub use error::{PipelineError, PipelineResult, QualityWarning};
pub use export::{ExportArtifact, ExportBounds, Provenance, FORMAT_VERSION};
pub use pipeline::{ExportOutcome, RegionPipeline, RegionRequest};
pub use planner::{max_chunk_degrees, plan_chunks, CancelToken, DownloadPlanner, GapReport};
pub use provider::{ElevationProvider, FetchError, FetchedRaster};
pub use resample::{resample, ResampleOutcome, ASPECT_TOLERANCE};
