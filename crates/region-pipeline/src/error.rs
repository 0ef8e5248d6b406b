//! Pipeline errors and quality warnings.
//!
//! Tile-level failures never abort a region: fetch failures become gaps
//! and validation failures become cache misses. Only pipeline-level
//! failures (an unresolvable boundary, zero valid samples) abort the
//! run, and every abort names the stage that failed. Data-quality
//! findings that do not block export travel as [`QualityWarning`]s
//! attached to provenance.

use thiserror::Error;

use dem_common::{GeoError, GridCell};
use tile_store::StoreError;

/// Result type alias using PipelineError.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// A fatal, run-aborting pipeline failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid region request: {0}")]
    InvalidRequest(#[from] GeoError),

    #[error("region '{region}' covers no grid cells after sliver discard")]
    NoCells { region: String },

    #[error("boundary for region '{region}' could not be resolved: {reason}")]
    Boundary { region: String, reason: String },

    #[error("tile store failure: {0}")]
    Store(#[from] StoreError),

    #[error("clip left zero valid samples for region '{region}'")]
    EmptyClip { region: String },

    #[error("resample produced zero valid samples for region '{region}'")]
    EmptyResample { region: String },

    #[error("failed to serialize export artifact: {0}")]
    Serialize(String),

    #[error("failed to write export artifact: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// The pipeline stage this failure belongs to, for operator-facing
    /// reports.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::InvalidRequest(_) | PipelineError::NoCells { .. } => "addressing",
            PipelineError::Boundary { .. } => "boundary",
            PipelineError::Store(_) => "cache",
            PipelineError::EmptyClip { .. } => "clip",
            PipelineError::EmptyResample { .. } => "resample",
            PipelineError::Serialize(_) | PipelineError::Io(_) => "export",
        }
    }
}

/// A non-fatal data-quality finding, recorded in export provenance.
#[derive(Debug, Clone, PartialEq)]
pub enum QualityWarning {
    /// Cells that stayed missing after download retries; their pixels are
    /// nodata in the artifact.
    MissingCells { cells: Vec<GridCell> },

    /// An all-nodata border row/column survived the post-clip crop. Left
    /// in place: it may reflect a genuinely sliver-shaped boundary.
    ClipDefect { side: &'static str },

    /// The resampled aspect ratio deviates from the cos(latitude)
    /// expectation beyond tolerance.
    DistortionMismatch { expected: f64, realized: f64 },
}

impl std::fmt::Display for QualityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityWarning::MissingCells { cells } => {
                let names: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
                write!(f, "{} cell(s) unavailable: {}", cells.len(), names.join(", "))
            }
            QualityWarning::ClipDefect { side } => {
                write!(f, "all-nodata {side} border survived the post-clip crop")
            }
            QualityWarning::DistortionMismatch { expected, realized } => write!(
                f,
                "aspect ratio {realized:.4} deviates from corrected expectation {expected:.4}"
            ),
        }
    }
}
