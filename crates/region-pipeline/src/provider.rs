//! The elevation provider boundary.
//!
//! Remote elevation services live behind this trait; the pipeline never
//! sees transport details. A provider accepts a bounding box, dataset tag,
//! and resolution and returns a single-band geographic raster or a fetch
//! error.

use async_trait::async_trait;
use thiserror::Error;

use dem_common::{GeoBounds, Resolution};

/// A provider-side fetch failure for one chunk request.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Transient network or provider failure; retried with backoff.
    #[error("provider request failed: {0}")]
    Request(String),

    /// The provider did not answer in time; retried with backoff.
    #[error("provider request timed out")]
    Timeout,

    /// The provider has no data for the requested area; not retried.
    #[error("no provider coverage for {0}")]
    NoCoverage(String),

    /// The response could not be interpreted as a raster; not retried.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Request(_) | FetchError::Timeout)
    }
}

/// A raster returned by a provider for one chunk request.
///
/// Row-major samples, row 0 at the north edge, NaN for nodata. `bounds`
/// are the bounds actually covered, which may be smaller than requested
/// when the request overlaps the edge of the provider's coverage.
#[derive(Debug, Clone)]
pub struct FetchedRaster {
    pub bounds: GeoBounds,
    pub width: usize,
    pub height: usize,
    pub samples: Vec<f32>,
}

impl FetchedRaster {
    /// Angular pixel width in degrees.
    pub fn dx(&self) -> f64 {
        self.bounds.width() / self.width as f64
    }

    /// Angular pixel height in degrees.
    pub fn dy(&self) -> f64 {
        self.bounds.height() / self.height as f64
    }
}

/// A remote elevation data source.
#[async_trait]
pub trait ElevationProvider: Send + Sync {
    /// Fetch a single-band raster covering `bounds` at the given
    /// resolution.
    async fn fetch(
        &self,
        bounds: GeoBounds,
        dataset: &str,
        resolution: Resolution,
    ) -> Result<FetchedRaster, FetchError>;
}
