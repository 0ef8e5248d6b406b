//! Scriptable elevation providers for exercising the download path.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use dem_common::{GeoBounds, Resolution};
use region_pipeline::{ElevationProvider, FetchError, FetchedRaster};

/// An in-memory elevation provider sampling a synthetic world surface.
///
/// Supports the failure modes the planner has to survive:
/// - permanent failures for requests touching configured areas
/// - a configurable number of transient failures before success
/// - a coverage extent that truncates responses at its edge
pub struct ScriptedProvider {
    surface: fn(f64, f64) -> f32,
    coverage: Option<GeoBounds>,
    fail_areas: Vec<GeoBounds>,
    transient_left: AtomicU32,
    calls: AtomicU32,
}

impl ScriptedProvider {
    pub fn new(surface: fn(f64, f64) -> f32) -> Self {
        Self {
            surface,
            coverage: None,
            fail_areas: Vec::new(),
            transient_left: AtomicU32::new(0),
            calls: AtomicU32::new(0),
        }
    }

    /// Limit the provider's coverage; requests beyond the edge come back
    /// truncated, requests fully outside fail with `NoCoverage`.
    pub fn with_coverage(mut self, coverage: GeoBounds) -> Self {
        self.coverage = Some(coverage);
        self
    }

    /// Any request intersecting `area` fails permanently.
    pub fn failing_over(mut self, area: GeoBounds) -> Self {
        self.fail_areas.push(area);
        self
    }

    /// The first `n` fetches fail with a retryable error.
    pub fn with_transient_failures(mut self, n: u32) -> Self {
        self.transient_left = AtomicU32::new(n);
        self
    }

    /// Total fetch calls observed.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ElevationProvider for ScriptedProvider {
    async fn fetch(
        &self,
        bounds: GeoBounds,
        _dataset: &str,
        resolution: Resolution,
    ) -> Result<FetchedRaster, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self
            .transient_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(FetchError::Request("scripted transient failure".to_string()));
        }

        if self.fail_areas.iter().any(|area| area.intersects(&bounds)) {
            return Err(FetchError::NoCoverage(bounds.to_string()));
        }

        let effective = match self.coverage {
            Some(coverage) => coverage
                .intersection(&bounds)
                .ok_or_else(|| FetchError::NoCoverage(bounds.to_string()))?,
            None => bounds,
        };

        let ppd = resolution.pixels_per_degree() as f64;
        let width = ((effective.width() * ppd).round() as usize).max(1);
        let height = ((effective.height() * ppd).round() as usize).max(1);

        let mut samples = Vec::with_capacity(width * height);
        let dx = effective.width() / width as f64;
        let dy = effective.height() / height as f64;
        for row in 0..height {
            let lat = effective.north - (row as f64 + 0.5) * dy;
            for col in 0..width {
                let lon = effective.west + (col as f64 + 0.5) * dx;
                samples.push((self.surface)(lon, lat));
            }
        }

        Ok(FetchedRaster {
            bounds: effective,
            width,
            height,
            samples,
        })
    }
}
