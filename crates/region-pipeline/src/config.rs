//! Pipeline configuration.

use std::time::Duration;

/// Current processing version.
///
/// Bumped whenever tile derivation changes in a way that invalidates
/// cached tiles; `FsTileStore::purge_below_version` clears older entries.
pub const PROCESSING_VERSION: u32 = 2;

/// Configuration for a region pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on the larger dimension of the exported grid.
    pub target_max_pixels: usize,

    /// Retry attempts per chunk download after the first failure.
    pub max_retries: u32,

    /// First retry delay; doubles each retry.
    pub initial_retry_delay: Duration,

    /// Ceiling for the exponential backoff.
    pub max_retry_delay: Duration,

    /// Concurrent chunk downloads. Providers rate-limit server-side, so
    /// excess concurrency is throttled here instead of triggering
    /// provider errors.
    pub concurrent_downloads: usize,

    /// Processing version stamped on derived tiles and exports.
    pub processing_version: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_max_pixels: 1_000,
            max_retries: 3,
            initial_retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(30),
            concurrent_downloads: 4,
            processing_version: PROCESSING_VERSION,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("TERRAIN_TARGET_MAX_PIXELS") {
            if let Ok(px) = val.parse() {
                config.target_max_pixels = px;
            }
        }

        if let Ok(val) = std::env::var("TERRAIN_MAX_RETRIES") {
            if let Ok(n) = val.parse() {
                config.max_retries = n;
            }
        }

        if let Ok(val) = std::env::var("TERRAIN_RETRY_DELAY_MS") {
            if let Ok(ms) = val.parse() {
                config.initial_retry_delay = Duration::from_millis(ms);
            }
        }

        if let Ok(val) = std::env::var("TERRAIN_CONCURRENT_DOWNLOADS") {
            if let Ok(n) = val.parse() {
                config.concurrent_downloads = n;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.target_max_pixels == 0 {
            return Err("target_max_pixels must be > 0".to_string());
        }
        if self.concurrent_downloads == 0 {
            return Err("concurrent_downloads must be > 0".to_string());
        }
        Ok(())
    }
}
