//! In-memory raster values flowing through the pipeline.

use serde::{Deserialize, Serialize};

use crate::bounds::GeoBounds;

/// Pipeline stage of a raster value.
///
/// Carried explicitly on every raster rather than inferred from file or
/// variable naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Mosaicked tiles, uncropped, gaps filled with nodata.
    Raw,
    /// Masked to a boundary and cropped to the valid extent.
    Clipped,
    /// Downsampled and aspect-corrected, ready for export.
    Processed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Raw => write!(f, "raw"),
            Stage::Clipped => write!(f, "clipped"),
            Stage::Processed => write!(f, "processed"),
        }
    }
}

/// A single-band raster over geographic bounds.
///
/// Samples are row-major with row 0 at the northern edge. Nodata is NaN
/// in memory; it only becomes an explicit `null` at export time.
#[derive(Debug, Clone)]
pub struct Raster {
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
    pub bounds: GeoBounds,
    pub stage: Stage,
    pub processing_version: u32,
}

impl Raster {
    /// Create a raster filled with a constant value.
    pub fn filled(
        width: usize,
        height: usize,
        bounds: GeoBounds,
        value: f32,
        stage: Stage,
        processing_version: u32,
    ) -> Self {
        Self {
            data: vec![value; width * height],
            width,
            height,
            bounds,
            stage,
            processing_version,
        }
    }

    /// Create a raster with every sample set to nodata.
    pub fn nodata(
        width: usize,
        height: usize,
        bounds: GeoBounds,
        stage: Stage,
        processing_version: u32,
    ) -> Self {
        Self::filled(width, height, bounds, f32::NAN, stage, processing_version)
    }

    /// Angular pixel width in degrees of longitude.
    pub fn dx(&self) -> f64 {
        self.bounds.width() / self.width as f64
    }

    /// Angular pixel height in degrees of latitude.
    pub fn dy(&self) -> f64 {
        self.bounds.height() / self.height as f64
    }

    /// Sample at a grid position, or None outside the raster.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    /// Overwrite a sample; out-of-range positions are ignored.
    pub fn set(&mut self, col: usize, row: usize, value: f32) {
        if col < self.width && row < self.height {
            self.data[row * self.width + col] = value;
        }
    }

    /// Geographic center of a pixel as `(lon, lat)`.
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        let lon = self.bounds.west + (col as f64 + 0.5) * self.dx();
        let lat = self.bounds.north - (row as f64 + 0.5) * self.dy();
        (lon, lat)
    }

    /// Number of valid (non-nodata) samples.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    /// Whether the raster holds at least one valid sample.
    pub fn has_valid(&self) -> bool {
        self.data.iter().any(|v| !v.is_nan())
    }
}

/// Summary statistics over valid samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
}

impl RasterStats {
    /// Compute statistics over valid samples, or None when every sample is
    /// nodata.
    pub fn of(raster: &Raster) -> Option<Self> {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut count = 0usize;

        for &v in &raster.data {
            if v.is_nan() {
                continue;
            }
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
            count += 1;
        }

        if count == 0 {
            return None;
        }
        Some(Self {
            min,
            max,
            mean: (sum / count as f64) as f32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> GeoBounds {
        GeoBounds::new(-105.0, 40.0, -104.0, 41.0).unwrap()
    }

    #[test]
    fn test_get_set() {
        let mut r = Raster::nodata(4, 3, bounds(), Stage::Raw, 1);
        assert!(r.get(0, 0).unwrap().is_nan());
        r.set(2, 1, 1500.0);
        assert_eq!(r.get(2, 1), Some(1500.0));
        assert_eq!(r.get(4, 0), None);
        assert_eq!(r.get(0, 3), None);
    }

    #[test]
    fn test_pixel_geometry() {
        let r = Raster::nodata(10, 10, bounds(), Stage::Raw, 1);
        assert!((r.dx() - 0.1).abs() < 1e-12);
        assert!((r.dy() - 0.1).abs() < 1e-12);

        // Row 0 sits at the north edge.
        let (lon, lat) = r.pixel_center(0, 0);
        assert!((lon - -104.95).abs() < 1e-9);
        assert!((lat - 40.95).abs() < 1e-9);
    }

    #[test]
    fn test_stats_skip_nodata() {
        let mut r = Raster::filled(2, 2, bounds(), 100.0, Stage::Raw, 1);
        r.set(0, 0, f32::NAN);
        r.set(1, 0, 400.0);

        let stats = RasterStats::of(&r).unwrap();
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 400.0);
        assert_eq!(stats.mean, 200.0);

        assert_eq!(r.valid_count(), 3);
    }

    #[test]
    fn test_stats_all_nodata() {
        let r = Raster::nodata(3, 3, bounds(), Stage::Raw, 1);
        assert!(RasterStats::of(&r).is_none());
        assert!(!r.has_valid());
    }
}
