//! Downsampling to a pixel budget with latitude distortion correction.
//!
//! One degree of longitude spans cos(latitude) times the ground distance
//! of one degree of latitude, so an equirectangular raster drawn square
//! stretches east-west everywhere off the equator. The corrected output
//! scales pixel width by cos(center latitude) relative to pixel height,
//! making the exported width:height ratio approximate true ground aspect.
//! The correction is a continuous function of latitude and is applied
//! unconditionally at every latitude; gating it behind a threshold would
//! snap aspect discontinuously at the gate.

use rayon::prelude::*;
use tracing::{debug, warn};

use dem_common::{Raster, RasterStats, Stage};

use crate::error::{PipelineError, PipelineResult, QualityWarning};

/// Maximum tolerated relative deviation between the realized aspect ratio
/// and the cos(latitude)-corrected expectation.
pub const ASPECT_TOLERANCE: f64 = 0.15;

/// Result of the resample stage.
#[derive(Debug, Clone)]
pub struct ResampleOutcome {
    pub raster: Raster,
    pub stats: RasterStats,
    pub warnings: Vec<QualityWarning>,
}

/// Downsample a clipped raster so its larger dimension fits the pixel
/// budget, correcting aspect for latitude.
///
/// Uses area averaging: each output pixel is the mean of the valid
/// samples in its source window, and becomes nodata only when the whole
/// window is nodata. Nearest-neighbor would alias ridgelines and is never
/// used here.
pub fn resample(
    clipped: &Raster,
    target_max_pixels: usize,
    region: &str,
) -> PipelineResult<ResampleOutcome> {
    let cos_lat = clipped.bounds.center_lat().to_radians().cos();

    // Desired output shape before the budget: height keeps the source
    // pixel count, width shrinks by cos(latitude).
    let desired_w = clipped.width as f64 * cos_lat;
    let desired_h = clipped.height as f64;
    let scale = (target_max_pixels as f64 / desired_w.max(desired_h)).min(1.0);

    let out_w = ((desired_w * scale).round() as usize).max(1);
    let out_h = ((desired_h * scale).round() as usize).max(1);

    let mut data = vec![f32::NAN; out_w * out_h];
    let src = &clipped.data;
    let (src_w, src_h) = (clipped.width, clipped.height);

    data.par_chunks_mut(out_w).enumerate().for_each(|(row, out_row)| {
        let y0 = row as f64 * src_h as f64 / out_h as f64;
        let y1 = (row + 1) as f64 * src_h as f64 / out_h as f64;

        for (col, out) in out_row.iter_mut().enumerate() {
            let x0 = col as f64 * src_w as f64 / out_w as f64;
            let x1 = (col + 1) as f64 * src_w as f64 / out_w as f64;

            *out = window_mean(src, src_w, src_h, x0, x1, y0, y1);
        }
    });

    let raster = Raster {
        data,
        width: out_w,
        height: out_h,
        bounds: clipped.bounds,
        stage: Stage::Processed,
        processing_version: clipped.processing_version,
    };

    let stats = RasterStats::of(&raster).ok_or_else(|| PipelineError::EmptyResample {
        region: region.to_string(),
    })?;

    let mut warnings = Vec::new();
    let expected = desired_w / desired_h;
    let realized = out_w as f64 / out_h as f64;
    if (realized / expected - 1.0).abs() > ASPECT_TOLERANCE {
        warn!(
            region,
            expected,
            realized,
            "resampled aspect deviates beyond tolerance"
        );
        warnings.push(QualityWarning::DistortionMismatch { expected, realized });
    }

    debug!(
        region,
        src_w,
        src_h,
        out_w,
        out_h,
        cos_lat,
        "resampled region"
    );

    Ok(ResampleOutcome {
        raster,
        stats,
        warnings,
    })
}

/// Area-weighted mean of the valid samples in the fractional source
/// window `[x0, x1) x [y0, y1)`. NaN when the window holds no valid
/// sample.
fn window_mean(src: &[f32], src_w: usize, src_h: usize, x0: f64, x1: f64, y0: f64, y1: f64) -> f32 {
    let col_start = x0.floor() as usize;
    let col_end = (x1.ceil() as usize).min(src_w);
    let row_start = y0.floor() as usize;
    let row_end = (y1.ceil() as usize).min(src_h);

    let mut sum = 0.0f64;
    let mut weight = 0.0f64;

    for row in row_start..row_end {
        let wy = overlap(row as f64, (row + 1) as f64, y0, y1);
        if wy <= 0.0 {
            continue;
        }
        for col in col_start..col_end {
            let v = src[row * src_w + col];
            if v.is_nan() {
                continue;
            }
            let wx = overlap(col as f64, (col + 1) as f64, x0, x1);
            if wx <= 0.0 {
                continue;
            }
            sum += v as f64 * wx * wy;
            weight += wx * wy;
        }
    }

    if weight > 0.0 {
        (sum / weight) as f32
    } else {
        f32::NAN
    }
}

/// Length of the overlap between `[a0, a1)` and `[b0, b1)`.
fn overlap(a0: f64, a1: f64, b0: f64, b1: f64) -> f64 {
    (a1.min(b1) - a0.max(b0)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dem_common::GeoBounds;

    fn raster(width: usize, height: usize, bounds: GeoBounds, value: f32) -> Raster {
        Raster::filled(width, height, bounds, value, Stage::Clipped, 1)
    }

    #[test]
    fn test_aspect_correction_at_60n() {
        // 10 x 10 degrees centered at 60N: corrected ratio must be within
        // 5% of cos(60) = 0.5.
        let bounds = GeoBounds::new(10.0, 55.0, 20.0, 65.0).unwrap();
        let clipped = raster(200, 200, bounds, 100.0);

        let outcome = resample(&clipped, 100, "synthetic").unwrap();
        let ratio = outcome.raster.width as f64 / outcome.raster.height as f64;
        assert!(
            (ratio - 0.5).abs() / 0.5 < 0.05,
            "ratio {ratio} not within 5% of 0.5"
        );
        assert_eq!(outcome.raster.height, 100);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_equator_keeps_angular_aspect() {
        let bounds = GeoBounds::new(-5.0, -5.0, 5.0, 5.0).unwrap();
        let clipped = raster(100, 100, bounds, 100.0);

        let outcome = resample(&clipped, 50, "equator").unwrap();
        assert_eq!(outcome.raster.width, 50);
        assert_eq!(outcome.raster.height, 50);
    }

    #[test]
    fn test_correction_is_continuous_in_latitude() {
        // Neighboring latitudes produce neighboring aspect ratios; there
        // is no threshold where the correction switches on.
        let mut previous: Option<f64> = None;
        for lat in [30.0, 40.0, 44.0, 45.0, 46.0, 50.0, 60.0] {
            let bounds = GeoBounds::new(0.0, lat - 2.0, 4.0, lat + 2.0).unwrap();
            let clipped = raster(400, 400, bounds, 10.0);
            let outcome = resample(&clipped, 200, "band").unwrap();
            let ratio = outcome.raster.width as f64 / outcome.raster.height as f64;

            let expected = (lat as f64).to_radians().cos();
            assert!((ratio - expected).abs() < 0.02, "lat {lat}: {ratio} vs {expected}");
            if let Some(prev) = previous {
                assert!(ratio < prev);
            }
            previous = Some(ratio);
        }
    }

    #[test]
    fn test_area_average_means_values() {
        // A 4x4 checkerboard of 0 and 100 averages to 50 at 2x2.
        let bounds = GeoBounds::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let mut clipped = raster(4, 4, bounds, 0.0);
        for row in 0..4 {
            for col in 0..4 {
                if (row + col) % 2 == 0 {
                    clipped.data[row * 4 + col] = 100.0;
                }
            }
        }

        let outcome = resample(&clipped, 2, "checker").unwrap();
        assert_eq!(outcome.raster.width, 2);
        for &v in &outcome.raster.data {
            assert!((v - 50.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_nodata_propagation() {
        // A destination pixel is nodata only when its whole window is;
        // partial windows average the available samples.
        let bounds = GeoBounds::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let mut clipped = raster(4, 4, bounds, 100.0);
        // Top-left 2x2 window fully nodata, top-right half nodata.
        for &(col, row) in &[(0, 0), (1, 0), (0, 1), (1, 1), (2, 0), (3, 0)] {
            clipped.data[row * 4 + col] = f32::NAN;
        }

        let outcome = resample(&clipped, 2, "holes").unwrap();
        let r = &outcome.raster;
        assert!(r.get(0, 0).unwrap().is_nan());
        assert_eq!(r.get(1, 0), Some(100.0));
        assert_eq!(r.get(0, 1), Some(100.0));
    }

    #[test]
    fn test_never_upscales() {
        let bounds = GeoBounds::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let clipped = raster(10, 10, bounds, 1.0);
        let outcome = resample(&clipped, 500, "small").unwrap();
        assert_eq!(outcome.raster.width, 10);
        assert_eq!(outcome.raster.height, 10);
    }

    #[test]
    fn test_stats() {
        let bounds = GeoBounds::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let mut clipped = raster(4, 4, bounds, 200.0);
        clipped.data[0] = 100.0;
        clipped.data[15] = 300.0;

        let outcome = resample(&clipped, 4, "stats").unwrap();
        assert_eq!(outcome.stats.min, 100.0);
        assert_eq!(outcome.stats.max, 300.0);
        assert!((outcome.stats.mean - 200.0).abs() < 1.0);
    }

    #[test]
    fn test_all_nodata_aborts() {
        let bounds = GeoBounds::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let clipped = Raster::nodata(4, 4, bounds, Stage::Clipped, 1);
        let err = resample(&clipped, 2, "void").unwrap_err();
        assert_eq!(err.stage(), "resample");
    }
}
