//! Region assembly: mosaicking cached tiles and clipping to a boundary.

use tracing::{debug, warn};

use dem_common::{GeoBounds, Polygon, Raster, Resolution, Stage};
use tile_store::Tile;

use crate::error::{PipelineError, PipelineResult, QualityWarning};

/// Mosaic tiles into a single raw raster covering `bounds`.
///
/// Tiles never overlap by construction, so compositing is a plain
/// overwrite with no blending. Cells with no tile stay nodata; the caller
/// records those gaps.
pub fn mosaic(
    tiles: &[Tile],
    bounds: GeoBounds,
    resolution: Resolution,
    processing_version: u32,
) -> Raster {
    let ppd = resolution.pixels_per_degree() as f64;
    let width = ((bounds.width() * ppd).round() as usize).max(1);
    let height = ((bounds.height() * ppd).round() as usize).max(1);

    let mut raster = Raster::nodata(width, height, bounds, Stage::Raw, processing_version);
    let dx = raster.dx();
    let dy = raster.dy();

    for tile in tiles {
        if !tile.bounds.intersects(&bounds) {
            continue;
        }

        let col0 = ((tile.bounds.west - bounds.west) / dx).round() as isize;
        let row0 = ((bounds.north - tile.bounds.north) / dy).round() as isize;

        for tile_row in 0..tile.height {
            let out_row = row0 + tile_row as isize;
            if out_row < 0 || out_row as usize >= height {
                continue;
            }
            for tile_col in 0..tile.width {
                let out_col = col0 + tile_col as isize;
                if out_col < 0 || out_col as usize >= width {
                    continue;
                }
                raster.data[out_row as usize * width + out_col as usize] =
                    tile.samples[tile_row * tile.width + tile_col];
            }
        }
    }

    debug!(
        tiles = tiles.len(),
        width, height,
        valid = raster.valid_count(),
        "mosaicked region"
    );
    raster
}

/// Result of clipping a raster to a boundary polygon.
#[derive(Debug, Clone)]
pub struct ClipOutcome {
    pub raster: Raster,
    pub warnings: Vec<QualityWarning>,
}

/// Mask a raster to a boundary polygon and crop to the minimal rectangle
/// still holding valid data.
///
/// Every sample whose pixel center falls outside the polygon becomes
/// nodata. The crop is mandatory; a region left with zero valid samples
/// aborts the run. After cropping, each border row and column must hold
/// at least one valid sample; a violation is reported as a
/// [`QualityWarning::ClipDefect`] (a sliver-shaped boundary can cause it
/// legitimately, so it is never auto-corrected).
pub fn clip(raster: &Raster, boundary: &Polygon, region: &str) -> PipelineResult<ClipOutcome> {
    let mut masked = raster.clone();
    for row in 0..masked.height {
        for col in 0..masked.width {
            let (lon, lat) = masked.pixel_center(col, row);
            if !boundary.contains(lon, lat) {
                masked.data[row * masked.width + col] = f32::NAN;
            }
        }
    }

    let cropped = crop_to_valid(&masked, region)?;

    let mut warnings = Vec::new();
    for side in border_defects(&cropped) {
        warn!(region, side, "all-nodata border survived the crop");
        warnings.push(QualityWarning::ClipDefect { side });
    }

    debug!(
        region,
        width = cropped.width,
        height = cropped.height,
        valid = cropped.valid_count(),
        "clipped region"
    );

    Ok(ClipOutcome {
        raster: cropped,
        warnings,
    })
}

/// Crop to the minimal bounding rectangle containing valid samples.
fn crop_to_valid(raster: &Raster, region: &str) -> PipelineResult<Raster> {
    let mut min_row = raster.height;
    let mut max_row = 0usize;
    let mut min_col = raster.width;
    let mut max_col = 0usize;
    let mut any = false;

    for row in 0..raster.height {
        for col in 0..raster.width {
            if raster.data[row * raster.width + col].is_nan() {
                continue;
            }
            any = true;
            min_row = min_row.min(row);
            max_row = max_row.max(row);
            min_col = min_col.min(col);
            max_col = max_col.max(col);
        }
    }

    if !any {
        return Err(PipelineError::EmptyClip {
            region: region.to_string(),
        });
    }

    let width = max_col - min_col + 1;
    let height = max_row - min_row + 1;
    let mut data = Vec::with_capacity(width * height);
    for row in min_row..=max_row {
        let start = row * raster.width + min_col;
        data.extend_from_slice(&raster.data[start..start + width]);
    }

    let dx = raster.dx();
    let dy = raster.dy();
    let bounds = GeoBounds {
        west: raster.bounds.west + min_col as f64 * dx,
        east: raster.bounds.west + (max_col + 1) as f64 * dx,
        north: raster.bounds.north - min_row as f64 * dy,
        south: raster.bounds.north - (max_row + 1) as f64 * dy,
    };

    Ok(Raster {
        data,
        width,
        height,
        bounds,
        stage: Stage::Clipped,
        processing_version: raster.processing_version,
    })
}

/// Border rows/columns with no valid sample, by side name.
fn border_defects(raster: &Raster) -> Vec<&'static str> {
    let mut sides = Vec::new();
    let row_valid = |row: usize| {
        (0..raster.width).any(|col| !raster.data[row * raster.width + col].is_nan())
    };
    let col_valid = |col: usize| {
        (0..raster.height).any(|row| !raster.data[row * raster.width + col].is_nan())
    };

    if !row_valid(0) {
        sides.push("north");
    }
    if raster.height > 1 && !row_valid(raster.height - 1) {
        sides.push("south");
    }
    if !col_valid(0) {
        sides.push("west");
    }
    if raster.width > 1 && !col_valid(raster.width - 1) {
        sides.push("east");
    }
    sides
}
