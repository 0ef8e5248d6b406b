//! Versioned export artifact: the terminal JSON value plus its gzip twin.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tracing::info;

use dem_common::{Raster, RasterStats};

use crate::error::{PipelineError, PipelineResult, QualityWarning};

/// Export format version.
///
/// Must be bumped whenever the serialization shape changes so consumers
/// can detect stale artifacts.
///
/// History:
/// - 1: initial shape
/// - 2: stats block added
/// - 3: provenance block with gaps and warnings
pub const FORMAT_VERSION: u32 = 3;

/// Geographic bounds in the export schema's field naming.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportBounds {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// How an artifact came to be: inputs, versions, and anything that makes
/// a partial success distinguishable from a full one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub dataset: String,
    pub resolution: String,
    pub processing_version: u32,
    /// RFC 3339 generation timestamp; the only field expected to differ
    /// between two runs over identical inputs.
    pub generated_at: String,
    /// Canonical names of cells left nodata by permanent fetch failures.
    pub gaps: Vec<String>,
    /// Rendered quality warnings from the run.
    pub warnings: Vec<String>,
}

/// The display-ready export value.
///
/// Nodata samples are an explicit `null`, never a numeric sentinel, so
/// downstream consumers cannot misread a sentinel as terrain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub version: u32,
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub bounds: ExportBounds,
    pub elevation: Vec<Vec<Option<f32>>>,
    pub stats: RasterStats,
    pub source: String,
    pub provenance: Provenance,
}

impl ExportArtifact {
    /// Build an artifact from a processed raster.
    pub fn new(
        processed: &Raster,
        name: impl Into<String>,
        stats: RasterStats,
        dataset: &str,
        resolution_tag: &str,
        gaps: Vec<String>,
        warnings: &[QualityWarning],
    ) -> Self {
        let elevation = processed
            .data
            .chunks(processed.width)
            .map(|row| {
                row.iter()
                    .map(|&v| if v.is_nan() { None } else { Some(v) })
                    .collect()
            })
            .collect();

        Self {
            version: FORMAT_VERSION,
            name: name.into(),
            width: processed.width,
            height: processed.height,
            bounds: ExportBounds {
                left: processed.bounds.west,
                right: processed.bounds.east,
                top: processed.bounds.north,
                bottom: processed.bounds.south,
            },
            elevation,
            stats,
            source: format!("{dataset}_{resolution_tag}"),
            provenance: Provenance {
                dataset: dataset.to_string(),
                resolution: resolution_tag.to_string(),
                processing_version: processed.processing_version,
                generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                gaps,
                warnings: warnings.iter().map(|w| w.to_string()).collect(),
            },
        }
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> PipelineResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| PipelineError::Serialize(e.to_string()))
    }

    /// Serialize to gzip-compressed JSON bytes.
    ///
    /// Compression is a pure transform: decompressing yields exactly the
    /// bytes of [`ExportArtifact::to_json`].
    pub fn to_json_gz(&self) -> PipelineResult<Vec<u8>> {
        let json = self.to_json()?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        Ok(encoder.finish()?)
    }

    /// Parse an artifact from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> PipelineResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| PipelineError::Serialize(e.to_string()))
    }

    /// Parse an artifact from gzip-compressed JSON bytes.
    pub fn from_json_gz(bytes: &[u8]) -> PipelineResult<Self> {
        let mut json = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut json)?;
        Self::from_json(&json)
    }

    /// Write `{name}.json` and `{name}.json.gz` under `dir`, replacing any
    /// previous export for the region.
    pub async fn write_files(&self, dir: &Path) -> PipelineResult<(PathBuf, PathBuf)> {
        tokio::fs::create_dir_all(dir).await?;

        let json_path = dir.join(format!("{}.json", self.name));
        let gz_path = dir.join(format!("{}.json.gz", self.name));

        tokio::fs::write(&json_path, self.to_json()?).await?;
        tokio::fs::write(&gz_path, self.to_json_gz()?).await?;

        info!(
            region = %self.name,
            json = %json_path.display(),
            gz = %gz_path.display(),
            "wrote export artifact"
        );
        Ok((json_path, gz_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dem_common::{GeoBounds, Stage};

    fn processed() -> Raster {
        let bounds = GeoBounds::new(-105.0, 40.0, -104.0, 41.0).unwrap();
        let mut r = Raster::filled(3, 2, bounds, 1200.0, Stage::Processed, 2);
        r.set(1, 0, f32::NAN);
        r
    }

    fn artifact() -> ExportArtifact {
        let raster = processed();
        let stats = RasterStats::of(&raster).unwrap();
        ExportArtifact::new(
            &raster,
            "boulder",
            stats,
            "srtm",
            "30m",
            vec!["N40_W104".to_string()],
            &[],
        )
    }

    #[test]
    fn test_schema_fields() {
        let artifact = artifact();
        let json: serde_json::Value =
            serde_json::from_slice(&artifact.to_json().unwrap()).unwrap();

        assert_eq!(json["version"], FORMAT_VERSION);
        assert_eq!(json["name"], "boulder");
        assert_eq!(json["width"], 3);
        assert_eq!(json["height"], 2);
        assert_eq!(json["bounds"]["left"], -105.0);
        assert_eq!(json["bounds"]["top"], 41.0);
        assert_eq!(json["source"], "srtm_30m");
        assert_eq!(json["provenance"]["gaps"][0], "N40_W104");

        // Nodata is an explicit null, never a sentinel number.
        assert!(json["elevation"][0][1].is_null());
        assert_eq!(json["elevation"][0][0], 1200.0);
    }

    #[test]
    fn test_gzip_round_trip_is_identity() {
        let artifact = artifact();
        let json = artifact.to_json().unwrap();
        let gz = artifact.to_json_gz().unwrap();
        assert!(gz.len() < json.len());

        let mut decompressed = Vec::new();
        GzDecoder::new(gz.as_slice())
            .read_to_end(&mut decompressed)
            .unwrap();
        assert_eq!(decompressed, json);

        let decoded = ExportArtifact::from_json_gz(&gz).unwrap();
        assert_eq!(decoded, artifact);
    }

    #[tokio::test]
    async fn test_write_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let artifact = artifact();
        let (json_path, gz_path) = artifact.write_files(dir.path()).await.unwrap();

        assert!(json_path.ends_with("boulder.json"));
        assert!(gz_path.ends_with("boulder.json.gz"));

        let from_disk = ExportArtifact::from_json(&std::fs::read(&json_path).unwrap()).unwrap();
        assert_eq!(from_disk, artifact);
    }
}
