//! Error types for geographic primitives.

use thiserror::Error;

/// Result type alias using GeoError.
pub type GeoResult<T> = Result<T, GeoError>;

/// Errors from geographic types and parsing.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("invalid tile filename: {0}")]
    InvalidFilename(String),

    #[error("unknown resolution tag: {0}")]
    UnknownResolution(String),

    #[error("invalid polygon: {0}")]
    InvalidPolygon(String),

    #[error("invalid adjacency table: {0}")]
    InvalidAdjacency(String),
}
