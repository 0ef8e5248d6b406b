//! Error types for the tile store.

use thiserror::Error;

/// Result type alias using StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from tile storage and the on-disk container format.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt tile file: {0}")]
    Corrupt(String),

    #[error("tile validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// A cache-entry check failure.
///
/// A stored tile failing any of these checks is treated as a cache miss
/// and becomes eligible for re-derivation; it is never served as valid.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("coordinate reference '{found}' is not the expected geographic reference")]
    WrongCrs { found: String },

    #[error("bounds {found} are neither grid-aligned nor a valid partial fragment of cell {cell}")]
    Misaligned { cell: String, found: String },

    #[error(
        "ground resolution {meters:.1} m/px outside the {lo:.1}-{hi:.1} m band for tag '{tag}'"
    )]
    GroundResolution {
        tag: &'static str,
        meters: f64,
        lo: f64,
        hi: f64,
    },

    #[error("full tile file is {size} bytes, below the {min}-byte sanity floor")]
    FileTooSmall { size: u64, min: u64 },

    #[error("sample grid is {actual} values, expected {expected} for {width}x{height}")]
    SampleCountMismatch {
        expected: usize,
        actual: usize,
        width: usize,
        height: usize,
    },
}
