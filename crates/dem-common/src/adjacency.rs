//! Region adjacency reference tables.
//!
//! Neighbor relationships between named regions (for example US states)
//! are external reference data, loaded once by the caller and handed to
//! whatever needs them. They are not pipeline state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GeoError, GeoResult};

/// Compass direction from a region to one of its neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
}

/// Immutable mapping from region identifier to an ordered list of
/// `(direction, neighbor id)` pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborTable {
    entries: HashMap<String, Vec<(Direction, String)>>,
}

impl NeighborTable {
    /// Load a table from its JSON representation:
    /// `{"colorado": [["north", "wyoming"], ...], ...}`.
    pub fn from_json(json: &str) -> GeoResult<Self> {
        let entries: HashMap<String, Vec<(Direction, String)>> = serde_json::from_str(json)
            .map_err(|e| GeoError::InvalidAdjacency(e.to_string()))?;
        Ok(Self { entries })
    }

    /// Neighbors of a region in their stored order; empty for unknown ids.
    pub fn neighbors(&self, region: &str) -> &[(Direction, String)] {
        self.entries.get(region).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
