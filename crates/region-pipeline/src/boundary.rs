//! The boundary polygon source.
//!
//! Region outlines (state borders, country masks) come from an external
//! collaborator behind this trait. A `None` result means "use the
//! bounding box as-is": the region is exported unmasked and uncropped.

use std::collections::HashMap;

use async_trait::async_trait;

use dem_common::Polygon;

/// Resolves a region name to its boundary polygon.
#[async_trait]
pub trait BoundarySource: Send + Sync {
    /// The boundary for a named region, or None to use the bounding box
    /// as-is. Errors abort the run.
    async fn resolve(&self, region: &str) -> Result<Option<Polygon>, String>;
}

/// Boundary source backed by a fixed map; regions absent from the map
/// resolve to None.
#[derive(Debug, Default)]
pub struct StaticBoundarySource {
    polygons: HashMap<String, Polygon>,
}

impl StaticBoundarySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a boundary polygon for a region name.
    pub fn with(mut self, region: impl Into<String>, polygon: Polygon) -> Self {
        self.polygons.insert(region.into(), polygon);
        self
    }
}

#[async_trait]
impl BoundarySource for StaticBoundarySource {
    async fn resolve(&self, region: &str) -> Result<Option<Polygon>, String> {
        Ok(self.polygons.get(region).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dem_common::GeoBounds;

    #[tokio::test]
    async fn test_static_source() {
        let bounds = GeoBounds::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let source = StaticBoundarySource::new().with("unit", Polygon::rectangle(&bounds));

        assert!(source.resolve("unit").await.unwrap().is_some());
        assert!(source.resolve("elsewhere").await.unwrap().is_none());
    }
}
