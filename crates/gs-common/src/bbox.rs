//! Bounding box types.

use serde::{Deserialize, Serialize};

/// A bounding box as the configuration API represents it.
///
/// The remote schema orders the corners as `minx, maxx, miny, maxy`, followed
/// by an optional CRS identifier. That order is preserved everywhere a box is
/// written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub crs: Option<String>,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates, in wire order.
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            crs: None,
        }
    }

    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        let crs = crs.into();
        self.crs = if crs.is_empty() { None } else { Some(crs) };
        self
    }

    /// The whole world in EPSG:4326, used as the default extent of new layer groups.
    pub fn world() -> Self {
        Self::new(-180.0, 180.0, -90.0, 90.0).with_crs("EPSG:4326")
    }

    /// Build from the five wire-ordered text values.
    pub fn from_parts(
        min_x: &str,
        max_x: &str,
        min_y: &str,
        max_y: &str,
        crs: Option<&str>,
    ) -> Result<Self, BboxParseError> {
        let parse = |s: &str| {
            s.trim()
                .parse::<f64>()
                .map_err(|_| BboxParseError::InvalidNumber(s.to_string()))
        };

        let bbox = Self::new(parse(min_x)?, parse(max_x)?, parse(min_y)?, parse(max_y)?);
        Ok(match crs {
            Some(crs) => bbox.with_crs(crs.trim()),
            None => bbox,
        })
    }

    /// The four coordinates in wire order.
    pub fn coordinates(&self) -> [f64; 4] {
        [self.min_x, self.max_x, self.min_y, self.max_y]
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid number in bounding box: {0}")]
    InvalidNumber(String),
}
