use serde::{Deserialize, Serialize};

use crate::raster::RasterError;

/// The projected bounding box a raster covers, in Web Mercator metres.
///
/// Stored in the `(west, east, south, north)` order used when rendering
/// rasters onto a map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl Extent {
    pub fn new(west: f64, east: f64, south: f64, north: f64) -> Result<Self, RasterError> {
        let extent = Extent {
            west,
            east,
            south,
            north,
        };

        let finite = [west, east, south, north].iter().all(|v| v.is_finite());
        if !finite || east <= west || north <= south {
            return Err(RasterError::InvalidExtent(extent));
        }

        Ok(extent)
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Half-open containment: the western and southern edges are inside.
    pub fn contains(&self, coord: geo::Coord) -> bool {
        coord.x >= self.west && coord.x < self.east && coord.y >= self.south && coord.y < self.north
    }

    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            west: self.west.min(other.west),
            east: self.east.max(other.east),
            south: self.south.min(other.south),
            north: self.north.max(other.north),
        }
    }

    /// Whether every edge lies within `tolerance` of the other extent's.
    pub fn approx_eq(&self, other: &Extent, tolerance: f64) -> bool {
        (self.west - other.west).abs() <= tolerance
            && (self.east - other.east).abs() <= tolerance
            && (self.south - other.south).abs() <= tolerance
            && (self.north - other.north).abs() <= tolerance
    }

    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.west, self.east, self.south, self.north)
    }
}

impl From<geo::Rect> for Extent {
    fn from(rect: geo::Rect) -> Self {
        Extent {
            west: rect.min().x,
            east: rect.max().x,
            south: rect.min().y,
            north: rect.max().y,
        }
    }
}

impl From<Extent> for geo::Rect {
    fn from(extent: Extent) -> Self {
        geo::Rect::new(
            geo::coord! { x: extent.west, y: extent.south },
            geo::coord! { x: extent.east, y: extent.north },
        )
    }
}
