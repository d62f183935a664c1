//! Projection of listing coordinates and vector geometry into the working frame.

use flatfinder_geo::{LatLng, Project, WebMercator};
use geo::MapCoords;

use crate::raster::{PixelIndex, Raster};

/// Projects `(lat, lng)` points into Web Mercator metres.
pub fn project(points: &[LatLng]) -> Vec<geo::Coord> {
    points.iter().map(LatLng::mercator).collect()
}

/// Projects a lng/lat geometry into Web Mercator metres.
pub fn project_geometry(geometry: &geo::Geometry) -> geo::Geometry {
    geometry.map_coords(|coord| WebMercator::project(geo::Point(coord), 0).0 .0)
}

/// Maps points onto pixel indices of `raster`, with rows counted from the
/// raster's origin edge. Indices are truncated toward zero and never clamped,
/// so callers can detect points that fall outside the raster.
pub fn to_pixel_indices(points: &[LatLng], raster: &Raster) -> Vec<PixelIndex> {
    let transform = raster.transform();
    project(points)
        .into_iter()
        .map(|coord| transform.index(coord))
        .collect()
}
