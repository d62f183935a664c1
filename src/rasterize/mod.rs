//! Burns vector geometry into rasters aligned with a reference grid.
//!
//! Burning happens on a top-origin canvas, the usual convention for raster
//! images, and the result is flipped to match the reference when its origin
//! is `Lower`.

use geo::{BoundingRect, CoordsIter, Geometry, Polygon};
use log::warn;

use crate::raster::{GeoTransform, Kind, Origin, Raster};

pub mod distance;


#[doc(inline)]
pub use distance::{distance_field, DistanceScale};

#[derive(Debug)]
pub enum GeometryError {
    /// The collection holds no coordinates at all.
    Empty,
    /// At least one coordinate is NaN or infinite.
    NonFinite,
    /// The source text could not be parsed as geometry.
    Malformed(String),
}

/// Checks that a geometry has coordinates and that all of them are finite.
pub fn validate(geometry: &Geometry) -> Result<(), GeometryError> {
    let mut coords = geometry.coords_iter().peekable();
    if coords.peek().is_none() {
        return Err(GeometryError::Empty);
    }

    if coords.any(|coord| !coord.x.is_finite() || !coord.y.is_finite()) {
        return Err(GeometryError::NonFinite);
    }

    Ok(())
}

/// Burns `geometry` (in projected coordinates) into a mask matching the grid of `reference`.
/// Polygons cover every pixel whose centre they contain, points the pixel they fall in,
/// and lines every pixel they pass through.
pub fn rasterize(geometry: &Geometry, reference: &Raster) -> Raster {
    let mut canvas = Canvas::new(reference);
    canvas.burn(geometry, 1.0);
    canvas.into_raster(reference).with_kind(Kind::Mask)
}

/// Burns each `(geometry, value)` pair into a continuous raster matching `reference`,
/// with `0.0` wherever nothing was burned. Later features overwrite earlier ones.
pub fn rasterize_values(features: &[(Geometry, f64)], reference: &Raster) -> Raster {
    let mut canvas = Canvas::new(reference);
    for (geometry, value) in features {
        if let Err(err) = validate(geometry) {
            warn!("Skipping feature with value {value}: {err:?}");
            continue;
        }

        canvas.burn(geometry, *value);
    }

    canvas.into_raster(reference)
}

/// A raster over the grid of `reference` in which nothing is reachable.
pub fn unreachable(reference: &Raster) -> Raster {
    reference.derive_filled(f64::INFINITY)
}

struct Canvas {
    data: Vec<f64>,
    transform: GeoTransform,
}

impl Canvas {
    fn new(reference: &Raster) -> Self {
        let (rows, cols) = reference.shape();
        Canvas {
            data: vec![0.0; rows * cols],
            transform: GeoTransform::new(reference.extent(), rows, cols, Origin::Upper),
        }
    }

    fn into_raster(self, reference: &Raster) -> Raster {
        reference
            .with_layout(self.data, Origin::Upper)
            .with_origin(reference.origin())
    }

    fn burn(&mut self, geometry: &Geometry, value: f64) {
        match geometry {
            Geometry::Point(point) => self.burn_point(point.0, value),
            Geometry::MultiPoint(points) => points.iter().for_each(|p| self.burn_point(p.0, value)),
            Geometry::Line(line) => self.burn_line(line.start, line.end, value),
            Geometry::LineString(line) => line.lines().for_each(|l| self.burn_line(l.start, l.end, value)),
            Geometry::MultiLineString(lines) => lines
                .iter()
                .flat_map(|line| line.lines())
                .for_each(|l| self.burn_line(l.start, l.end, value)),
            Geometry::Polygon(polygon) => self.burn_polygon(polygon, value),
            Geometry::MultiPolygon(polygons) => polygons.iter().for_each(|p| self.burn_polygon(p, value)),
            Geometry::Rect(rect) => self.burn_polygon(&rect.to_polygon(), value),
            Geometry::Triangle(triangle) => self.burn_polygon(&triangle.to_polygon(), value),
            Geometry::GeometryCollection(collection) => collection.iter().for_each(|g| self.burn(g, value)),
        }
    }

    fn burn_point(&mut self, coord: geo::Coord, value: f64) {
        if !self.transform.extent.contains(coord) {
            return;
        }

        let (row, col) = self.transform.pixel(coord);
        let (row, col) = (row.floor() as usize, col.floor() as usize);
        if row < self.transform.rows && col < self.transform.cols {
            self.data[row * self.transform.cols + col] = value;
        }
    }

    fn burn_line(&mut self, start: geo::Coord, end: geo::Coord, value: f64) {
        let t = &self.transform;
        let span = ((end.x - start.x).abs() / t.pixel_width()).max((end.y - start.y).abs() / t.pixel_height());

        // Half-pixel steps so no traversed pixel is skipped.
        let steps = (span * 2.0).ceil().max(1.0) as usize;
        for step in 0..=steps {
            let f = step as f64 / steps as f64;
            let coord = geo::coord! {
                x: start.x + f * (end.x - start.x),
                y: start.y + f * (end.y - start.y),
            };
            self.burn_point(coord, value);
        }
    }

    /// Even-odd scanline fill sampled at pixel centres.
    fn burn_polygon(&mut self, polygon: &Polygon, value: f64) {
        let Some(bounds) = polygon.bounding_rect() else {
            return;
        };

        let t = self.transform;
        let (pw, ph) = (t.pixel_width(), t.pixel_height());
        let (north, west) = (t.extent.north, t.extent.west);

        let first = ((north - bounds.max().y) / ph - 0.5).ceil().clamp(0.0, t.rows as f64) as usize;
        let last = (((north - bounds.min().y) / ph - 0.5).floor() + 1.0).clamp(0.0, t.rows as f64) as usize;

        let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
        let edges: Vec<geo::Line> = rings.flat_map(|ring| ring.lines()).collect();

        let mut crossings = Vec::new();
        for row in first..last {
            let y = north - (row as f64 + 0.5) * ph;

            crossings.clear();
            for edge in &edges {
                let (a, b) = (edge.start, edge.end);
                if (a.y <= y) != (b.y <= y) {
                    crossings.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
                }
            }
            crossings.sort_by(f64::total_cmp);

            for span in crossings.chunks_exact(2) {
                let from = ((span[0] - west) / pw - 0.5).ceil().clamp(0.0, t.cols as f64) as usize;
                let to = ((span[1] - west) / pw - 0.5).ceil().clamp(0.0, t.cols as f64) as usize;

                self.data[row * t.cols + from..row * t.cols + to.max(from)].fill(value);
            }
        }
    }
}
