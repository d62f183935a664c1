use crate::raster::{Extent, Origin};

/// Relative tolerance, in pixels, under which two grids are considered the same.
const GRID_TOLERANCE: f64 = 1e-6;

/// The affine mapping between pixel `(row, col)` and projected `(x, y)`,
/// derived from a raster's extent and shape.
///
/// Rows are counted from the edge named by the [`Origin`], so a `Lower`
/// raster's row 0 is its southern edge and an `Upper` raster's is its northern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub extent: Extent,
    pub rows: usize,
    pub cols: usize,
    pub origin: Origin,
}

/// A pixel index as produced by projection. Never clamped, so it
/// may lie outside the raster it was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelIndex {
    pub row: i64,
    pub col: i64,
}

impl PixelIndex {
    /// The `(row, col)` pair, if it lies inside a `rows` by `cols` grid.
    pub fn within(&self, rows: usize, cols: usize) -> Option<(usize, usize)> {
        let inside = self.row >= 0 && self.col >= 0 && (self.row as usize) < rows && (self.col as usize) < cols;
        inside.then_some((self.row as usize, self.col as usize))
    }
}

impl GeoTransform {
    pub fn new(extent: Extent, rows: usize, cols: usize, origin: Origin) -> Self {
        GeoTransform {
            extent,
            rows,
            cols,
            origin,
        }
    }

    pub fn pixel_width(&self) -> f64 {
        self.extent.width() / self.cols as f64
    }

    pub fn pixel_height(&self) -> f64 {
        self.extent.height() / self.rows as f64
    }

    /// Fractional `(row, col)` of a projected coordinate. Pixel `i` spans `[i, i + 1)`,
    /// so its centre sits at `i + 0.5`.
    pub fn pixel(&self, coord: geo::Coord) -> (f64, f64) {
        let col = self.cols as f64 * (coord.x - self.extent.west) / self.extent.width();
        let row = match self.origin {
            Origin::Lower => self.rows as f64 * (coord.y - self.extent.south) / self.extent.height(),
            Origin::Upper => self.rows as f64 * (self.extent.north - coord.y) / self.extent.height(),
        };

        (row, col)
    }

    /// Integer pixel index of a projected coordinate, truncated toward zero.
    pub fn index(&self, coord: geo::Coord) -> PixelIndex {
        let (row, col) = self.pixel(coord);
        PixelIndex {
            row: row as i64,
            col: col as i64,
        }
    }

    /// The projected coordinate at the centre of pixel `(row, col)`.
    pub fn centre(&self, row: usize, col: usize) -> geo::Coord {
        let x = self.extent.west + (col as f64 + 0.5) * self.pixel_width();
        let y = match self.origin {
            Origin::Lower => self.extent.south + (row as f64 + 0.5) * self.pixel_height(),
            Origin::Upper => self.extent.north - (row as f64 + 0.5) * self.pixel_height(),
        };

        geo::coord! { x: x, y: y }
    }

    /// Two transforms are compatible iff they imply the same pixel grid,
    /// that is, pixel `(row, col)` covers the same ground in both.
    pub fn is_compatible(&self, other: &GeoTransform) -> bool {
        if self.rows != other.rows || self.cols != other.cols || self.origin != other.origin {
            return false;
        }

        let tolerance = GRID_TOLERANCE * self.pixel_width().min(self.pixel_height());
        self.extent.approx_eq(&other.extent, tolerance)
    }
}
