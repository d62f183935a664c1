//! The raster value type shared by every stage of the pipeline.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[doc(hidden)]
pub mod extent;
pub mod morphology;
pub mod project;
#[doc(hidden)]
pub mod transform;

#[cfg(test)]
mod test;

#[doc(inline)]
pub use extent::Extent;
#[doc(inline)]
pub use transform::{GeoTransform, PixelIndex};

#[derive(Debug)]
pub enum RasterError {
    /// The grid length does not match `rows * cols * bands`.
    ShapeMismatch { expected: usize, actual: usize },
    EmptyGrid,
    InvalidExtent(Extent),
    BandOutOfRange(usize),
    /// Hole filling found nothing to grow from, or stopped making progress.
    Unfillable { remaining: usize },
}

/// Whether row 0 of a raster's image corresponds to its southern (`Lower`)
/// or northern (`Upper`) edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Lower,
    Upper,
}

impl Origin {
    pub fn flip(self) -> Self {
        match self {
            Origin::Lower => Origin::Upper,
            Origin::Upper => Origin::Lower,
        }
    }
}

/// What the cells of a raster mean. Masks only ever hold `0.0` or `1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
pub enum Kind {
    Continuous,
    Mask,
}

/// An image grid with its projected extent and row-origin convention.
///
/// Multi-band images are stored band-interleaved, so the value of band `b`
/// at `(row, col)` lives at `(row * cols + col) * bands + b`. Rasters are
/// values: every operation returns a new raster.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
    bands: usize,
    extent: Extent,
    origin: Origin,
    kind: Kind,
}

impl Raster {
    pub fn new(
        data: Vec<f64>,
        (rows, cols, bands): (usize, usize, usize),
        extent: Extent,
        origin: Origin,
    ) -> Result<Self, RasterError> {
        if rows == 0 || cols == 0 || bands == 0 {
            return Err(RasterError::EmptyGrid);
        }

        let expected = rows * cols * bands;
        if data.len() != expected {
            return Err(RasterError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }

        let extent = Extent::new(extent.west, extent.east, extent.south, extent.north)?;

        Ok(Raster {
            data,
            rows,
            cols,
            bands,
            extent,
            origin,
            kind: Kind::Continuous,
        })
    }

    /// A single-band raster holding `value` everywhere.
    pub fn filled(
        (rows, cols): (usize, usize),
        value: f64,
        extent: Extent,
        origin: Origin,
    ) -> Result<Self, RasterError> {
        Raster::new(vec![value; rows * cols], (rows, cols, 1), extent, origin)
    }

    /// A single-band raster over the same grid as `self`, holding `data`.
    pub fn derive(&self, data: Vec<f64>) -> Result<Self, RasterError> {
        Raster::new(data, (self.rows, self.cols, 1), self.extent, self.origin)
    }

    /// A single-band raster over the same grid as `self`, holding `value` everywhere.
    pub fn derive_filled(&self, value: f64) -> Raster {
        Raster {
            data: vec![value; self.rows * self.cols],
            bands: 1,
            kind: Kind::Continuous,
            ..*self
        }
    }

    /// Single-band `data` over the ground of `self`, laid out under `origin`.
    /// The caller guarantees `data` holds `rows * cols` values.
    pub(crate) fn with_layout(&self, data: Vec<f64>, origin: Origin) -> Raster {
        debug_assert_eq!(data.len(), self.rows * self.cols);
        Raster {
            data,
            bands: 1,
            origin,
            kind: Kind::Continuous,
            ..*self
        }
    }

    /// `data` with `bands` bands over the grid of `self`, keeping its origin and kind.
    /// The caller guarantees `data` holds `rows * cols * bands` values.
    pub(crate) fn with_bands(&self, data: Vec<f64>, bands: usize) -> Raster {
        debug_assert_eq!(data.len(), self.rows * self.cols * bands);
        Raster { data, bands, ..*self }
    }

    pub(crate) fn with_kind(mut self, kind: Kind) -> Self {
        self.kind = kind;
        self
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    /// `(rows, cols)` of the image, ignoring bands.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn is_mask(&self) -> bool {
        self.kind == Kind::Mask
    }

    pub fn transform(&self) -> GeoTransform {
        GeoTransform::new(self.extent, self.rows, self.cols, self.origin)
    }

    /// Whether `self` and `other` share a pixel grid, and so can be combined cell by cell.
    pub fn is_congruent(&self, other: &Raster) -> bool {
        self.transform().is_compatible(&other.transform())
    }

    /// Value of band 0 at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.value(row, col, 0)
    }

    pub fn value(&self, row: usize, col: usize, band: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols || band >= self.bands {
            return None;
        }

        self.data.get((row * self.cols + col) * self.bands + band).copied()
    }

    /// Applies `f` to every cell, keeping the grid. The result is continuous.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Raster {
        Raster {
            data: self.data.iter().map(|v| f(*v)).collect(),
            kind: Kind::Continuous,
            ..*self
        }
    }

    /// Extracts a single band.
    pub fn band(&self, band: usize) -> Result<Raster, RasterError> {
        if band >= self.bands {
            return Err(RasterError::BandOutOfRange(band));
        }

        Ok(Raster {
            data: self.data.iter().skip(band).step_by(self.bands).copied().collect(),
            bands: 1,
            ..*self
        })
    }

    /// Re-expresses the raster under the given origin, reversing row order when it differs.
    /// The ground each value covers is unchanged.
    pub fn with_origin(&self, origin: Origin) -> Raster {
        if origin == self.origin {
            return self.clone();
        }

        let stride = self.cols * self.bands;
        let data = self
            .data
            .chunks_exact(stride)
            .rev()
            .flatten()
            .copied()
            .collect();

        Raster {
            data,
            origin,
            ..*self
        }
    }
}
