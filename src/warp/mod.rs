//! Warping rasters onto a common grid, and combining rasters that share one.

use log::debug;
use measure_time::debug_time;
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use rayon::slice::ParallelSliceMut;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::raster::{Kind, Raster};

#[cfg(test)]
mod test;

#[derive(Debug)]
pub enum AlignmentError {
    /// Two rasters were combined without first being warped onto one grid.
    Incongruent {
        expected: (usize, usize),
        found: (usize, usize),
    },
    BandMismatch {
        expected: usize,
        found: usize,
    },
    EmptyStack,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    Nearest,
    /// Preferred for continuous fields. Falls back to nearest wherever a
    /// neighbour is not finite, so unreachable (infinite) cells stay unreachable.
    #[default]
    Bilinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    /// Smallest value per cell, ignoring NaN.
    Min,
    /// Mean per cell, ignoring NaN.
    Mean,
    /// Logical AND: `1.0` where every layer is non-zero, NaN counting as false.
    All,
}

impl Reduction {
    fn apply(self, mut values: impl Iterator<Item = f64>) -> f64 {
        match self {
            Reduction::Min => values
                .filter(|v| !v.is_nan())
                .reduce(f64::min)
                .unwrap_or(f64::NAN),
            Reduction::Mean => {
                let (sum, count) = values
                    .filter(|v| !v.is_nan())
                    .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

                if count == 0 {
                    f64::NAN
                } else {
                    sum / count as f64
                }
            }
            Reduction::All => {
                if values.all(|v| v != 0.0 && !v.is_nan()) {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// A non-empty set of rasters sharing one pixel grid and band count.
#[derive(Debug, Clone)]
pub struct Stack {
    layers: Vec<Raster>,
}

impl Stack {
    /// Collects congruent rasters. Anything captured on a different grid must go
    /// through [`reproject`] first.
    pub fn new(layers: Vec<Raster>) -> Result<Self, AlignmentError> {
        let first = layers.first().ok_or(AlignmentError::EmptyStack)?;

        for layer in &layers[1..] {
            if !layer.is_congruent(first) {
                return Err(AlignmentError::Incongruent {
                    expected: first.shape(),
                    found: layer.shape(),
                });
            }

            if layer.bands() != first.bands() {
                return Err(AlignmentError::BandMismatch {
                    expected: first.bands(),
                    found: layer.bands(),
                });
            }
        }

        Ok(Stack { layers })
    }

    pub fn layers(&self) -> &[Raster] {
        &self.layers
    }

    pub fn into_layers(self) -> Vec<Raster> {
        self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// `(rows, cols)` shared by every layer.
    pub fn shape(&self) -> (usize, usize) {
        self.layers[0].shape()
    }

    /// Collapses the stack cell by cell.
    pub fn reduce(&self, op: Reduction) -> Raster {
        let first = &self.layers[0];

        let data = (0..first.data().len())
            .into_par_iter()
            .map(|i| op.apply(self.layers.iter().map(|layer| layer.data()[i])))
            .collect();

        let reduced = first.with_bands(data, first.bands());
        match op {
            Reduction::All => reduced.with_kind(Kind::Mask),
            _ if self.layers.iter().all(Raster::is_mask) && op == Reduction::Min => reduced,
            _ => reduced.with_kind(Kind::Continuous),
        }
    }
}

/// Reduces `stack` with `op`. See [`Stack::reduce`].
pub fn reduce(stack: &Stack, op: Reduction) -> Raster {
    stack.reduce(op)
}

/// Warps every source onto the grid of `reference`, so that the results are
/// pixel-comparable with it and with each other.
pub fn reproject(reference: &Raster, sources: &[&Raster], method: Resampling) -> Result<Stack, AlignmentError> {
    debug_time!("reproject");
    debug!("Reprojecting {} rasters onto a {:?} grid", sources.len(), reference.shape());

    let layers = sources
        .iter()
        .map(|source| resample(reference, source, method))
        .collect();

    Stack::new(layers)
}

/// Warps one raster onto the grid of `reference`. Cells outside the source
/// extent become NaN. Masks are always resampled by nearest neighbour so they
/// stay masks.
pub fn resample(reference: &Raster, source: &Raster, method: Resampling) -> Raster {
    if source.is_congruent(reference) {
        return source.clone();
    }

    let method = if source.is_mask() {
        Resampling::Nearest
    } else {
        method
    };

    let (dst, src) = (reference.transform(), source.transform());
    let bands = source.bands();

    let mut data = vec![f64::NAN; dst.rows * dst.cols * bands];
    data.par_chunks_mut(dst.cols * bands)
        .enumerate()
        .for_each(|(row, out)| {
            for col in 0..dst.cols {
                let (r, c) = src.pixel(dst.centre(row, col));
                for band in 0..bands {
                    out[col * bands + band] = sample(source, r, c, band, method);
                }
            }
        });

    reference
        .with_bands(data, bands)
        .with_kind(source.kind())
}

fn sample(source: &Raster, row: f64, col: f64, band: usize, method: Resampling) -> f64 {
    let (rows, cols) = source.shape();
    if !(row >= 0.0 && col >= 0.0 && row < rows as f64 && col < cols as f64) {
        return f64::NAN;
    }

    let value = |r: usize, c: usize| source.value(r, c, band).unwrap_or(f64::NAN);
    let nearest = value(row as usize, col as usize);

    match method {
        Resampling::Nearest => nearest,
        Resampling::Bilinear => {
            // Pixel centres sit at half-integers; interpolate between the four around us.
            let (y, x) = (row - 0.5, col - 0.5);
            let (r0, c0) = (y.floor().max(0.0) as usize, x.floor().max(0.0) as usize);
            let (r1, c1) = ((r0 + 1).min(rows - 1), (c0 + 1).min(cols - 1));
            let dy = (y - r0 as f64).clamp(0.0, 1.0);
            let dx = (x - c0 as f64).clamp(0.0, 1.0);

            let corners = [value(r0, c0), value(r0, c1), value(r1, c0), value(r1, c1)];
            if corners.iter().any(|v| !v.is_finite()) {
                return nearest;
            }

            let near = corners[0] * (1.0 - dx) + corners[1] * dx;
            let far = corners[2] * (1.0 - dx) + corners[3] * dx;
            near * (1.0 - dy) + far * dy
        }
    }
}

/// `1.0` where `raster < cutoff`, else `0.0` (NaN never passes).
///
/// A [`Kind::Mask`] input has already been thresholded and is returned as is,
/// whatever `cutoff`, rather than compared again. Comparing a 0/1 mask would
/// invert it (`0 < cutoff <= 1`) or flatten it, so this is what makes
/// `threshold(threshold(r, t), t) == threshold(r, t)` hold.
pub fn threshold(raster: &Raster, cutoff: f64) -> Raster {
    if raster.is_mask() {
        return raster.clone();
    }

    raster
        .map(|value| if value < cutoff { 1.0 } else { 0.0 })
        .with_kind(Kind::Mask)
}
