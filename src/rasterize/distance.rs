//! Exact Euclidean distance transform, after Felzenszwalb & Huttenlocher,
//! "Distance Transforms of Sampled Functions" (2012).

use log::warn;
use measure_time::debug_time;
use serde::{Deserialize, Serialize};

use crate::raster::Raster;

/// Hand-measured ground distance covered by one pixel of the zoom-12 base map.
pub const DEFAULT_METRES_PER_PIXEL: f64 = 22.0;

/// Assumed walking speed. An approximation carried over as a product decision,
/// not a measured value.
pub const DEFAULT_WALKING_SPEED: f64 = 1.5;

/// Converts pixel distances into walking minutes, as
/// `minutes = pixels * metres_per_pixel / (60 * walking_speed)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceScale {
    pub metres_per_pixel: f64,
    pub walking_speed: f64,
}

impl Default for DistanceScale {
    fn default() -> Self {
        Self {
            metres_per_pixel: DEFAULT_METRES_PER_PIXEL,
            walking_speed: DEFAULT_WALKING_SPEED,
        }
    }
}

impl DistanceScale {
    pub fn minutes(&self, pixels: f64) -> f64 {
        pixels * self.metres_per_pixel / (60.0 * self.walking_speed)
    }
}

/// Turns a burned mask into a "minutes to the nearest feature" raster.
/// A cell is a feature when it is non-zero. An empty mask yields infinity everywhere.
pub fn distance_field(mask: &Raster, scale: &DistanceScale) -> Raster {
    debug_time!("distance_field");

    let (rows, cols) = mask.shape();
    let features: Vec<bool> = (0..rows * cols)
        .map(|i| mask.data()[i * mask.bands()] != 0.0 && !mask.data()[i * mask.bands()].is_nan())
        .collect();

    if !features.iter().any(|f| *f) {
        warn!("Distance field requested over an empty mask, nothing is reachable");
    }

    let distances = euclidean_distance(&features, rows, cols)
        .into_iter()
        .map(|pixels| scale.minutes(pixels))
        .collect();

    mask.with_layout(distances, mask.origin())
}

/// Distance, in pixels, from every cell to the nearest `true` cell.
/// Cells with no feature anywhere in the grid are infinitely far.
pub fn euclidean_distance(features: &[bool], rows: usize, cols: usize) -> Vec<f64> {
    let mut grid: Vec<f64> = features
        .iter()
        .map(|f| if *f { 0.0 } else { f64::INFINITY })
        .collect();

    // Columns first, then rows over the column result.
    let mut line = Vec::with_capacity(rows.max(cols));
    let mut out = vec![0.0; rows.max(cols)];
    for col in 0..cols {
        line.clear();
        line.extend((0..rows).map(|row| grid[row * cols + col]));
        squared_distance(&line, &mut out[..rows]);
        for row in 0..rows {
            grid[row * cols + col] = out[row];
        }
    }

    for row in 0..rows {
        let span = row * cols..(row + 1) * cols;
        line.clear();
        line.extend_from_slice(&grid[span.clone()]);
        squared_distance(&line, &mut out[..cols]);
        grid[span].copy_from_slice(&out[..cols]);
    }

    grid.into_iter().map(f64::sqrt).collect()
}

/// One-dimensional squared distance transform of a sampled function: the lower
/// envelope of the parabolas rooted at each finite sample. Infinite samples root
/// no parabola, so an all-infinite line stays infinite.
fn squared_distance(f: &[f64], out: &mut [f64]) {
    // Roots of the envelope's parabolas, and the left boundary of each.
    let mut roots: Vec<usize> = Vec::with_capacity(f.len());
    let mut bounds: Vec<f64> = Vec::with_capacity(f.len());

    for q in 0..f.len() {
        if !f[q].is_finite() {
            continue;
        }

        let mut boundary = f64::NEG_INFINITY;
        while let Some(&p) = roots.last() {
            let s = ((f[q] + (q * q) as f64) - (f[p] + (p * p) as f64)) / (2.0 * (q - p) as f64);
            if s <= bounds[bounds.len() - 1] {
                roots.pop();
                bounds.pop();
            } else {
                boundary = s;
                break;
            }
        }

        roots.push(q);
        bounds.push(boundary);
    }

    if roots.is_empty() {
        out.fill(f64::INFINITY);
        return;
    }

    let mut k = 0;
    for (q, cell) in out.iter_mut().enumerate() {
        while k + 1 < roots.len() && bounds[k + 1] < q as f64 {
            k += 1;
        }

        let d = q as f64 - roots[k] as f64;
        *cell = d * d + f[roots[k]];
    }
}
