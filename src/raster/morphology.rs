//! 3x3 grey morphology, used to grow solid regions over holes
//! (anti-aliased tile boundaries, gaps between price districts).

use log::debug;

use crate::raster::RasterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Morphology {
    /// Minimum over the neighbourhood.
    Erosion,
    /// Maximum over the neighbourhood.
    Dilation,
}

/// Hole filling found nothing to grow from, or stopped making progress with
/// `remaining` holes left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unfillable {
    pub remaining: usize,
}

impl From<Unfillable> for RasterError {
    fn from(Unfillable { remaining }: Unfillable) -> Self {
        RasterError::Unfillable { remaining }
    }
}

/// Applies a 3x3 grey filter. Only in-bounds neighbours take part, which
/// matches a reflected border for min/max filters.
pub fn filter<T: Copy + PartialOrd>(grid: &[T], rows: usize, cols: usize, op: Morphology) -> Vec<T> {
    let pick = |a: T, b: T| match op {
        Morphology::Erosion if b < a => b,
        Morphology::Dilation if b > a => b,
        _ => a,
    };

    let mut out = Vec::with_capacity(grid.len());
    for row in 0..rows {
        let (r0, r1) = (row.saturating_sub(1), (row + 1).min(rows - 1));
        for col in 0..cols {
            let (c0, c1) = (col.saturating_sub(1), (col + 1).min(cols - 1));

            let mut value = grid[row * cols + col];
            for r in r0..=r1 {
                for c in c0..=c1 {
                    value = pick(value, grid[r * cols + c]);
                }
            }
            out.push(value);
        }
    }

    out
}

/// Repeatedly replaces every hole with the filtered value of its neighbourhood
/// until no holes remain. Returns the number of passes taken.
///
/// Fails fast when the grid holds no seed to grow from, and stops with an
/// error if a pass resolves nothing, so it always terminates.
pub fn fill_holes<T: Copy + PartialOrd>(
    grid: &mut [T],
    rows: usize,
    cols: usize,
    is_hole: impl Fn(T) -> bool,
    op: Morphology,
) -> Result<usize, Unfillable> {
    let mut remaining = grid.iter().filter(|v| is_hole(**v)).count();
    if remaining == grid.len() && remaining > 0 {
        return Err(Unfillable { remaining });
    }

    let mut passes = 0;
    while remaining > 0 {
        let filtered = filter(grid, rows, cols, op);

        let mut resolved = 0;
        for (cell, candidate) in grid.iter_mut().zip(filtered) {
            if is_hole(*cell) && !is_hole(candidate) {
                *cell = candidate;
                resolved += 1;
            }
        }

        if resolved == 0 {
            return Err(Unfillable { remaining });
        }

        remaining -= resolved;
        passes += 1;
    }

    debug!("Filled holes in {passes} passes");
    Ok(passes)
}
