//! Turns colour-keyed travel-time imagery into minutes.

use image::RgbImage;
use log::debug;
use measure_time::debug_time;

use crate::raster::morphology::{fill_holes, Morphology, Unfillable};
use crate::raster::{Extent, Origin, Raster};
use crate::tile::error::DecodeError;
use crate::tile::palette::{Palette, UNCLASSIFIED};

/// Decodes an encoded (PNG, JPEG) tile body to RGB.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// Band index of every pixel, row-major from the top, [`UNCLASSIFIED`] where
/// the colour matches no band exactly.
pub fn classify(image: &RgbImage, palette: &Palette) -> Vec<u8> {
    image.pixels().map(|pixel| palette.classify(pixel.0)).collect()
}

/// Replaces unclassified pixels, which sit on anti-aliased boundaries between
/// bands, with the fastest band among their neighbours. Returns the passes taken.
pub fn fill(bands: &mut [u8], rows: usize, cols: usize) -> Result<usize, DecodeError> {
    if bands.iter().all(|band| *band == UNCLASSIFIED) {
        return Err(DecodeError::NoClassifiedPixels);
    }

    // Unclassified is the largest index, so erosion always prefers a real band.
    fill_holes(bands, rows, cols, |band| band == UNCLASSIFIED, Morphology::Erosion)
        .map_err(|Unfillable { remaining }| DecodeError::Stalled { remaining })
}

/// Maps band indices to minutes for imagery captured at `interval`.
pub fn minutes(bands: &[u8], palette: &Palette, interval: f64) -> Vec<f64> {
    let times = palette.minutes(interval);
    bands
        .iter()
        .map(|band| times.get(*band as usize).copied().unwrap_or(f64::INFINITY))
        .collect()
}

/// Decodes a travel-time image covering `extent` into a raster of minutes,
/// with the top row of the image as the northern edge.
pub fn decode(image: &RgbImage, palette: &Palette, interval: f64, extent: Extent) -> crate::Result<Raster> {
    debug_time!("decode");

    let (rows, cols) = (image.height() as usize, image.width() as usize);

    let mut bands = classify(image, palette);
    let unclassified = bands.iter().filter(|band| **band == UNCLASSIFIED).count();
    debug!("{unclassified} of {} pixels unclassified before fill", bands.len());

    fill(&mut bands, rows, cols)?;

    let raster = Raster::new(minutes(&bands, palette, interval), (rows, cols, 1), extent, Origin::Upper)?;
    Ok(raster)
}
