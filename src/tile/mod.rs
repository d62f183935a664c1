//! Travel-time tile imagery: mirror probing, fetching, mosaicking, and
//! decoding the colour key into minutes.

pub mod decode;
#[doc(hidden)]
pub mod error;
pub mod fetch;
pub mod mirror;
pub mod palette;
pub mod source;

#[cfg(test)]
mod test;

#[doc(inline)]
pub use decode::decode;
#[doc(inline)]
pub use fetch::{Bounds, TileFetcher, TileSettings, TravelTimeParams};
#[doc(inline)]
pub use mirror::{select_mirror, MirrorSelector};
#[doc(inline)]
pub use palette::{Colour, Palette, TravelTimeBand};
#[doc(inline)]
pub use source::TileSource;
