#![doc = include_str!("../readme.md")]

#[cfg(feature = "mimalloc")]
use mimalloc::MiMalloc;
#[cfg_attr(feature = "mimalloc", global_allocator)]
#[cfg(feature = "mimalloc")]
static GLOBAL: MiMalloc = MiMalloc;

pub mod cache;
pub mod config;
pub mod decision;
#[doc(hidden)]
pub mod error;
pub mod layer;
pub mod raster;
pub mod rasterize;
pub mod score;
pub mod tile;
pub mod util;
pub mod warp;

#[doc(inline)]
pub use cache::{LayerCache, LayerKey, Tier};
#[doc(inline)]
pub use config::Config;
#[doc(inline)]
pub use error::Error;
#[doc(inline)]
pub use layer::{build_composite, Layers, Pipeline};
#[doc(inline)]
pub use raster::{Extent, GeoTransform, Kind, Origin, Raster};
#[doc(inline)]
pub use score::{score, score_listings, ListingPoint, ScoreTable};
#[doc(inline)]
pub use warp::{reduce, reproject, threshold, Reduction, Resampling, Stack};

pub use flatfinder_geo::LatLng;

pub type Result<T> = std::result::Result<T, Error>;
