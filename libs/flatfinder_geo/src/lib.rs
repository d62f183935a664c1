/// Radius of the sphere used by the Web Mercator (EPSG:3857) projection, in metres.
pub const WEB_MERCATOR_RADIUS: f64 = 6378137.0;

/// Latitude at which Web Mercator becomes square, the poleward limit of the projection.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Edge length of a slippy-map tile, in pixels.
pub const TILE_SIZE: u32 = 256;

#[doc(hidden)]
pub mod coord;
#[doc(hidden)]
pub mod error;
pub mod project;


#[doc(inline)]
pub use coord::latlng::LatLng;
#[doc(inline)]
pub use error::GeoError;
#[doc(inline)]
pub use project::{Project, SlippyTile, WebMercator};
