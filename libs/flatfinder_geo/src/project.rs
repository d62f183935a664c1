//! Required structures to project between standards

use std::f64::consts::PI;
use std::ops::RangeInclusive;

use crate::error::GeoError;
use crate::{MAX_LATITUDE, TILE_SIZE, WEB_MERCATOR_RADIUS};

/// Allows for projection between two standards.
pub trait Project {
    /// Projects a position between two standards.
    /// It Takes an input and a zoom level, and outputs a value implementing Point.
    ///
    /// ### Example
    /// ```rust
    /// use flatfinder_geo::{Project, project::SlippyTile};
    /// use geo::point;
    ///
    /// let value = point! { x: -0.05966, y: 51.49477 };
    /// let SlippyTile((x, px), (y, py), z) = SlippyTile::project(value, 12);
    /// // We now have the slippy tile coordinate of the original lng/lat.
    /// ```
    fn project(value: geo::Point, zoom: u8) -> Self;
}

#[doc(hidden)]
pub mod projections {
    /// A position in spherical Web Mercator (EPSG:3857), in metres east and north of
    /// the intersection of the equator and the prime meridian.
    /// *Learn more [here](https://en.wikipedia.org/wiki/Web_Mercator_projection?useskin=vector).*
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct WebMercator(pub geo::Point);

    /// A Slippy tile is one which has a defined x and y, which is distinct to its zoom level.
    /// It can also have a pixel offset *inside* the tile, which is the 2nd parameter.
    /// On a tile corner, this offset is 0.
    ///
    /// ```rust
    /// use flatfinder_geo::project::SlippyTile;
    /// // Tile which encloses central London
    /// let value = SlippyTile((2046, 0), (1362, 0), 12);
    /// ```
    /// *Learn more [at the osm wiki](https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames).*
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SlippyTile(pub (u32, u32), pub (u32, u32), pub u8);
}

#[doc(inline)]
pub use projections::SlippyTile;
#[doc(inline)]
pub use projections::WebMercator;

/// Largest zoom for which tile indices fit comfortably in `u32`.
pub const MAX_ZOOM: u8 = 24;

impl Project for SlippyTile {
    /// See the [OSM Wiki](https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames#Mathematics) for the projection source.
    fn project(value: geo::Point, zoom: u8) -> Self {
        let tiles = (1u64 << zoom) as f64;
        let offset = |value: f64| {
            let value = value.clamp(0.0, tiles - f64::EPSILON * tiles);
            let n = value.floor() as u32;
            let offset = ((TILE_SIZE as f64) * (value - value.floor())) as u32;
            (n, offset)
        };

        let (lng, lat) = value.x_y();
        let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();

        // Obtain the X tile position (at desired zoom) and offset inside tile
        let x = tiles * ((lng + 180.0) / 360.0);
        let (xn, xoff) = offset(x);

        // Same for Y tile position
        let y = tiles * (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0;
        let (yn, yoff) = offset(y);

        SlippyTile((xn, xoff), (yn, yoff), zoom)
    }
}

impl SlippyTile {
    /// Rejects zoom levels whose tile indices would not fit the tile scheme.
    pub fn check_zoom(zoom: u8) -> Result<u8, GeoError> {
        if zoom > MAX_ZOOM {
            return Err(GeoError::UnsupportedZoom(zoom));
        }

        Ok(zoom)
    }

    pub fn x(&self) -> u32 {
        self.0.0
    }

    pub fn y(&self) -> u32 {
        self.1.0
    }

    pub fn zoom(&self) -> u8 {
        self.2
    }

    /// The projected (Web Mercator) bounds of the tile, as `(min, max)` corners.
    pub fn bounds(&self) -> geo::Rect {
        let span = 2.0 * PI * WEB_MERCATOR_RADIUS / (1u64 << self.zoom()) as f64;
        let shift = PI * WEB_MERCATOR_RADIUS;

        let west = -shift + self.x() as f64 * span;
        let north = shift - self.y() as f64 * span;

        geo::Rect::new(
            geo::coord! { x: west, y: north - span },
            geo::coord! { x: west + span, y: north },
        )
    }

    /// The inclusive tile ranges `(x, y)` which cover a lng/lat bounding box.
    /// Bounds are `(west, east, south, north)` in degrees.
    pub fn covering(bounds: (f64, f64, f64, f64), zoom: u8) -> (RangeInclusive<u32>, RangeInclusive<u32>) {
        let (west, east, south, north) = bounds;

        let top_left = SlippyTile::project(geo::Point::new(west, north), zoom);
        let bottom_right = SlippyTile::project(geo::Point::new(east, south), zoom);

        (
            top_left.x()..=bottom_right.x(),
            top_left.y()..=bottom_right.y(),
        )
    }
}

impl Project for WebMercator {
    fn project(value: geo::Point, _: u8) -> Self {
        let (lng, lat) = value.x_y();
        let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();

        let x = WEB_MERCATOR_RADIUS * lng.to_radians();
        let y = WEB_MERCATOR_RADIUS * (PI / 4.0 + lat / 2.0).tan().ln();

        WebMercator(geo::Point::new(x, y))
    }
}

impl WebMercator {
    /// Inverts the projection, returning a lng/lat point.
    pub fn unproject(&self) -> geo::Point {
        let (x, y) = self.0.x_y();

        let lng = (x / WEB_MERCATOR_RADIUS).to_degrees();
        let lat = (2.0 * (y / WEB_MERCATOR_RADIUS).exp().atan() - PI / 2.0).to_degrees();

        geo::Point::new(lng, lat)
    }
}
