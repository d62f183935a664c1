use std::fmt::{Debug, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::GeoError;
use crate::project::{Project, WebMercator};

pub type Degree = f64;

/// `LatLng`
/// The latitude, longitude pair structure, geotags an item with a location.
///
/// Serialises as a `[lat, lng]` pair, the order used by listing feeds
/// and the locations file.
///
/// ```rust
/// use flatfinder_geo::LatLng;
/// let latlng = LatLng::from_degree(51.49477, -0.05966).unwrap();
/// println!("Position: {:?}", latlng);
/// ```
#[derive(Clone, Copy, PartialOrd, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Degree, Degree)", into = "(Degree, Degree)")]
pub struct LatLng {
    pub lat: Degree,
    pub lng: Degree,
}

impl From<(Degree, Degree)> for LatLng {
    /// Format is: (Lat, Lng)
    fn from((lat, lng): (Degree, Degree)) -> Self {
        Self::new(lat, lng)
    }
}

impl From<LatLng> for (Degree, Degree) {
    fn from(value: LatLng) -> Self {
        (value.lat, value.lng)
    }
}

impl From<LatLng> for geo::Point {
    fn from(value: LatLng) -> Self {
        geo::Point::new(value.lng, value.lat)
    }
}

impl From<geo::Point> for LatLng {
    fn from(value: geo::Point) -> Self {
        Self::new(value.y(), value.x())
    }
}

impl LatLng {
    /// Constructs a new `LatLng` from a given `lat` and `lng`, without validation.
    pub fn new(lat: Degree, lng: Degree) -> Self {
        LatLng { lat, lng }
    }

    pub fn from_degree(lat: Degree, lng: Degree) -> Result<Self, GeoError> {
        if !(lat > -90f64 && lat < 90f64) {
            return Err(GeoError::InvalidCoordinate(format!(
                "Latitude must be greater than -90 and less than 90. Given: {}",
                lat
            )));
        }

        if !(lng < 180f64 && lng > -180f64) {
            return Err(GeoError::InvalidCoordinate(format!(
                "Longitude must be greater than -180 and less than 180. Given: {}",
                lng
            )));
        }

        Ok(Self::new(lat, lng))
    }

    pub fn lat(&self) -> Degree {
        self.lat
    }

    pub fn lng(&self) -> Degree {
        self.lng
    }

    /// Returns a [`lng`, `lat`] pair
    pub fn slice(&self) -> [Degree; 2] {
        [self.lng, self.lat]
    }

    /// Projects into the working Web Mercator frame, in metres.
    pub fn mercator(&self) -> geo::Coord {
        WebMercator::project(geo::Point::from(*self), 0).0.0
    }
}

impl Debug for LatLng {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "POINT({} {})", self.lng, self.lat)
    }
}
