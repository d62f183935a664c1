use std::fmt;

use flatfinder_geo::GeoError;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::decision::DecisionError;
use crate::impl_err;
use crate::raster::RasterError;
use crate::rasterize::GeometryError;
use crate::tile::error::{DecodeError, FetchError};
use crate::warp::AlignmentError;

#[derive(Debug)]
pub enum Error {
    Geo(GeoError),
    Raster(RasterError),
    Geometry(GeometryError),
    /// A source (tile service, vector provider) could not be reached.
    Fetch(FetchError),
    Decode(DecodeError),
    Alignment(AlignmentError),
    Cache(CacheError),
    Decision(DecisionError),
    Config(ConfigError),
}

impl_err!(GeoError, Geo);
impl_err!(RasterError, Raster);
impl_err!(GeometryError, Geometry);
impl_err!(FetchError, Fetch);
impl_err!(DecodeError, Decode);
impl_err!(AlignmentError, Alignment);
impl_err!(CacheError, Cache);
impl_err!(DecisionError, Decision);
impl_err!(ConfigError, Config);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Geo(err) => write!(f, "geo: {err:?}"),
            Error::Raster(err) => write!(f, "raster: {err:?}"),
            Error::Geometry(err) => write!(f, "geometry: {err:?}"),
            Error::Fetch(err) => write!(f, "fetch: {err:?}"),
            Error::Decode(err) => write!(f, "decode: {err}"),
            Error::Alignment(err) => write!(f, "alignment: {err:?}"),
            Error::Cache(err) => write!(f, "cache: {err:?}"),
            Error::Decision(err) => write!(f, "decision: {err:?}"),
            Error::Config(err) => write!(f, "config: {err:?}"),
        }
    }
}

impl std::error::Error for Error {}
