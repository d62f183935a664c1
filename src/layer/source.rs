//! Providers of the vector data behind the proximity and price layers.
//! Geometry is always in WGS84 longitude/latitude.

use std::fs;
use std::path::PathBuf;

use geo::Geometry;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wkt::TryFromWkt;

use crate::rasterize::GeometryError;
use crate::tile::error::FetchError;

/// A geometry with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: impl Into<Geometry>) -> Self {
        Feature {
            geometry: geometry.into(),
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// A numeric attribute, accepting numbers written as strings.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.property(key)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Keeps features whose `attribute` is one of `values`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFilter {
    pub attribute: String,
    pub values: Vec<String>,
}

impl AttributeFilter {
    pub fn matches(&self, feature: &Feature) -> bool {
        feature
            .property(&self.attribute)
            .and_then(Value::as_str)
            .is_some_and(|value| self.values.iter().any(|allowed| allowed == value))
    }
}

pub trait VectorSource: Send + Sync {
    fn features(&self) -> crate::Result<Vec<Feature>>;

    /// Features passing `filter`, or all of them without one.
    fn filtered(&self, filter: Option<&AttributeFilter>) -> crate::Result<Vec<Feature>> {
        let features = self.features()?;
        let Some(filter) = filter else {
            return Ok(features);
        };

        let total = features.len();
        let kept: Vec<Feature> = features.into_iter().filter(|f| filter.matches(f)).collect();
        debug!("Kept {} of {total} features on {}", kept.len(), filter.attribute);

        Ok(kept)
    }
}

/// District polygons with their price per square metre.
pub trait PriceSource: Send + Sync {
    fn districts(&self) -> crate::Result<Vec<(Geometry, f64)>>;
}

impl VectorSource for Vec<Feature> {
    fn features(&self) -> crate::Result<Vec<Feature>> {
        Ok(self.clone())
    }
}

impl PriceSource for Vec<(Geometry, f64)> {
    fn districts(&self) -> crate::Result<Vec<(Geometry, f64)>> {
        Ok(self.clone())
    }
}

/// Prices read from a numeric attribute of another source's features.
/// Features without a usable price are skipped.
pub struct AttributePrices<S> {
    source: S,
    attribute: String,
}

impl<S: VectorSource> AttributePrices<S> {
    pub fn new(source: S, attribute: impl Into<String>) -> Self {
        AttributePrices {
            source,
            attribute: attribute.into(),
        }
    }
}

impl<S: VectorSource> PriceSource for AttributePrices<S> {
    fn districts(&self) -> crate::Result<Vec<(Geometry, f64)>> {
        let features = self.source.features()?;
        let total = features.len();

        let districts: Vec<_> = features
            .into_iter()
            .filter_map(|feature| {
                let price = feature.number(&self.attribute).filter(|p| p.is_finite())?;
                Some((feature.geometry, price))
            })
            .collect();

        if districts.len() < total {
            warn!("{} of {total} districts had no {}", total - districts.len(), self.attribute);
        }

        Ok(districts)
    }
}

#[derive(Deserialize)]
struct WktRecord {
    wkt: String,
    #[serde(default)]
    properties: Map<String, Value>,
}

/// A JSON array of `{"wkt": "...", "properties": {...}}` records on disk.
pub struct WktFile {
    path: PathBuf,
}

impl WktFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        WktFile { path: path.into() }
    }
}

impl VectorSource for WktFile {
    fn features(&self) -> crate::Result<Vec<Feature>> {
        let text = fs::read_to_string(&self.path).map_err(|err| FetchError::Request {
            url: self.path.display().to_string(),
            reason: err.to_string(),
        })?;

        let records: Vec<WktRecord> =
            serde_json::from_str(&text).map_err(|err| GeometryError::Malformed(err.to_string()))?;

        let features = records
            .into_iter()
            .map(|record| -> crate::Result<Feature> {
                let geometry = Geometry::<f64>::try_from_wkt_str(&record.wkt)
                    .map_err(|err| GeometryError::Malformed(format!("{err:?}")))?;

                Ok(Feature {
                    geometry,
                    properties: record.properties,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        debug!("Read {} features from {}", features.len(), self.path.display());
        Ok(features)
    }
}
