//! Every tunable of the pipeline, with the London defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use flatfinder_geo::{LatLng, SlippyTile};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::rasterize::DistanceScale;
use crate::score::Cuts;
use crate::tile::{Bounds, TileSettings};
use crate::warp::Reduction;


/// Greater London, as `(west, east, south, north)` degrees.
pub const LONDON: Bounds = (-0.489, 0.236, 51.28, 51.686);

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        ConfigError::Parse(value)
    }
}

/// Places whose travel times are combined into one layer, such as the
/// offices of a commute or the homes of friends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommuteGroup {
    pub reduction: Reduction,
    /// Minutes between the bands of the requested imagery.
    pub interval: u32,
    #[serde(default)]
    pub locations: BTreeMap<String, LatLng>,
}

impl CommuteGroup {
    pub fn new(reduction: Reduction, interval: u32) -> Self {
        CommuteGroup {
            reduction,
            interval,
            locations: BTreeMap::new(),
        }
    }
}

/// `{group: {label: [lat, lon]}}`, as found in `locations.json`.
pub type Locations = BTreeMap<String, BTreeMap<String, LatLng>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bounds: Bounds,
    pub zoom: u8,
    pub tiles: TileSettings,
    pub scale: DistanceScale,
    /// Green spaces smaller than this, in square metres, are not parks.
    pub green_min_area: f64,
    /// Feature attribute holding a town centre's classification.
    pub town_class_attribute: String,
    pub town_classes: Vec<String>,
    /// Feature attribute holding a district's price per square metre.
    pub price_attribute: String,
    pub commute: BTreeMap<String, CommuteGroup>,
    pub cuts: Cuts,
    /// Persist built layers here when set.
    pub cache_dir: Option<PathBuf>,
    pub decisions: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let commute = [
            ("aerial", CommuteGroup::new(Reduction::Min, 5)),
            ("central", CommuteGroup::new(Reduction::Mean, 10)),
            ("friends", CommuteGroup::new(Reduction::Mean, 10)),
        ]
        .into_iter()
        .map(|(name, group)| (name.to_string(), group))
        .collect();

        Config {
            bounds: LONDON,
            zoom: 12,
            tiles: TileSettings::default(),
            scale: DistanceScale::default(),
            green_min_area: 250.0 * 250.0,
            town_class_attribute: "Classifi_1".to_string(),
            town_classes: ["International", "Metropolitan", "Major", "District"]
                .map(String::from)
                .to_vec(),
            price_attribute: "price_per_sq_m".to_string(),
            commute,
            cuts: Cuts::default(),
            cache_dir: Some(PathBuf::from(".cache/flatfinder")),
            decisions: PathBuf::from("data/decisions.json"),
        }
    }
}

impl Config {
    /// Parses a JSON config. Absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading config from {}", path.display());
        Config::from_json(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        SlippyTile::check_zoom(self.zoom).map_err(|err| ConfigError::Invalid(format!("{err:?}")))?;

        let (west, east, south, north) = self.bounds;
        if !(west < east && south < north) {
            return Err(ConfigError::Invalid(format!("empty bounding box {:?}", self.bounds)));
        }

        if !(self.scale.metres_per_pixel > 0.0 && self.scale.walking_speed > 0.0) {
            return Err(ConfigError::Invalid("distance scale must be positive".to_string()));
        }

        if let Some((name, _)) = self.commute.iter().find(|(_, group)| group.interval == 0) {
            return Err(ConfigError::Invalid(format!("commute group {name} has a zero interval")));
        }

        Ok(())
    }

    /// Merges `{group: {label: [lat, lon]}}` into the commute groups. Groups
    /// not configured yet average travel times in 10 minute bands.
    pub fn with_locations(mut self, locations: Locations) -> Self {
        for (group, places) in locations {
            let entry = self.commute.entry(group).or_insert_with_key(|name| {
                warn!("No commute settings for {name}, using mean @ 10");
                CommuteGroup::new(Reduction::Mean, 10)
            });

            entry.locations.extend(places);
        }

        self
    }

    /// Reads `locations.json`. A missing file is no locations at all.
    pub fn load_locations(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No locations at {}, commute layers are skipped", path.display());
            return Ok(self);
        }

        let locations: Locations = serde_json::from_str(&fs::read_to_string(path)?)?;
        Ok(self.with_locations(locations))
    }
}
