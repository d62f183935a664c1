//! Fetches and mosaics slippy tiles over a bounding box.

use std::sync::Arc;

use flatfinder_geo::{LatLng, SlippyTile, TILE_SIZE};
use image::{imageops, RgbImage};
use itertools::iproduct;
use log::{debug, info};
use measure_time::info_time;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::raster::{Extent, Origin, Raster};
use crate::tile::decode::{decode, decode_image};
use crate::tile::error::{DecodeError, FetchError};
use crate::tile::mirror::MirrorSelector;
use crate::tile::palette::Palette;
use crate::tile::source::TileSource;

/// `(west, east, south, north)` in degrees.
pub type Bounds = (f64, f64, f64, f64);

pub const TRAVEL_TIME_TEMPLATE: &str =
    "https://api-{mirror}.tfl.gov.uk/TravelTimes/Average/{pinLat}/{pinLon}/tile/{z}/{x}/{y}";
pub const MIRROR_ROOT: &str = "https://api-{mirror}.tfl.gov.uk";
pub const BASE_MAP_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Fixed request parameters of the travel-time service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelTimeParams {
    pub scenario_title: String,
    pub time_of_day_id: String,
    pub mode_id: String,
}

impl Default for TravelTimeParams {
    fn default() -> Self {
        TravelTimeParams {
            scenario_title: "Base Year".to_string(),
            time_of_day_id: "INTER".to_string(),
            mode_id: "All".to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TravelTimeQuery<'a> {
    scenario_title: &'a str,
    time_of_day_id: &'a str,
    mode_id: &'a str,
    travel_time_interval: u32,
}

/// Where and how imagery is requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileSettings {
    pub mirrors: Vec<String>,
    pub mirror_root: String,
    pub travel_time_template: String,
    pub base_map_template: String,
    pub params: TravelTimeParams,
    pub palette: Palette,
}

impl Default for TileSettings {
    fn default() -> Self {
        TileSettings {
            mirrors: ["nile", "tigris", "ganges"].map(String::from).to_vec(),
            mirror_root: MIRROR_ROOT.to_string(),
            travel_time_template: TRAVEL_TIME_TEMPLATE.to_string(),
            base_map_template: BASE_MAP_TEMPLATE.to_string(),
            params: TravelTimeParams::default(),
            palette: Palette::tfl(),
        }
    }
}

/// Fills `{name}` placeholders of `template`. Unknown placeholders are an error.
fn render(template: &str, values: &[(&str, String)]) -> Result<String, FetchError> {
    let mut url = template.to_string();
    for (name, value) in values {
        url = url.replace(&format!("{{{name}}}"), value);
    }

    if url.contains('{') {
        return Err(FetchError::InvalidTemplate(template.to_string()));
    }

    Ok(url)
}

/// Fetches travel-time and base-map imagery through a [`TileSource`].
/// The travel-time mirror is probed once per fetcher.
pub struct TileFetcher {
    source: Arc<dyn TileSource>,
    mirrors: MirrorSelector,
    settings: TileSettings,
}

impl TileFetcher {
    pub fn new(source: Arc<dyn TileSource>, settings: TileSettings) -> Self {
        TileFetcher {
            mirrors: MirrorSelector::new(settings.mirrors.clone(), settings.mirror_root.clone()),
            source,
            settings,
        }
    }

    pub fn settings(&self) -> &TileSettings {
        &self.settings
    }

    pub fn mirrors(&self) -> &MirrorSelector {
        &self.mirrors
    }

    /// The travel-time URL of one tile, pinned to `pin`.
    pub fn tile_url(&self, mirror: &str, pin: LatLng, tile: SlippyTile, interval: u32) -> Result<String, FetchError> {
        let base = render(
            &self.settings.travel_time_template,
            &[
                ("mirror", mirror.to_string()),
                ("pinLat", pin.lat().to_string()),
                ("pinLon", pin.lng().to_string()),
                ("z", tile.zoom().to_string()),
                ("x", tile.x().to_string()),
                ("y", tile.y().to_string()),
            ],
        )?;

        let params = &self.settings.params;
        let query = serde_qs::to_string(&TravelTimeQuery {
            scenario_title: &params.scenario_title,
            time_of_day_id: &params.time_of_day_id,
            mode_id: &params.mode_id,
            travel_time_interval: interval,
        })
        .map_err(|err| FetchError::InvalidTemplate(err.to_string()))?;

        Ok(format!("{base}?{query}"))
    }

    /// Fetches and decodes one travel-time tile to RGB, through the first live
    /// mirror.
    pub fn fetch_tile(&self, pin: LatLng, zoom: u8, (x, y): (u32, u32), interval: u32) -> crate::Result<RgbImage> {
        let mirror = self.mirrors.select(self.source.as_ref())?;
        let url = self.tile_url(&mirror, pin, SlippyTile((x, 0), (y, 0), zoom), interval)?;

        self.load(&url)
    }

    fn load(&self, url: &str) -> crate::Result<RgbImage> {
        let image = decode_image(&self.source.get(url)?)?;

        if image.width() != TILE_SIZE || image.height() != TILE_SIZE {
            return Err(DecodeError::TileSize {
                expected: TILE_SIZE,
                found: image.dimensions(),
            }
            .into());
        }

        Ok(image)
    }

    /// Fetches every tile covering `bounds` at `zoom` with `fetch` and stitches
    /// them into one image. The extent is the union of the tiles' projected bounds.
    pub fn mosaic<F>(&self, bounds: Bounds, zoom: u8, fetch: F) -> crate::Result<(RgbImage, Extent)>
    where
        F: Fn(SlippyTile) -> crate::Result<RgbImage> + Sync,
    {
        let zoom = SlippyTile::check_zoom(zoom)?;
        let (xs, ys) = SlippyTile::covering(bounds, zoom);
        let (x0, y0) = (*xs.start(), *ys.start());

        let tiles: Vec<SlippyTile> = iproduct!(xs.clone(), ys.clone())
            .map(|(x, y)| SlippyTile((x, 0), (y, 0), zoom))
            .collect();

        info!("Fetching {} tiles at zoom {zoom}", tiles.len());

        let images = tiles
            .into_par_iter()
            .map(|tile| fetch(tile).map(|image| (tile, image)))
            .collect::<crate::Result<Vec<_>>>()?;

        let width = (xs.end() - x0 + 1) * TILE_SIZE;
        let height = (ys.end() - y0 + 1) * TILE_SIZE;

        let mut canvas = RgbImage::new(width, height);
        for (tile, image) in &images {
            let left = ((tile.x() - x0) * TILE_SIZE) as i64;
            let top = ((tile.y() - y0) * TILE_SIZE) as i64;
            imageops::replace(&mut canvas, image, left, top);
        }

        let north_west = SlippyTile((x0, 0), (y0, 0), zoom).bounds();
        let south_east = SlippyTile((*xs.end(), 0), (*ys.end(), 0), zoom).bounds();
        let extent = Extent::new(
            north_west.min().x,
            south_east.max().x,
            south_east.min().y,
            north_west.max().y,
        )?;

        debug!("Mosaic is {width}x{height} over {extent:?}");
        Ok((canvas, extent))
    }

    /// Minutes of travel to `pin` from everywhere within `bounds`, in the
    /// imagery's bands of `interval` minutes.
    pub fn time_map(&self, pin: LatLng, zoom: u8, interval: u32, bounds: Bounds) -> crate::Result<Raster> {
        info_time!("time_map");

        // Probed before fanning out, so a dead mirror set fails once.
        self.mirrors.select(self.source.as_ref())?;
        let (image, extent) = self.mosaic(bounds, zoom, |tile| {
            self.fetch_tile(pin, tile.zoom(), (tile.x(), tile.y()), interval)
        })?;

        decode(&image, &self.settings.palette, interval as f64, extent)
    }

    /// The plain base map over `bounds`: a three-band (RGB) raster whose grid
    /// serves as the reference for every other layer.
    pub fn base_map(&self, zoom: u8, bounds: Bounds) -> crate::Result<Raster> {
        info_time!("base_map");

        let template = &self.settings.base_map_template;
        let (image, extent) = self.mosaic(bounds, zoom, |tile| {
            let url = render(
                template,
                &[
                    ("z", tile.zoom().to_string()),
                    ("x", tile.x().to_string()),
                    ("y", tile.y().to_string()),
                ],
            )?;
            self.load(&url)
        })?;

        let (width, height) = image.dimensions();
        let data = image.into_raw().into_iter().map(f64::from).collect();

        let raster = Raster::new(data, (height as usize, width as usize, 3), extent, Origin::Upper)?;
        Ok(raster)
    }
}
