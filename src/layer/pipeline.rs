use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use flatfinder_geo::LatLng;
use geo::{ChamberlainDuquetteArea, Geometry, GeometryCollection};
use log::{debug, info, warn};
use measure_time::info_time;
use serde::Serialize;
use serde_json::json;

use crate::cache::{LayerCache, LayerKey};
use crate::config::Config;
use crate::layer::source::{AttributeFilter, PriceSource, VectorSource};
use crate::layer::{build_composite, LayerName, Layers};
use crate::raster::morphology::{fill_holes, Morphology};
use crate::raster::project::project_geometry;
use crate::raster::{Raster, RasterError};
use crate::rasterize::{distance_field, rasterize, rasterize_values, unreachable, validate};
use crate::score::Cuts;
use crate::tile::{TileFetcher, TileSource};
use crate::warp::{reproject, Resampling};

/// Everything fixing the reference grid. Part of every layer key.
#[derive(Serialize)]
struct Grid<'a> {
    zoom: u8,
    bounds: (f64, f64, f64, f64),
    template: &'a str,
}

enum Job {
    Park,
    Town,
    Propvalue,
    Commute(String),
}

impl Job {
    fn name(&self) -> String {
        match self {
            Job::Park => LayerName::Park.to_string(),
            Job::Town => LayerName::Town.to_string(),
            Job::Propvalue => LayerName::Propvalue.to_string(),
            Job::Commute(group) => group.clone(),
        }
    }
}

/// Builds the named layers from their sources, through a [`LayerCache`].
///
/// Every layer but the commute groups is aligned with the base map. Layers
/// whose source is not attached, and commute groups without locations, are
/// skipped rather than failing the build.
pub struct Pipeline {
    config: Config,
    fetcher: TileFetcher,
    cache: LayerCache,
    green_spaces: Option<Arc<dyn VectorSource>>,
    town_centres: Option<Arc<dyn VectorSource>>,
    prices: Option<Arc<dyn PriceSource>>,
}

impl Pipeline {
    /// A pipeline fetching imagery through `source`. Layers persist under the
    /// configured cache directory, if any.
    pub fn new(config: Config, source: Arc<dyn TileSource>) -> crate::Result<Self> {
        config.validate()?;

        let cache = match &config.cache_dir {
            Some(dir) => LayerCache::persistent(dir)?,
            None => LayerCache::in_memory(),
        };

        Ok(Pipeline {
            fetcher: TileFetcher::new(source, config.tiles.clone()),
            config,
            cache,
            green_spaces: None,
            town_centres: None,
            prices: None,
        })
    }

    pub fn with_cache(mut self, cache: LayerCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_green_spaces(mut self, source: impl VectorSource + 'static) -> Self {
        self.green_spaces = Some(Arc::new(source));
        self
    }

    pub fn with_town_centres(mut self, source: impl VectorSource + 'static) -> Self {
        self.town_centres = Some(Arc::new(source));
        self
    }

    pub fn with_prices(mut self, source: impl PriceSource + 'static) -> Self {
        self.prices = Some(Arc::new(source));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &LayerCache {
        &self.cache
    }

    pub fn fetcher(&self) -> &TileFetcher {
        &self.fetcher
    }

    fn grid(&self) -> Grid<'_> {
        Grid {
            zoom: self.config.zoom,
            bounds: self.config.bounds,
            template: &self.config.tiles.base_map_template,
        }
    }

    fn key(&self, name: &str, params: serde_json::Value) -> crate::Result<LayerKey> {
        Ok(LayerKey::new(name, &json!({ "grid": self.grid(), "layer": params }))?)
    }

    fn town_filter(&self) -> AttributeFilter {
        AttributeFilter {
            attribute: self.config.town_class_attribute.clone(),
            values: self.config.town_classes.clone(),
        }
    }

    /// Everything but the grid that the layer `name` depends on.
    fn params(&self, name: &str) -> serde_json::Value {
        match name.parse::<LayerName>() {
            Ok(LayerName::Base | LayerName::Composite) => json!({}),
            Ok(LayerName::Park) => json!({ "min_area": self.config.green_min_area, "scale": self.config.scale }),
            Ok(LayerName::Town) => json!({ "filter": self.town_filter(), "scale": self.config.scale }),
            Ok(LayerName::Propvalue) => json!({ "attribute": self.config.price_attribute }),
            Err(_) => json!({ "group": self.config.commute.get(name), "params": self.config.tiles.params }),
        }
    }

    /// The base map, whose grid every other layer is built on.
    pub fn base(&self) -> crate::Result<Arc<Raster>> {
        let key = self.key(LayerName::Base.as_ref(), json!({}))?;
        self.cache
            .get_or_build(&key, || self.fetcher.base_map(self.config.zoom, self.config.bounds))
    }

    /// Walking minutes to the nearest green space of at least the configured area.
    pub fn park(&self) -> crate::Result<Option<Arc<Raster>>> {
        let Some(source) = &self.green_spaces else {
            return Ok(None);
        };

        let base = self.base()?;
        let min_area = self.config.green_min_area;
        let name = LayerName::Park.as_ref();
        let key = self.key(name, self.params(name))?;

        self.cache
            .get_or_build(&key, || {
                let parks: Vec<Geometry> = source
                    .features()?
                    .into_iter()
                    .map(|feature| feature.geometry)
                    .filter(|geometry| geometry.chamberlain_duquette_unsigned_area() > min_area)
                    .collect();

                debug!("{} green spaces of at least {min_area}m²", parks.len());
                Ok(self.proximity(&parks, &base))
            })
            .map(Some)
    }

    /// Walking minutes to the nearest town centre of a configured class.
    pub fn town(&self) -> crate::Result<Option<Arc<Raster>>> {
        let Some(source) = &self.town_centres else {
            return Ok(None);
        };

        let base = self.base()?;
        let filter = self.town_filter();
        let name = LayerName::Town.as_ref();
        let key = self.key(name, self.params(name))?;

        self.cache
            .get_or_build(&key, || {
                let centres: Vec<Geometry> = source
                    .filtered(Some(&filter))?
                    .into_iter()
                    .map(|feature| feature.geometry)
                    .collect();

                Ok(self.proximity(&centres, &base))
            })
            .map(Some)
    }

    /// Price per square metre of the district each pixel falls in. Pixels
    /// between districts take the highest neighbouring price. With no district
    /// on the grid, every pixel is unreachable.
    pub fn propvalue(&self) -> crate::Result<Option<Arc<Raster>>> {
        let Some(source) = &self.prices else {
            return Ok(None);
        };

        let base = self.base()?;
        let name = LayerName::Propvalue.as_ref();
        let key = self.key(name, self.params(name))?;

        self.cache
            .get_or_build(&key, || {
                let districts: Vec<(Geometry, f64)> = source
                    .districts()?
                    .iter()
                    .map(|(geometry, price)| (project_geometry(geometry), *price))
                    .collect();

                let surface = rasterize_values(&districts, &base);
                if surface.data().iter().all(|price| *price == 0.0) {
                    warn!("No priced district covers the grid, nothing is affordable");
                    return Ok(unreachable(&base));
                }

                let (rows, cols) = surface.shape();
                let mut data = surface.into_data();
                fill_holes(&mut data, rows, cols, |price| price == 0.0, Morphology::Dilation)
                    .map_err(RasterError::from)?;

                Ok(base.derive(data)?)
            })
            .map(Some)
    }

    /// Minutes of travel to `pin`, banded by `interval`.
    pub fn time_map(&self, pin: LatLng, interval: u32) -> crate::Result<Arc<Raster>> {
        let tiles = &self.config.tiles;
        let key = self.key(
            "timemap",
            json!({
                "pin": pin,
                "interval": interval,
                "params": tiles.params,
                "palette": tiles.palette,
            }),
        )?;

        self.cache.get_or_build(&key, || {
            self.fetcher
                .time_map(pin, self.config.zoom, interval, self.config.bounds)
        })
    }

    /// The travel times of a commute group's locations, warped onto the grid
    /// of the first and reduced with the group's operation.
    pub fn commute(&self, name: &str) -> crate::Result<Option<Arc<Raster>>> {
        let Some(group) = self.config.commute.get(name) else {
            return Ok(None);
        };

        if group.locations.is_empty() {
            debug!("Commute group {name} has no locations, skipping");
            return Ok(None);
        }

        let key = self.key(name, self.params(name))?;

        self.cache
            .get_or_build(&key, || {
                let maps = group
                    .locations
                    .values()
                    .map(|pin| self.time_map(*pin, group.interval))
                    .collect::<crate::Result<Vec<_>>>()?;

                let sources: Vec<&Raster> = maps.iter().map(Arc::as_ref).collect();
                let stack = reproject(sources[0], &sources, Resampling::Bilinear)?;

                Ok(stack.reduce(group.reduction))
            })
            .map(Some)
    }

    /// The mask of pixels passing every cut over `layers`, on the base map's
    /// grid. See [`build_composite`].
    ///
    /// Cached by each applied cut and the parameters of the layer it applies
    /// to, so `layers` should come from this pipeline's [`Pipeline::build_layers`].
    pub fn composite(&self, layers: &Layers, cuts: &Cuts) -> crate::Result<Arc<Raster>> {
        let base = self.base()?;

        let applied: BTreeMap<&str, serde_json::Value> = cuts
            .iter()
            .filter(|(name, _)| layers.get(name).is_some())
            .map(|(name, cut)| (name, json!({ "cut": cut, "layer": self.params(name) })))
            .collect();
        let key = self.key(LayerName::Composite.as_ref(), json!({ "cuts": applied }))?;

        self.cache.get_or_build(&key, || build_composite(layers, cuts, &base))
    }

    /// Every layer the attached sources and configured locations allow,
    /// independent layers built concurrently.
    pub fn build_layers(&self) -> crate::Result<Layers> {
        info_time!("build_layers");

        // Built up front, so the parallel builds below never wait on it.
        self.base()?;

        let mut jobs = vec![Job::Park, Job::Town, Job::Propvalue];
        jobs.extend(self.config.commute.keys().cloned().map(Job::Commute));

        // Scoped threads rather than the rayon pool: a build holds its key's slot
        // while fetching tiles on the pool, and a pool worker must never pick up
        // another build that waits on that same slot.
        let built = thread::scope(|scope| {
            let handles: Vec<_> = jobs
                .iter()
                .map(|job| scope.spawn(move || self.build(job)))
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect::<crate::Result<Vec<_>>>()
        })?;

        let layers: Layers = built.into_iter().flatten().collect();
        info!("Built layers: {}", layers.names().collect::<Vec<_>>().join(", "));

        Ok(layers)
    }

    fn build(&self, job: &Job) -> crate::Result<Option<(String, Arc<Raster>)>> {
        let raster = match job {
            Job::Park => self.park()?,
            Job::Town => self.town()?,
            Job::Propvalue => self.propvalue()?,
            Job::Commute(group) => self.commute(group)?,
        };

        Ok(raster.map(|raster| (job.name(), raster)))
    }

    /// Walking minutes from every pixel of `reference` to the nearest of
    /// `geometries`. Degrades to unreachable everywhere when there is nothing
    /// valid to burn.
    fn proximity(&self, geometries: &[Geometry], reference: &Raster) -> Raster {
        let projected = Geometry::GeometryCollection(GeometryCollection(
            geometries.iter().map(project_geometry).collect(),
        ));

        if let Err(err) = validate(&projected) {
            warn!("No usable geometry ({err:?}), nothing is reachable");
            return unreachable(reference);
        }

        distance_field(&rasterize(&projected, reference), &self.config.scale)
    }
}
