use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::sync::Arc;

use dotenv::dotenv;
use log::{info, warn};
use serde::Serialize;

use flatfinder::decision::{Decision, DecisionStore};
use flatfinder::layer::{AttributePrices, WktFile};
use flatfinder::tile::source::HttpSource;
use flatfinder::{score_listings, Config, Error, ListingPoint, Pipeline};

/// One line of output per listing.
#[derive(Serialize)]
struct Verdict<'a> {
    id: &'a str,
    scores: BTreeMap<&'a str, f64>,
    passes: bool,
    decision: Decision,
}

fn var(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load `.env` file, if there is one
    if dotenv().is_err() {
        eprintln!("No .env file, using the environment as is");
    }

    #[cfg(feature = "tracing")]
    flatfinder::util::trace::initialize_tracer();
    #[cfg(not(feature = "tracing"))]
    env_logger::init();

    let config_path = var("FLATFINDER_CONFIG", "config.json");
    let config = if Path::new(&config_path).exists() {
        Config::load(&config_path).map_err(Error::from)?
    } else {
        info!("No config at {config_path}, using the London defaults");
        Config::default()
    };
    let config = config
        .load_locations(var("FLATFINDER_LOCATIONS", "data/locations.json"))
        .map_err(Error::from)?;

    let source = HttpSource::new().map_err(Error::from)?;
    let mut pipeline = Pipeline::new(config, Arc::new(source))?;

    if let Ok(path) = env::var("FLATFINDER_GREEN_SPACES") {
        pipeline = pipeline.with_green_spaces(WktFile::new(path));
    }
    if let Ok(path) = env::var("FLATFINDER_TOWN_CENTRES") {
        pipeline = pipeline.with_town_centres(WktFile::new(path));
    }
    if let Ok(path) = env::var("FLATFINDER_DISTRICTS") {
        let attribute = pipeline.config().price_attribute.clone();
        pipeline = pipeline.with_prices(AttributePrices::new(WktFile::new(path), attribute));
    }

    #[cfg(feature = "tracing")]
    tracing::info!(message = "Building layers", zoom = pipeline.config().zoom);
    let layers = pipeline.build_layers()?;
    let config = pipeline.config();

    let composite = pipeline.composite(&layers, &config.cuts)?;
    let passing = composite.data().iter().filter(|v| **v == 1.0).count();
    info!(
        "{:.1}% of the map passes every cut",
        100.0 * passing as f64 / composite.data().len() as f64
    );

    let listings_path = var("FLATFINDER_LISTINGS", "data/listings.json");
    let listings: Vec<ListingPoint> = serde_json::from_str(&std::fs::read_to_string(&listings_path)?)?;
    let decisions = DecisionStore::open(&config.decisions).map_err(Error::from)?;

    let table = score_listings(&listings, &layers);
    for (row, id) in table.ids().iter().enumerate() {
        let decision = decisions.get(id);
        if decision == Decision::Ignore {
            continue;
        }

        let scores: BTreeMap<&str, f64> = table.row(row).collect();
        if scores.values().any(|score| score.is_nan()) {
            warn!("Listing {id} lies outside some layers");
        }

        let verdict = Verdict {
            id,
            passes: config.cuts.passes(scores.iter().map(|(layer, score)| (*layer, *score))),
            scores,
            decision,
        };
        println!("{}", serde_json::to_string(&verdict)?);
    }

    info!("{} of {} listings pass", table.passing(&config.cuts).len(), table.len());
    Ok(())
}
