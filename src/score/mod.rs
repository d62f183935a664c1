//! Looks listings up in layer rasters, and filters them by per-layer cuts.

use std::collections::BTreeMap;

use flatfinder_geo::LatLng;
use log::debug;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::layer::Layers;
use crate::raster::project::to_pixel_indices;
use crate::raster::Raster;

#[cfg(test)]
mod test;

/// A listing to score. Read-only input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingPoint {
    pub id: String,
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lon: f64,
}

impl ListingPoint {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lon)
    }
}

/// The value of `raster` (its first band) under each point, or NaN where a
/// point falls outside it.
pub fn score(points: &[LatLng], raster: &Raster) -> Vec<f64> {
    let (rows, cols) = raster.shape();

    to_pixel_indices(points, raster)
        .into_iter()
        .map(|index| {
            index
                .within(rows, cols)
                .and_then(|(row, col)| raster.get(row, col))
                .unwrap_or(f64::NAN)
        })
        .collect()
}

/// Per-layer thresholds. A listing passes when each of its scored layers is at
/// most the layer's cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cuts(BTreeMap<String, f64>);

impl Default for Cuts {
    fn default() -> Self {
        Cuts::from_iter([
            ("park", 10.0),
            ("town", 10.0),
            ("propvalue", 10000.0),
            ("friends", 45.0),
            ("aerial", 30.0),
            ("central", 60.0),
        ])
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Cuts {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        Cuts(iter.into_iter().map(|(name, cut)| (name.into(), cut)).collect())
    }
}

impl Cuts {
    pub fn get(&self, layer: &str) -> Option<f64> {
        self.0.get(layer).copied()
    }

    pub fn insert(&mut self, layer: impl Into<String>, cut: f64) -> Option<f64> {
        self.0.insert(layer.into(), cut)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, cut)| (name.as_str(), *cut))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `scores` pass every cut whose layer they include. Layers without
    /// a cut are ignored. A NaN score never passes.
    pub fn passes<'a>(&self, scores: impl IntoIterator<Item = (&'a str, f64)>) -> bool {
        scores.into_iter().all(|(layer, score)| match self.get(layer) {
            Some(cut) => score <= cut,
            None => true,
        })
    }
}

/// Scores of every listing against every layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ScoreTable {
    ids: Vec<String>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl ScoreTable {
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn layers(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, layer: &str) -> Option<&[f64]> {
        self.columns.get(layer).map(Vec::as_slice)
    }

    /// The `(layer, score)` pairs of the listing at `row`.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (&str, f64)> {
        self.columns
            .iter()
            .filter_map(move |(layer, scores)| Some((layer.as_str(), *scores.get(row)?)))
    }

    /// Ids of the listings passing `cuts`, in input order.
    pub fn passing(&self, cuts: &Cuts) -> Vec<&str> {
        (0..self.len())
            .filter(|row| cuts.passes(self.row(*row)))
            .map(|row| self.ids[row].as_str())
            .collect()
    }
}

/// Scores every listing against every layer, layers in parallel.
pub fn score_listings(points: &[ListingPoint], layers: &Layers) -> ScoreTable {
    let positions: Vec<LatLng> = points.iter().map(ListingPoint::position).collect();
    debug!("Scoring {} listings against {} layers", points.len(), layers.len());

    let columns = layers
        .iter()
        .collect::<Vec<_>>()
        .par_iter()
        .map(|(name, raster)| (name.to_string(), score(&positions, raster)))
        .collect();

    ScoreTable {
        ids: points.iter().map(|point| point.id.clone()).collect(),
        columns,
    }
}
