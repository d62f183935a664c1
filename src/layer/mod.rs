//! Named layers: how they are built, and how they combine into a composite
//! eligibility map.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::raster::{Kind, Raster};
use crate::score::Cuts;
use crate::warp::{reproject, threshold, Reduction, Resampling};

pub mod pipeline;
pub mod source;


#[doc(inline)]
pub use pipeline::Pipeline;
#[doc(inline)]
pub use source::{AttributeFilter, AttributePrices, Feature, PriceSource, VectorSource, WktFile};

/// Layers built from fixed sources. Commute groups are named by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum LayerName {
    /// The reference map. Not scored.
    Base,
    Park,
    Town,
    Propvalue,
    /// The mask of pixels passing every cut. Not scored.
    Composite,
}

/// Rasters by layer name.
#[derive(Debug, Clone, Default)]
pub struct Layers(BTreeMap<String, Arc<Raster>>);

impl Layers {
    pub fn new() -> Self {
        Layers::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, raster: Arc<Raster>) -> Option<Arc<Raster>> {
        self.0.insert(name.into(), raster)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Raster>> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Raster>)> {
        self.0.iter().map(|(name, raster)| (name.as_str(), raster))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Arc<Raster>)> for Layers {
    fn from_iter<T: IntoIterator<Item = (S, Arc<Raster>)>>(iter: T) -> Self {
        Layers(iter.into_iter().map(|(name, raster)| (name.into(), raster)).collect())
    }
}

/// The mask of pixels passing every cut, on the grid of `reference`.
///
/// Each layer with a cut is thresholded at it, warped onto the reference, and
/// the masks are ANDed. Pixels a layer does not cover fail. With no layer to
/// cut, every pixel passes.
pub fn build_composite(layers: &Layers, cuts: &Cuts, reference: &Raster) -> crate::Result<Raster> {
    let masks: Vec<Raster> = cuts
        .iter()
        .filter_map(|(name, cut)| layers.get(name).map(|layer| threshold(layer, cut)))
        .collect();

    debug!("Composing {} of {} cut layers", masks.len(), cuts.len());
    if masks.is_empty() {
        return Ok(reference.derive_filled(1.0).with_kind(Kind::Mask));
    }

    let sources: Vec<&Raster> = masks.iter().collect();
    let stack = reproject(reference, &sources, Resampling::Nearest)?;

    Ok(stack.reduce(Reduction::All))
}
