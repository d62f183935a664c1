//! A read-through cache for built layers, with an optional disk tier.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use measure_time::info_time;

use crate::raster::Raster;

pub mod disk;
pub mod key;


#[doc(inline)]
pub use disk::DiskTier;
#[doc(inline)]
pub use key::LayerKey;

#[derive(Debug)]
pub enum CacheError {
    Io(std::io::Error),
    /// The key parameters could not be serialised.
    Key(serde_json::Error),
    /// A stored artifact could not be decoded.
    Corrupt(String),
}

impl From<std::io::Error> for CacheError {
    fn from(value: std::io::Error) -> Self {
        CacheError::Io(value)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(value: serde_json::Error) -> Self {
        CacheError::Key(value)
    }
}

/// Where a cache keeps its layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Process lifetime only.
    Memory,
    /// Memory, backed by artifacts on disk which outlive the process.
    Persistent,
}

/// A key's slot. `None` until a build succeeds; the lock serialises builds.
type Slot = Arc<Mutex<Option<Arc<Raster>>>>;

/// Layers by [`LayerKey`], built at most once.
///
/// ### Behaviour
///
/// A key moves from absent, through building, to cached. Concurrent callers of
/// [`LayerCache::get_or_build`] for one key collapse onto a single build and all
/// receive the same [`Arc`]. Callers of different keys never wait on each other.
///
/// A failed build hands its error to the caller that ran it and leaves the key
/// absent. Callers that were waiting then make their own attempt, one at a time.
///
/// Entries are only ever dropped by [`LayerCache::invalidate`] or [`LayerCache::clear`].
#[derive(Debug, Default)]
pub struct LayerCache {
    slots: scc::HashMap<LayerKey, Slot>,
    disk: Option<DiskTier>,
}

impl LayerCache {
    pub fn in_memory() -> Self {
        LayerCache::default()
    }

    /// A cache which also persists artifacts under `root`, creating it if needed.
    pub fn persistent(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let disk = DiskTier::open(root)?;
        info!("Persisting layers under {}", disk.root().display());

        Ok(LayerCache {
            slots: scc::HashMap::new(),
            disk: Some(disk),
        })
    }

    pub fn tier(&self) -> Tier {
        match self.disk {
            Some(_) => Tier::Persistent,
            None => Tier::Memory,
        }
    }

    /// Number of keys with a slot in memory, built or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The cached layer for `key`, from memory or disk, without building it.
    pub fn get(&self, key: &LayerKey) -> Option<Arc<Raster>> {
        let cached = self
            .slots
            .read(key, |_, slot| slot.clone())
            .and_then(|slot| {
                let value = slot.lock().unwrap_or_else(PoisonError::into_inner).clone();
                value
            });

        cached.or_else(|| self.load(key).map(|raster| self.fill(key, raster)))
    }

    /// The layer for `key`, running `build` if neither tier holds it.
    pub fn get_or_build<F>(&self, key: &LayerKey, build: F) -> crate::Result<Arc<Raster>>
    where
        F: FnOnce() -> crate::Result<Raster>,
    {
        let slot = self
            .slots
            .entry(key.clone())
            .or_insert_with(Slot::default)
            .get()
            .clone();

        let mut value = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(raster) = value.as_ref() {
            return Ok(Arc::clone(raster));
        }

        if let Some(raster) = self.load(key) {
            let raster = Arc::new(raster);
            *value = Some(Arc::clone(&raster));
            return Ok(raster);
        }

        let raster = {
            info_time!("build {key}");
            Arc::new(build()?)
        };

        if let Some(disk) = &self.disk {
            if let Err(err) = disk.store(key, &raster) {
                warn!("Could not persist {key}: {err:?}");
            }
        }

        *value = Some(Arc::clone(&raster));
        Ok(raster)
    }

    /// Drops `key` from both tiers. A build already underway still completes
    /// for its callers, but is not retained.
    pub fn invalidate(&self, key: &LayerKey) {
        debug!("Invalidating {key}");
        self.slots.remove(key);

        if let Some(Err(err)) = self.disk.as_ref().map(|disk| disk.remove(key)) {
            warn!("Could not remove the artifact of {key}: {err:?}");
        }
    }

    /// Drops every key from both tiers.
    pub fn clear(&self) {
        debug!("Clearing {} cached layers", self.slots.len());
        self.slots.clear();

        if let Some(Err(err)) = self.disk.as_ref().map(DiskTier::clear) {
            warn!("Could not clear the disk tier: {err:?}");
        }
    }

    fn load(&self, key: &LayerKey) -> Option<Raster> {
        match self.disk.as_ref()?.load(key) {
            Ok(raster) => raster,
            Err(err) => {
                warn!("Discarding unreadable artifact of {key}: {err:?}");
                None
            }
        }
    }

    /// Caches a raster read from disk, unless a build won the race to the slot.
    fn fill(&self, key: &LayerKey, raster: Raster) -> Arc<Raster> {
        let slot = self
            .slots
            .entry(key.clone())
            .or_insert_with(Slot::default)
            .get()
            .clone();

        let mut value = slot.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(value.get_or_insert_with(|| Arc::new(raster)))
    }
}
