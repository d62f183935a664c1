//! The travel-time API rotates between mirrors, declaring the inactive ones
//! blocked. We probe them in order and stick with the first that answers.

use std::sync::{Mutex, PoisonError};

use log::{info, warn};

use crate::tile::error::FetchError;
use crate::tile::source::TileSource;

/// Probes `hosts` in order and returns the first whose probe succeeds.
/// When none do, every attempt is reported in [`FetchError::NoMirrorAvailable`].
pub fn select_mirror<P>(probe: P, hosts: &[String]) -> Result<String, FetchError>
where
    P: Fn(&str) -> Result<(), FetchError>,
{
    let mut attempts = Vec::with_capacity(hosts.len());

    for host in hosts {
        match probe(host) {
            Ok(()) => {
                info!("Selected mirror {host}");
                return Ok(host.clone());
            }
            Err(err) => {
                warn!("Mirror {host} failed its probe: {err:?}");
                attempts.push((host.clone(), err));
            }
        }
    }

    Err(FetchError::NoMirrorAvailable { attempts })
}

/// Remembers the selected mirror, so it is probed for at most once.
#[derive(Debug)]
pub struct MirrorSelector {
    hosts: Vec<String>,
    /// Probe URL with a `{mirror}` placeholder, e.g. `https://api-{mirror}.tfl.gov.uk`.
    root: String,
    selected: Mutex<Option<String>>,
}

impl MirrorSelector {
    pub fn new(hosts: Vec<String>, root: impl Into<String>) -> Self {
        MirrorSelector {
            hosts,
            root: root.into(),
            selected: Mutex::new(None),
        }
    }

    /// The memoised mirror, probing through `source` on first use. Concurrent
    /// callers wait on the first probe rather than starting their own.
    pub fn select(&self, source: &dyn TileSource) -> Result<String, FetchError> {
        let mut selected = self.selected.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(host) = selected.as_ref() {
            return Ok(host.clone());
        }

        let probe = |host: &str| source.get(&self.root.replace("{mirror}", host)).map(drop);
        let host = select_mirror(probe, &self.hosts)?;

        *selected = Some(host.clone());
        Ok(host)
    }

    pub fn selected(&self) -> Option<String> {
        self.selected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
