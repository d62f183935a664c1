//! Persistent tier: one zlib-compressed, bitcode-encoded artifact per key.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use bitcode::{Decode, Encode};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::{debug, warn};

use crate::cache::{CacheError, LayerKey};
use crate::raster::{Extent, Kind, Origin, Raster};

const EXTENSION: &str = "raster";

/// The on-disk form of a cached raster. Carries its full key so that a
/// digest collision reads as a miss rather than the wrong layer.
#[derive(Encode, Decode)]
struct Artifact {
    key: String,
    rows: u32,
    cols: u32,
    bands: u32,
    extent: [f64; 4],
    upper: bool,
    mask: bool,
    data: Vec<f64>,
}

impl Artifact {
    fn new(key: &LayerKey, raster: &Raster) -> Self {
        let (west, east, south, north) = raster.extent().as_tuple();

        Artifact {
            key: key.canonical().to_string(),
            rows: raster.rows() as u32,
            cols: raster.cols() as u32,
            bands: raster.bands() as u32,
            extent: [west, east, south, north],
            upper: raster.origin() == Origin::Upper,
            mask: raster.is_mask(),
            data: raster.data().to_vec(),
        }
    }

    fn into_raster(self) -> Result<Raster, CacheError> {
        let [west, east, south, north] = self.extent;
        let origin = if self.upper { Origin::Upper } else { Origin::Lower };
        let kind = if self.mask { Kind::Mask } else { Kind::Continuous };

        let raster = Raster::new(
            self.data,
            (self.rows as usize, self.cols as usize, self.bands as usize),
            Extent { west, east, south, north },
            origin,
        )
        .map_err(|err| CacheError::Corrupt(format!("{err:?}")))?;

        Ok(raster.with_kind(kind))
    }
}

#[derive(Debug)]
pub struct DiskTier {
    root: PathBuf,
}

impl DiskTier {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        Ok(DiskTier { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, key: &LayerKey) -> PathBuf {
        self.root.join(format!("{:08x}.{EXTENSION}", key.digest()))
    }

    /// The stored raster for `key`, if there is one.
    pub fn load(&self, key: &LayerKey) -> Result<Option<Raster>, CacheError> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }

        let mut bytes = Vec::new();
        ZlibDecoder::new(fs::File::open(&path)?).read_to_end(&mut bytes)?;

        let artifact: Artifact = bitcode::decode(&bytes).map_err(|err| CacheError::Corrupt(err.to_string()))?;
        if artifact.key != key.canonical() {
            warn!("Artifact {} holds a different key, treating as a miss", path.display());
            return Ok(None);
        }

        debug!("Loaded {key} from {}", path.display());
        artifact.into_raster().map(Some)
    }

    /// Writes through a temporary file, so readers never see a partial artifact.
    pub fn store(&self, key: &LayerKey, raster: &Raster) -> Result<(), CacheError> {
        let path = self.path(key);
        let staging = path.with_extension(format!("{EXTENSION}.tmp"));

        let mut encoder = ZlibEncoder::new(fs::File::create(&staging)?, Compression::default());
        encoder.write_all(&bitcode::encode(&Artifact::new(key, raster)))?;
        encoder.finish()?;

        fs::rename(&staging, &path)?;
        debug!("Stored {key} at {}", path.display());
        Ok(())
    }

    pub fn remove(&self, key: &LayerKey) -> Result<(), CacheError> {
        match fs::remove_file(self.path(key)) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    /// Removes every artifact under the root, leaving other files alone.
    pub fn clear(&self) -> Result<(), CacheError> {
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) {
                fs::remove_file(path)?;
            }
        }

        Ok(())
    }
}
