//! The verdicts recorded against listings, kept in a JSON object file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};


#[derive(Debug)]
pub enum DecisionError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    UnknownDecision(String),
}

impl From<std::io::Error> for DecisionError {
    fn from(value: std::io::Error) -> Self {
        DecisionError::Io(value)
    }
}

impl From<serde_json::Error> for DecisionError {
    fn from(value: serde_json::Error) -> Self {
        DecisionError::Parse(value)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Bad,
    Meh,
    Good,
    Great,
    Booked,
    Dead,
    Ignore,
    /// No verdict yet. Stored as the empty string.
    #[default]
    #[strum(serialize = "")]
    #[serde(rename = "")]
    Undecided,
}

impl Decision {
    /// How favourably a decided listing is shown, from -2 to +2.
    pub fn sentiment(&self) -> Option<i8> {
        match self {
            Decision::Bad => Some(-2),
            Decision::Meh => Some(-1),
            Decision::Good => Some(1),
            Decision::Great | Decision::Booked | Decision::Dead => Some(2),
            Decision::Ignore | Decision::Undecided => None,
        }
    }

    pub fn parse(value: &str) -> Result<Self, DecisionError> {
        value
            .parse()
            .map_err(|_| DecisionError::UnknownDecision(value.to_string()))
    }
}

/// Listing id to [`Decision`], persisted on every change.
#[derive(Debug)]
pub struct DecisionStore {
    path: PathBuf,
    decisions: BTreeMap<String, Decision>,
}

impl DecisionStore {
    /// Opens the store at `path`, creating an empty one (and its parents) if absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DecisionError> {
        let path = path.into();

        if !path.exists() {
            info!("Creating decision store at {}", path.display());
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, "{}")?;
        }

        let mut store = DecisionStore {
            path,
            decisions: BTreeMap::new(),
        };
        store.load()?;

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file, dropping any in-memory state.
    pub fn load(&mut self) -> Result<(), DecisionError> {
        self.decisions = serde_json::from_str(&fs::read_to_string(&self.path)?)?;
        debug!("Loaded {} decisions", self.decisions.len());
        Ok(())
    }

    /// The decision for `id`, undecided if none was recorded.
    pub fn get(&self, id: &str) -> Decision {
        self.decisions.get(id).copied().unwrap_or_default()
    }

    pub fn decide(&mut self, id: &str, decision: Decision) -> Result<(), DecisionError> {
        self.decisions.insert(id.to_string(), decision);
        self.save()
    }

    /// Forgets the decision for `id`, returning what it was.
    pub fn reset(&mut self, id: &str) -> Result<Option<Decision>, DecisionError> {
        let previous = self.decisions.remove(id);
        self.save()?;
        Ok(previous)
    }

    /// Ids recorded with `decision`.
    pub fn with(&self, decision: Decision) -> Vec<&str> {
        self.decisions
            .iter()
            .filter(|(_, recorded)| **recorded == decision)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decision)> {
        self.decisions.iter().map(|(id, decision)| (id.as_str(), *decision))
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    fn save(&self) -> Result<(), DecisionError> {
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_string(&self.decisions)?)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}
