//! Colour keys of the travel-time imagery.

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::tile::error::DecodeError;

/// Marks a pixel whose colour is not in the palette.
pub const UNCLASSIFIED: u8 = 255;

/// The TfL travel-time key, fastest band first. Black is "unreachable".
pub const TFL_COLOURS: [&str; 11] = [
    "#460000", "#ED1C24", "#F26522", "#FFF200", "#8DC73F", "#1C9959", "#00AEEF", "#0054A6", "#8686BE", "#662D91",
    "#000000",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Colour(pub [u8; 3]);

impl FromStr for Colour {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DecodeError::InvalidColour(s.to_string());

        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Colour([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl TryFrom<String> for Colour {
    type Error = DecodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Colour> for String {
    fn from(value: Colour) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02X}{g:02X}{b:02X}")
    }
}

/// A band of the key: pixels of `colour` are between `lower` and `upper`
/// minutes away. The last band is open-ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelTimeBand {
    pub colour: Colour,
    pub lower: f64,
    pub upper: f64,
}

impl TravelTimeBand {
    /// The representative time of the band, its midpoint. Infinite for the open band.
    pub fn minutes(&self) -> f64 {
        if self.upper.is_infinite() {
            return f64::INFINITY;
        }

        (self.lower + self.upper) / 2.0
    }
}

/// An ordered colour key with an exact-match lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Colour>", into = "Vec<Colour>")]
pub struct Palette {
    colours: Vec<Colour>,
    lookup: FxHashMap<Colour, u8>,
}

impl Palette {
    pub fn new(colours: Vec<Colour>) -> Result<Self, DecodeError> {
        if colours.is_empty() || colours.len() > UNCLASSIFIED as usize {
            return Err(DecodeError::PaletteSize(colours.len()));
        }

        Ok(Palette::indexed(colours))
    }

    pub fn tfl() -> Self {
        let colours = TFL_COLOURS
            .iter()
            .filter_map(|hex| hex.parse().ok())
            .collect();

        Palette::indexed(colours)
    }

    fn indexed(colours: Vec<Colour>) -> Self {
        // First occurrence wins should a colour repeat.
        let mut lookup = FxHashMap::default();
        for (index, colour) in colours.iter().enumerate() {
            lookup.entry(*colour).or_insert(index as u8);
        }

        Palette { colours, lookup }
    }

    pub fn len(&self) -> usize {
        self.colours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colours.is_empty()
    }

    pub fn colours(&self) -> &[Colour] {
        &self.colours
    }

    /// Band index of an exactly matching colour, else [`UNCLASSIFIED`].
    pub fn classify(&self, rgb: [u8; 3]) -> u8 {
        self.lookup
            .get(&Colour(rgb))
            .copied()
            .unwrap_or(UNCLASSIFIED)
    }

    /// The bands of the key for imagery captured at `interval` minutes.
    pub fn bands(&self, interval: f64) -> Vec<TravelTimeBand> {
        let last = self.colours.len() - 1;

        self.colours
            .iter()
            .enumerate()
            .map(|(i, colour)| TravelTimeBand {
                colour: *colour,
                lower: interval * i as f64,
                upper: if i == last {
                    f64::INFINITY
                } else {
                    interval * (i + 1) as f64
                },
            })
            .collect()
    }

    /// Minutes per band index: `interval / 2 + interval * i`, infinite for the last.
    pub fn minutes(&self, interval: f64) -> Vec<f64> {
        self.bands(interval)
            .iter()
            .map(TravelTimeBand::minutes)
            .collect()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::tfl()
    }
}

impl PartialEq for Palette {
    fn eq(&self, other: &Self) -> bool {
        self.colours == other.colours
    }
}

impl TryFrom<Vec<Colour>> for Palette {
    type Error = DecodeError;

    fn try_from(value: Vec<Colour>) -> Result<Self, Self::Error> {
        Palette::new(value)
    }
}

impl From<Palette> for Vec<Colour> {
    fn from(value: Palette) -> Self {
        value.colours
    }
}
