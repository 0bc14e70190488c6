//! Feature classes: the closed set of single-letter place categories.
//!
//! Codes follow the GeoNames convention used by the corpus gazetteer. Each class
//! carries an English name, the Norwegian label shown in the map legend, and a
//! display color for markers and cluster outlines.

use std::fmt;
use std::str::FromStr;

use crate::error::ClusterError;

/// Geographic category of a place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FeatureClass {
    /// `P` - cities, villages, farms with residents
    PopulatedPlace,
    /// `H` - lakes, rivers, fjords
    Hydrographic,
    /// `T` - mountains, hills
    Hypsographic,
    /// `L` - parks, regions
    Area,
    /// `A` - countries, counties, municipalities
    Administrative,
    /// `R` - roads and railways
    Road,
    /// `S` - buildings, farms, spots
    Spot,
    /// `V` - forests, fields
    Vegetation,
}

impl FeatureClass {
    /// Every class, in legend order.
    pub const ALL: [FeatureClass; 8] = [
        FeatureClass::PopulatedPlace,
        FeatureClass::Hydrographic,
        FeatureClass::Hypsographic,
        FeatureClass::Area,
        FeatureClass::Administrative,
        FeatureClass::Road,
        FeatureClass::Spot,
        FeatureClass::Vegetation,
    ];

    /// Single-letter code.
    pub fn code(self) -> char {
        match self {
            FeatureClass::PopulatedPlace => 'P',
            FeatureClass::Hydrographic => 'H',
            FeatureClass::Hypsographic => 'T',
            FeatureClass::Area => 'L',
            FeatureClass::Administrative => 'A',
            FeatureClass::Road => 'R',
            FeatureClass::Spot => 'S',
            FeatureClass::Vegetation => 'V',
        }
    }

    /// Look up a class by its code (case-insensitive).
    pub fn from_code(code: char) -> Option<Self> {
        let upper = code.to_ascii_uppercase();
        Self::ALL.into_iter().find(|fc| fc.code() == upper)
    }

    /// English name.
    pub fn name(self) -> &'static str {
        match self {
            FeatureClass::PopulatedPlace => "Populated place",
            FeatureClass::Hydrographic => "Hydrographic",
            FeatureClass::Hypsographic => "Hypsographic",
            FeatureClass::Area => "Area",
            FeatureClass::Administrative => "Administrative",
            FeatureClass::Road => "Road",
            FeatureClass::Spot => "Spot",
            FeatureClass::Vegetation => "Vegetation",
        }
    }

    /// Norwegian legend label.
    pub fn description(self) -> &'static str {
        match self {
            FeatureClass::PopulatedPlace => "Befolkede steder",
            FeatureClass::Hydrographic => "Vann og vassdrag",
            FeatureClass::Hypsographic => "Fjell og høyder",
            FeatureClass::Area => "Parker og områder",
            FeatureClass::Administrative => "Administrative steder",
            FeatureClass::Road => "Veier og jernbane",
            FeatureClass::Spot => "Bygninger og gårder",
            FeatureClass::Vegetation => "Skog og mark",
        }
    }

    /// Named CSS color used by the renderer.
    pub fn color(self) -> &'static str {
        match self {
            FeatureClass::PopulatedPlace => "red",
            FeatureClass::Hydrographic => "blue",
            FeatureClass::Hypsographic => "green",
            FeatureClass::Area => "orange",
            FeatureClass::Administrative => "purple",
            FeatureClass::Road => "darkred",
            FeatureClass::Spot => "darkblue",
            FeatureClass::Vegetation => "darkgreen",
        }
    }
}

impl fmt::Display for FeatureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl TryFrom<char> for FeatureClass {
    type Error = ClusterError;

    fn try_from(code: char) -> Result<Self, Self::Error> {
        FeatureClass::from_code(code)
            .ok_or_else(|| ClusterError::invalid_input(code.to_string(), "unknown feature class code"))
    }
}

impl FromStr for FeatureClass {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(code), None) => FeatureClass::try_from(code),
            _ => Err(ClusterError::invalid_input(s, "feature class must be a single letter")),
        }
    }
}
