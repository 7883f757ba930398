//! Growing Seasons
//!
//! The six cropping seasons recognized by the encoder tables and the
//! season-affinity map, plus the static per-season default crop sets.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crops::CropCategory;

/// Cropping season (case-insensitive on input)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    #[serde(rename = "KHARIF")]
    Kharif,
    #[serde(rename = "RABI")]
    Rabi,
    #[serde(rename = "SUMMER")]
    Summer,
    #[serde(rename = "WINTER")]
    Winter,
    #[serde(rename = "AUTUMN")]
    Autumn,
    #[serde(rename = "WHOLE YEAR")]
    WholeYear,
}

impl Season {
    /// Get all seasons
    pub fn all() -> &'static [Season] {
        &[
            Season::Kharif,
            Season::Rabi,
            Season::Summer,
            Season::Winter,
            Season::Autumn,
            Season::WholeYear,
        ]
    }

    /// Parse a season label, ignoring case and surrounding whitespace
    ///
    /// Accepts "WHOLE_YEAR" as an alias of "WHOLE YEAR".
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().replace('_', " ").as_str() {
            "KHARIF" => Some(Season::Kharif),
            "RABI" => Some(Season::Rabi),
            "SUMMER" => Some(Season::Summer),
            "WINTER" => Some(Season::Winter),
            "AUTUMN" => Some(Season::Autumn),
            "WHOLE YEAR" => Some(Season::WholeYear),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Kharif => "KHARIF",
            Season::Rabi => "RABI",
            Season::Summer => "SUMMER",
            Season::Winter => "WINTER",
            Season::Autumn => "AUTUMN",
            Season::WholeYear => "WHOLE YEAR",
        }
    }

    /// Fixed encoding used when an encoder document has no `season_classes`
    pub fn legacy_index(&self) -> usize {
        match self {
            Season::Kharif => 0,
            Season::Rabi => 1,
            Season::WholeYear => 2,
            Season::Summer => 3,
            Season::Winter => 4,
            Season::Autumn => 5,
        }
    }

    /// Crop categories customarily grown in this season
    ///
    /// Used when the historical affinity map has no entry for a location.
    pub fn default_crops(&self) -> &'static [CropCategory] {
        use CropCategory::*;
        match self {
            Season::Kharif => &[
                CerealsRice, CerealsMaize, CerealsMillets, Pulses, Oilseeds,
                Cotton, Jute, Sugarcane, Vegetables, Fruits,
            ],
            Season::Rabi => &[
                CerealsWheat, CerealsBarley, Pulses, Oilseeds, Vegetables, Spices, Tobacco,
            ],
            Season::Summer => &[CerealsMaize, CerealsMillets, Pulses, Vegetables, Fruits, Oilseeds],
            Season::Winter => &[CerealsWheat, CerealsBarley, Vegetables, Spices, Oilseeds, Pulses],
            Season::Autumn => &[CerealsRice, Pulses, Vegetables, Oilseeds, CerealsMaize],
            Season::WholeYear => &[Sugarcane, Vegetables, Fruits, Plantation, Spices, Fiber],
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
